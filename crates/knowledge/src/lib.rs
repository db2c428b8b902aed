//! Document knowledge base: loading, chunking, embedding, retrieval, and
//! the retrieval-augmented answer pipeline.
//!
//! The index is built once from a document folder and persisted to SQLite.
//! On startup `open_or_build` decides whether the persisted index can be
//! reused or has to be rebuilt, based on the recorded embedder identity and
//! a fingerprint of the source folder.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod types;

#[cfg(test)]
mod tests;

pub use chunker::{chunk_text, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use index::{ChunkIndex, IndexMeta, SCHEMA_VERSION};
pub use loader::{folder_fingerprint, load_documents, ContentType, LoadedDocument};
pub use pipeline::{AnswerEngine, Pipeline};
pub use types::{AnswerResult, ConversationTurn, DocumentChunk, IndexStats};

use chrono::Utc;
use lumen_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;

/// File name of the persisted index inside the index directory.
pub const INDEX_FILE_NAME: &str = "index.sqlite";

/// Build-time knobs for chunking.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Open the persisted index if it is still valid, otherwise build it.
///
/// Reuse requires both that the recorded embedder identity matches the
/// configured one and that the source-folder fingerprint is unchanged. A
/// fingerprint mismatch triggers a rebuild; a missing document folder falls
/// back to the persisted index with a warning. An index built by a different
/// embedder is an error rather than a silent rebuild, so a misconfiguration
/// cannot quietly discard a good index.
pub async fn open_or_build(
    data_dir: &Path,
    index_dir: &Path,
    embedder: Arc<dyn EmbeddingProvider>,
    options: &BuildOptions,
) -> AppResult<ChunkIndex> {
    let db_path = index_dir.join(INDEX_FILE_NAME);

    if db_path.exists() {
        let existing = ChunkIndex::open(&db_path)?;
        let meta = existing.meta();

        if meta.provider != embedder.provider_name()
            || meta.model != embedder.model_name()
            || meta.dimensions != embedder.dimensions()
        {
            return Err(AppError::Knowledge(format!(
                "Index at {:?} was built with embedder {}/{} ({} dims), \
                 but {}/{} ({} dims) is configured; delete the index to rebuild",
                db_path,
                meta.provider,
                meta.model,
                meta.dimensions,
                embedder.provider_name(),
                embedder.model_name(),
                embedder.dimensions()
            )));
        }

        if !data_dir.is_dir() {
            tracing::warn!(
                "Document folder {:?} is missing; reusing persisted index",
                data_dir
            );
            return Ok(existing);
        }

        let fingerprint = folder_fingerprint(data_dir)?;
        if fingerprint == meta.fingerprint {
            tracing::info!("Reusing persisted index at {:?}", db_path);
            return Ok(existing);
        }

        tracing::info!(
            "Document folder {:?} changed since the index was built; rebuilding",
            data_dir
        );
        drop(existing);
    }

    build_index(data_dir, &db_path, embedder, options).await
}

/// Build a fresh index from the document folder.
async fn build_index(
    data_dir: &Path,
    db_path: &Path,
    embedder: Arc<dyn EmbeddingProvider>,
    options: &BuildOptions,
) -> AppResult<ChunkIndex> {
    let fingerprint = folder_fingerprint(data_dir)?;
    let documents = load_documents(data_dir)?;

    let mut chunks: Vec<DocumentChunk> = Vec::new();
    for doc in &documents {
        for (position, text) in chunk_text(&doc.text, options.chunk_size, options.chunk_overlap)
            .into_iter()
            .enumerate()
        {
            chunks.push(DocumentChunk {
                id: uuid::Uuid::new_v4().to_string(),
                source_file: doc.source_file.clone(),
                position: position as u32,
                text,
                embedding: None,
            });
        }
    }

    if chunks.is_empty() {
        return Err(AppError::Knowledge(format!(
            "Documents in {:?} produced no chunks",
            data_dir
        )));
    }

    tracing::info!(
        "Embedding {} chunks from {} documents with {}/{}",
        chunks.len(),
        documents.len(),
        embedder.provider_name(),
        embedder.model_name()
    );

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;

    if embeddings.len() != chunks.len() {
        return Err(AppError::Knowledge(format!(
            "Embedder returned {} vectors for {} chunks",
            embeddings.len(),
            chunks.len()
        )));
    }

    for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
        chunk.embedding = Some(embedding);
    }

    let index = ChunkIndex::create(
        db_path,
        IndexMeta {
            schema_version: SCHEMA_VERSION,
            provider: embedder.provider_name().to_string(),
            model: embedder.model_name().to_string(),
            dimensions: embedder.dimensions(),
            fingerprint,
            built_at: Utc::now(),
        },
    )?;

    for chunk in &chunks {
        index.insert_chunk(chunk)?;
    }

    tracing::info!("Built index with {} chunks at {:?}", chunks.len(), db_path);

    Ok(index)
}

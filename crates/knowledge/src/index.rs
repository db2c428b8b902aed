//! SQLite-backed vector index for document chunks.
//!
//! The index is built once from the document folder and is read-only
//! afterwards. Embeddings are stored as little-endian f32 BLOBs; retrieval
//! is an exact cosine-similarity scan, which is plenty for a fixed set of
//! documents.

use crate::types::{DocumentChunk, IndexStats};
use chrono::{DateTime, Utc};
use lumen_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Metadata recorded with a built index.
///
/// Gates reuse of the persisted index: a different embedder or a changed
/// source-folder fingerprint means the stored vectors are stale.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMeta {
    /// Schema version at build time
    pub schema_version: u32,

    /// Embedding provider name
    pub provider: String,

    /// Embedding model identifier
    pub model: String,

    /// Embedding vector dimension
    pub dimensions: usize,

    /// Fingerprint of the source folder at build time
    pub fingerprint: String,

    /// When the index was built
    pub built_at: DateTime<Utc>,
}

/// A persisted chunk index.
#[derive(Debug)]
pub struct ChunkIndex {
    conn: Connection,
    meta: IndexMeta,
}

impl ChunkIndex {
    /// Create a fresh index at `db_path`, replacing any existing database.
    pub fn create(db_path: &Path, meta: IndexMeta) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        if db_path.exists() {
            std::fs::remove_file(db_path)
                .map_err(|e| AppError::Knowledge(format!("Failed to replace index: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE chunks (
                id TEXT PRIMARY KEY,
                source_file TEXT NOT NULL,
                position INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL
            );

            CREATE INDEX idx_chunks_source ON chunks(source_file);
            "#,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        write_meta(&conn, &meta)?;

        tracing::debug!("Created SQLite index at {:?}", db_path);
        Ok(Self { conn, meta })
    }

    /// Open an existing index at `db_path`.
    ///
    /// A database without a readable meta table is treated as corrupt or
    /// incompatible.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if !db_path.exists() {
            return Err(AppError::Knowledge(format!(
                "Index does not exist: {:?}",
                db_path
            )));
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        let meta = read_meta(&conn).map_err(|e| {
            AppError::Knowledge(format!(
                "Corrupt or incompatible index at {:?}: {}",
                db_path, e
            ))
        })?;

        if meta.schema_version != SCHEMA_VERSION {
            return Err(AppError::Knowledge(format!(
                "Corrupt or incompatible index at {:?}: schema version {} (expected {})",
                db_path, meta.schema_version, SCHEMA_VERSION
            )));
        }

        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Ok(Self { conn, meta })
    }

    /// Metadata recorded at build time.
    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// Insert a chunk with its embedding.
    pub fn insert_chunk(&self, chunk: &DocumentChunk) -> AppResult<()> {
        let embedding = chunk
            .embedding
            .as_ref()
            .ok_or_else(|| AppError::Knowledge("Chunk missing embedding".to_string()))?;

        if embedding.len() != self.meta.dimensions {
            return Err(AppError::Knowledge(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.meta.dimensions,
                embedding.len()
            )));
        }

        self.conn
            .execute(
                "INSERT OR REPLACE INTO chunks (id, source_file, position, text, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    chunk.id,
                    chunk.source_file,
                    chunk.position as i64,
                    chunk.text,
                    embedding_to_bytes(embedding),
                ],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

        Ok(())
    }

    /// Return the top-k chunks by descending cosine similarity.
    ///
    /// An empty index yields an empty vec.
    pub fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<(DocumentChunk, f32)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, source_file, position, text, embedding FROM chunks")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let chunks_iter = stmt
            .query_map([], |row| {
                let embedding_bytes: Vec<u8> = row.get(4)?;
                let embedding = bytes_to_embedding(&embedding_bytes)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

                Ok(DocumentChunk {
                    id: row.get(0)?,
                    source_file: row.get(1)?,
                    position: row.get::<_, i64>(2)? as u32,
                    text: row.get(3)?,
                    embedding: Some(embedding),
                })
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

        // A row that fails to decode is a corrupt index, not a miss.
        let mut results: Vec<(DocumentChunk, f32)> = Vec::new();
        for row in chunks_iter {
            let chunk = row
                .map_err(|e| AppError::Knowledge(format!("Failed to read chunk row: {}", e)))?;
            let score = chunk
                .embedding
                .as_deref()
                .map(|e| cosine_similarity(query_embedding, e))
                .unwrap_or(0.0);
            results.push((chunk, score));
        }

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }

    /// Get statistics for the index.
    pub fn stats(&self) -> AppResult<IndexStats> {
        let chunks_count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
                row.get::<_, i64>(0).map(|v| v as u32)
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))?;

        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT source_file FROM chunks")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| AppError::Knowledge(format!("Failed to list sources: {}", e)))?;

        let mut source_files = BTreeSet::new();
        for row in rows {
            source_files.insert(
                row.map_err(|e| AppError::Knowledge(format!("Failed to read source row: {}", e)))?,
            );
        }

        Ok(IndexStats {
            chunks_count,
            source_files,
        })
    }
}

/// Write index metadata into the meta table.
fn write_meta(conn: &Connection, meta: &IndexMeta) -> AppResult<()> {
    let pairs = [
        ("schema_version", meta.schema_version.to_string()),
        ("provider", meta.provider.clone()),
        ("model", meta.model.clone()),
        ("dimensions", meta.dimensions.to_string()),
        ("fingerprint", meta.fingerprint.clone()),
        ("built_at", meta.built_at.to_rfc3339()),
    ];

    for (key, value) in pairs {
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to write meta: {}", e)))?;
    }

    Ok(())
}

/// Read index metadata back from the meta table.
fn read_meta(conn: &Connection) -> AppResult<IndexMeta> {
    let get = |key: &str| -> AppResult<String> {
        conn.query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| AppError::Knowledge(format!("Failed to read meta: {}", e)))?
        .ok_or_else(|| AppError::Knowledge(format!("Missing meta key: {}", key)))
    };

    let schema_version = get("schema_version")?
        .parse::<u32>()
        .map_err(|e| AppError::Knowledge(format!("Invalid schema version: {}", e)))?;
    let dimensions = get("dimensions")?
        .parse::<usize>()
        .map_err(|e| AppError::Knowledge(format!("Invalid dimensions: {}", e)))?;
    let built_at = DateTime::parse_from_rfc3339(&get("built_at")?)
        .map_err(|e| AppError::Knowledge(format!("Invalid built_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(IndexMeta {
        schema_version,
        provider: get("provider")?,
        model: get("model")?,
        dimensions,
        fingerprint: get("fingerprint")?,
        built_at,
    })
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to an embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    let mut embedding = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        embedding.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(embedding)
}

/// Calculate cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_meta() -> IndexMeta {
        IndexMeta {
            schema_version: SCHEMA_VERSION,
            provider: "hashed".to_string(),
            model: "hashed-trigram-v1".to_string(),
            dimensions: 3,
            fingerprint: "fp".to_string(),
            built_at: Utc::now(),
        }
    }

    fn test_chunk(id: &str, source_file: &str, embedding: Vec<f32>) -> DocumentChunk {
        DocumentChunk {
            id: id.to_string(),
            source_file: source_file.to_string(),
            position: 0,
            text: "text".to_string(),
            embedding: Some(embedding),
        }
    }

    #[test]
    fn test_create_and_reopen_preserves_meta() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("index.sqlite");

        let meta = test_meta();
        let index = ChunkIndex::create(&db_path, meta.clone()).unwrap();
        drop(index);

        let reopened = ChunkIndex::open(&db_path).unwrap();
        assert_eq!(reopened.meta(), &meta);
    }

    #[test]
    fn test_open_missing_index() {
        let temp = TempDir::new().unwrap();
        let result = ChunkIndex::open(&temp.path().join("index.sqlite"));
        assert!(result.is_err());
    }

    #[test]
    fn test_open_corrupt_index() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("index.sqlite");
        std::fs::write(&db_path, b"not a database").unwrap();

        let result = ChunkIndex::open(&db_path);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Corrupt or incompatible"));
    }

    #[test]
    fn test_insert_and_search() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::create(&temp.path().join("index.sqlite"), test_meta()).unwrap();

        index
            .insert_chunk(&test_chunk("c1", "a.txt", vec![1.0, 0.0, 0.0]))
            .unwrap();
        index
            .insert_chunk(&test_chunk("c2", "b.txt", vec![0.0, 1.0, 0.0]))
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.id, "c1");
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn test_search_respects_top_k() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::create(&temp.path().join("index.sqlite"), test_meta()).unwrap();

        for i in 0..5 {
            index
                .insert_chunk(&test_chunk(
                    &format!("c{}", i),
                    "a.txt",
                    vec![1.0, 0.0, 0.0],
                ))
                .unwrap();
        }

        let results = index.search(&[1.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_search_empty_index() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::create(&temp.path().join("index.sqlite"), test_meta()).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 3).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_search_surfaces_corrupt_embedding() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::create(&temp.path().join("index.sqlite"), test_meta()).unwrap();

        index
            .insert_chunk(&test_chunk("c1", "a.txt", vec![1.0, 0.0, 0.0]))
            .unwrap();

        // Truncate the stored blob to a length no f32 vector can have.
        index
            .conn
            .execute("UPDATE chunks SET embedding = X'0102' WHERE id = 'c1'", [])
            .unwrap();

        let result = index.search(&[1.0, 0.0, 0.0], 3);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("chunk row"));
    }

    #[test]
    fn test_insert_rejects_wrong_dimensions() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::create(&temp.path().join("index.sqlite"), test_meta()).unwrap();

        let result = index.insert_chunk(&test_chunk("c1", "a.txt", vec![1.0]));
        assert!(result.is_err());
    }

    #[test]
    fn test_stats() {
        let temp = TempDir::new().unwrap();
        let index = ChunkIndex::create(&temp.path().join("index.sqlite"), test_meta()).unwrap();

        index
            .insert_chunk(&test_chunk("c1", "a.txt", vec![1.0, 0.0, 0.0]))
            .unwrap();
        index
            .insert_chunk(&test_chunk("c2", "a.txt", vec![0.0, 1.0, 0.0]))
            .unwrap();
        index
            .insert_chunk(&test_chunk("c3", "b.txt", vec![0.0, 0.0, 1.0]))
            .unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.chunks_count, 3);
        assert_eq!(
            stats.source_files.into_iter().collect::<Vec<_>>(),
            vec!["a.txt".to_string(), "b.txt".to_string()]
        );
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let embedding = vec![0.25f32, -1.5, 3.75];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), embedding);
        assert!(bytes_to_embedding(&bytes[..5]).is_err());
    }
}

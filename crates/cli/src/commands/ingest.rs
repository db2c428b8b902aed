//! Index ingestion command.

use clap::Args;
use lumen_core::{config::AppConfig, AppResult};
use lumen_knowledge::{open_or_build, BuildOptions, EmbeddingConfig, INDEX_FILE_NAME};

/// Build or rebuild the document index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Rebuild even if the persisted index is up to date
    #[arg(short, long)]
    pub force: bool,

    /// Output statistics as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let embedder = lumen_knowledge::create_provider(&EmbeddingConfig::default())?;

        if self.force {
            let db_path = config.index_dir.join(INDEX_FILE_NAME);
            if db_path.exists() {
                tracing::info!("Removing existing index at {:?}", db_path);
                std::fs::remove_file(&db_path)?;
            }
        }

        let index = open_or_build(
            &config.data_dir,
            &config.index_dir,
            embedder,
            &BuildOptions::default(),
        )
        .await?;

        let meta = index.meta().clone();
        let stats = index.stats()?;

        if self.json {
            let output = serde_json::json!({
                "chunks": stats.chunks_count,
                "sources": stats.source_files,
                "embedder": {
                    "provider": meta.provider,
                    "model": meta.model,
                    "dimensions": meta.dimensions,
                },
                "builtAt": meta.built_at.to_rfc3339(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Index ready: {} chunks from {} documents",
                stats.chunks_count,
                stats.source_files.len()
            );
            for source in &stats.source_files {
                println!("  - {}", source);
            }
            println!(
                "Embedder: {}/{} ({} dims), built {}",
                meta.provider, meta.model, meta.dimensions, meta.built_at
            );
        }

        Ok(())
    }
}

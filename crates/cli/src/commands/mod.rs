//! Command handlers.

mod chat;
mod check;
mod ingest;
mod serve;

pub use chat::ChatCommand;
pub use check::CheckEnvCommand;
pub use ingest::IngestCommand;
pub use serve::ServeCommand;

use lumen_core::{config::AppConfig, AppResult};
use lumen_knowledge::{open_or_build, BuildOptions, EmbeddingConfig, Pipeline};
use lumen_llm::create_client;
use lumen_prompt::load_persona;

/// Assemble the answer pipeline from configuration.
///
/// Opens (or builds) the index, creates the LLM client, and loads the
/// persona. Shared by the chat and serve commands.
pub(crate) async fn build_pipeline(config: &AppConfig) -> AppResult<Pipeline> {
    config.validate()?;

    let embedder = lumen_knowledge::create_provider(&EmbeddingConfig::default())?;

    let index = open_or_build(
        &config.data_dir,
        &config.index_dir,
        embedder.clone(),
        &BuildOptions::default(),
    )
    .await?;

    let api_key = config.resolve_api_key();
    let llm = create_client(
        &config.provider,
        config.endpoint.as_deref(),
        api_key.as_deref(),
    )?;

    let persona = load_persona(config.persona_file.as_deref())?;

    Ok(Pipeline::new(
        index,
        embedder,
        llm,
        persona,
        config.model.clone(),
        config.top_k,
    ))
}

//! Lumen CLI
//!
//! Main entry point for the lumen command-line tool. Provides an
//! interactive companion chat, the REST server, index ingestion, and an
//! environment check.

mod commands;
mod typewriter;

use clap::{Parser, Subcommand};
use commands::{ChatCommand, CheckEnvCommand, IngestCommand, ServeCommand};
use lumen_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Lumen - a retrieval-backed wellbeing companion
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(about = "A retrieval-backed wellbeing companion", long_about = None)]
#[command(version)]
struct Cli {
    /// Folder containing the source documents
    #[arg(short, long, global = true, env = "LUMEN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Directory holding the persisted vector index
    #[arg(short, long, global = true, env = "LUMEN_INDEX_DIR")]
    index_dir: Option<PathBuf>,

    /// LLM provider (groq, ollama)
    #[arg(short, long, global = true, env = "LUMEN_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "LUMEN_MODEL")]
    model: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive terminal chat
    Chat(ChatCommand),

    /// Run the REST chat service
    Serve(ServeCommand),

    /// Build or rebuild the document index
    Ingest(IngestCommand),

    /// Check provider credentials and configuration
    CheckEnv(CheckEnvCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    let config = config.with_overrides(
        cli.data_dir,
        cli.index_dir,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::debug!("Data dir: {:?}", config.data_dir);
    tracing::debug!("Index dir: {:?}", config.index_dir);
    tracing::debug!("Provider: {}, model: {}", config.provider, config.model);

    let command_name = match &cli.command {
        Commands::Chat(_) => "chat",
        Commands::Serve(_) => "serve",
        Commands::Ingest(_) => "ingest",
        Commands::CheckEnv(_) => "check-env",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::CheckEnv(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

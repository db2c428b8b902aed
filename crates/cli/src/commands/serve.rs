//! REST service command.

use crate::commands::build_pipeline;
use clap::Args;
use lumen_core::{config::AppConfig, AppResult};
use lumen_server::{run_server, AppState};
use std::sync::Arc;

/// Run the REST chat service
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Bind address (host:port)
    #[arg(short, long, env = "LUMEN_BIND")]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let pipeline = build_pipeline(config).await?;
        let assistant_name = pipeline.persona().name.clone();

        let bind_addr = self.bind.clone().unwrap_or_else(|| config.bind_addr.clone());
        let state = Arc::new(AppState::new(Arc::new(pipeline), assistant_name));

        run_server(&bind_addr, state).await
    }
}

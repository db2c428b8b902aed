//! LLM provider factory.
//!
//! Creates LLM clients from the application configuration: provider name,
//! optional custom endpoint, and the resolved API key.

use crate::client::LlmClient;
use crate::providers::{GroqClient, OllamaClient};
use lumen_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("groq", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required for hosted providers)
///
/// # Errors
/// Returns an error if the provider is unknown or a required API key is
/// missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "groq" => {
            let api_key = api_key
                .ok_or_else(|| AppError::Config("Groq provider requires an API key".to_string()))?;
            let client = match endpoint {
                Some(url) => GroqClient::with_base_url(api_key, url)?,
                None => GroqClient::new(api_key)?,
            };
            Ok(Arc::new(client))
        }
        "ollama" => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            let client = OllamaClient::with_base_url(base_url);
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

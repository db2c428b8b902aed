//! Groq LLM provider implementation.
//!
//! Groq exposes an OpenAI-compatible chat completions API:
//! https://console.groq.com/docs/api-reference

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use lumen_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Groq API base URL.
const DEFAULT_GROQ_URL: &str = "https://api.groq.com";

/// Chat completions endpoint path.
const CHAT_ENDPOINT: &str = "/openai/v1/chat/completions";

/// Request timeout in seconds. Generation failures past this point surface
/// as an `AppError::Llm` to the caller.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Maximum retry attempts for transient failures (network, 429, 5xx).
const MAX_RETRIES: u32 = 2;

/// Initial backoff duration in milliseconds.
const INITIAL_BACKOFF_MS: u64 = 250;

/// Groq chat completions request format.
#[derive(Debug, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<GroqMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct GroqMessage {
    role: &'static str,
    content: String,
}

/// Groq chat completions response format.
#[derive(Debug, Deserialize)]
struct GroqResponse {
    model: String,
    choices: Vec<GroqChoice>,
    #[serde(default)]
    usage: Option<GroqUsage>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqResponseMessage,
}

#[derive(Debug, Deserialize)]
struct GroqResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct GroqUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// A failed request attempt, tagged with whether a retry could help.
struct SendFailure {
    error: AppError,
    retryable: bool,
}

impl SendFailure {
    fn transient(error: AppError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    fn fatal(error: AppError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

/// Whether an HTTP status is worth retrying. Auth and request errors are
/// not; rate limits and server errors are.
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Groq LLM client.
pub struct GroqClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GroqClient {
    /// Create a new Groq client with the default endpoint.
    pub fn new(api_key: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(api_key, DEFAULT_GROQ_URL)
    }

    /// Create a new Groq client with a custom base URL.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client for Groq: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Convert LlmRequest to Groq chat format.
    fn to_groq_request(&self, request: &LlmRequest) -> GroqRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(GroqMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(GroqMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        GroqRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }

    /// Send the request once, without retry.
    async fn send_once(&self, groq_request: &GroqRequest) -> Result<LlmResponse, SendFailure> {
        let url = format!("{}{}", self.base_url, CHAT_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(groq_request)
            .send()
            .await
            .map_err(|e| {
                SendFailure::transient(AppError::Llm(format!(
                    "Failed to send request to Groq: {}",
                    e
                )))
            })?;

        let status = response.status();
        if !status.is_success() {
            let retryable = is_retryable_status(status);
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SendFailure {
                error: AppError::Llm(format!("Groq API error ({}): {}", status, error_text)),
                retryable,
            });
        }

        let groq_response: GroqResponse = response.json().await.map_err(|e| {
            SendFailure::fatal(AppError::Llm(format!(
                "Failed to parse Groq response: {}",
                e
            )))
        })?;

        let choice = groq_response.choices.into_iter().next().ok_or_else(|| {
            SendFailure::fatal(AppError::Llm(
                "Groq response contained no choices".to_string(),
            ))
        })?;

        let usage = groq_response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content: choice.message.content,
            model: groq_response.model,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for GroqClient {
    fn provider_name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Groq (model: {})", request.model);
        tracing::debug!("Prompt length: {} chars", request.prompt.len());

        let groq_request = self.to_groq_request(request);

        let mut backoff_ms = INITIAL_BACKOFF_MS;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            match self.send_once(&groq_request).await {
                Ok(response) => {
                    tracing::info!(
                        "Received completion from Groq ({} tokens)",
                        response.usage.total_tokens
                    );
                    return Ok(response);
                }
                Err(failure) => {
                    // Only transient failures (network, 429, 5xx) get a
                    // retry; auth, request, and parse errors surface as-is.
                    if !failure.retryable || attempt == MAX_RETRIES {
                        return Err(failure.error);
                    }

                    tracing::warn!(
                        "Groq request failed (attempt {}/{}): {}; retrying in {}ms",
                        attempt + 1,
                        MAX_RETRIES + 1,
                        failure.error,
                        backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                    last_error = Some(failure.error);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Llm("Groq request failed without error".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_groq_request_with_system() {
        let client = GroqClient::new("test-key").unwrap();
        let request = LlmRequest::new("hello", "llama-3.1-8b-instant")
            .with_system("Be kind.")
            .with_temperature(0.5);

        let groq_request = client.to_groq_request(&request);
        assert_eq!(groq_request.messages.len(), 2);
        assert_eq!(groq_request.messages[0].role, "system");
        assert_eq!(groq_request.messages[1].role, "user");
        assert_eq!(groq_request.messages[1].content, "hello");
        assert!(!groq_request.stream);
    }

    #[test]
    fn test_retryable_status_classification() {
        use reqwest::StatusCode;

        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));

        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_to_groq_request_without_system() {
        let client = GroqClient::new("test-key").unwrap();
        let request = LlmRequest::new("hello", "llama-3.1-8b-instant");

        let groq_request = client.to_groq_request(&request);
        assert_eq!(groq_request.messages.len(), 1);
        assert_eq!(groq_request.messages[0].role, "user");
    }
}

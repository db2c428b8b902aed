//! Error types for Lumen.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, LLM generation, knowledge/index,
//! prompt, and server errors.

use thiserror::Error;

/// Unified error type for Lumen.
///
/// All fallible functions in the application return `Result<T, AppError>`.
/// Errors are represented and propagated, never panicked on.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors (network, auth, malformed response)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Knowledge base errors (ingestion, index, retrieval)
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Persona prompt errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// REST service errors
    #[error("Server error: {0}")]
    Server(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

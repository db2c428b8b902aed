//! Configuration management for Lumen.
//!
//! This module handles loading and merging configuration from multiple
//! sources:
//! - Environment variables (`LUMEN_*`)
//! - Command-line flags
//! - Config file (`lumen.yaml`)
//!
//! Precedence is CLI flags > environment variables > config file > defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Environment variable holding the Groq API key.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Main application configuration.
///
/// Shared by all three front ends; holds the paths of the document folder
/// and the persisted index, the active LLM provider, and output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Folder containing the source documents to ingest
    pub data_dir: PathBuf,

    /// Directory holding the persisted vector index
    pub index_dir: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// LLM provider for answer generation ("groq", "ollama")
    pub provider: String,

    /// Model identifier for the provider
    pub model: String,

    /// API key for hosted providers (resolved from env if unset)
    pub api_key: Option<String>,

    /// Custom provider endpoint URL
    pub endpoint: Option<String>,

    /// Number of chunks to retrieve per query
    pub top_k: usize,

    /// Optional persona definition file (YAML)
    pub persona_file: Option<PathBuf>,

    /// Bind address for the REST service
    pub bind_addr: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Config file structure (`lumen.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    documents: Option<DocumentsConfig>,
    llm: Option<LlmFileConfig>,
    server: Option<ServerConfig>,
    persona: Option<PersonaConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentsConfig {
    #[serde(rename = "dataDir")]
    data_dir: Option<String>,
    #[serde(rename = "indexDir")]
    index_dir: Option<String>,
    #[serde(rename = "topK")]
    top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmFileConfig {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerConfig {
    bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersonaConfig {
    file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            index_dir: PathBuf::from("vectorstore"),
            config_file: None,
            provider: "groq".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key: None,
            endpoint: None,
            top_k: 3,
            persona_file: None,
            bind_addr: "127.0.0.1:8000".to_string(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `LUMEN_DATA_DIR`: Source document folder
    /// - `LUMEN_INDEX_DIR`: Persisted index directory
    /// - `LUMEN_CONFIG`: Path to config file
    /// - `LUMEN_PROVIDER`: LLM provider
    /// - `LUMEN_MODEL`: Model identifier
    /// - `LUMEN_API_KEY`: API key (overrides provider-specific vars)
    /// - `LUMEN_BIND`: REST service bind address
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(config_file) = std::env::var("LUMEN_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        // Load from YAML config file if it exists
        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("lumen.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(data_dir) = std::env::var("LUMEN_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(index_dir) = std::env::var("LUMEN_INDEX_DIR") {
            config.index_dir = PathBuf::from(index_dir);
        }

        if let Ok(provider) = std::env::var("LUMEN_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("LUMEN_MODEL") {
            config.model = model;
        }

        if let Ok(bind) = std::env::var("LUMEN_BIND") {
            config.bind_addr = bind;
        }

        config.api_key = std::env::var("LUMEN_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(documents) = config_file.documents {
            if let Some(data_dir) = documents.data_dir {
                result.data_dir = PathBuf::from(data_dir);
            }
            if let Some(index_dir) = documents.index_dir {
                result.index_dir = PathBuf::from(index_dir);
            }
            if let Some(top_k) = documents.top_k {
                result.top_k = top_k;
            }
        }

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if llm.endpoint.is_some() {
                result.endpoint = llm.endpoint;
            }
        }

        if let Some(server) = config_file.server {
            if let Some(bind) = server.bind {
                result.bind_addr = bind;
            }
        }

        if let Some(persona) = config_file.persona {
            if let Some(file) = persona.file {
                result.persona_file = Some(PathBuf::from(file));
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Merges command-line flags with the loaded configuration, giving
    /// precedence to CLI flags over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        index_dir: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }

        if let Some(index_dir) = index_dir {
            self.index_dir = index_dir;
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Name of the environment variable carrying the API key for a provider,
    /// if the provider needs one.
    pub fn api_key_env(provider: &str) -> Option<&'static str> {
        match provider {
            "groq" => Some(GROQ_API_KEY_ENV),
            _ => None,
        }
    }

    /// Resolve the API key for the active provider.
    ///
    /// An explicit key (flag or `LUMEN_API_KEY`) wins over the
    /// provider-specific environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        Self::api_key_env(&self.provider).and_then(|var| std::env::var(var).ok())
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["groq", "ollama"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if let Some(env_var) = Self::api_key_env(&self.provider) {
            if self.resolve_api_key().is_none() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    env_var
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "groq");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.index_dir, PathBuf::from("vectorstore"));
        assert_eq!(config.top_k, 3);
        assert!(!config.verbose);
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some(PathBuf::from("docs")),
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.data_dir, PathBuf::from("docs"));
        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama_needs_no_key() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_key_env() {
        assert_eq!(AppConfig::api_key_env("groq"), Some(GROQ_API_KEY_ENV));
        assert_eq!(AppConfig::api_key_env("ollama"), None);
    }

    #[test]
    fn test_merge_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lumen.yaml");
        std::fs::write(
            &path,
            r#"
documents:
  dataDir: my-docs
  topK: 5
llm:
  provider: ollama
  model: llama3.2
server:
  bind: "0.0.0.0:9000"
"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        let merged = config.merge_yaml(&path).unwrap();
        assert_eq!(merged.data_dir, PathBuf::from("my-docs"));
        assert_eq!(merged.top_k, 5);
        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.bind_addr, "0.0.0.0:9000");
    }
}

//! Environment check command.

use clap::Args;
use lumen_core::{config::AppConfig, AppError, AppResult};

/// Check provider credentials and configuration
#[derive(Args, Debug)]
pub struct CheckEnvCommand {}

impl CheckEnvCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        println!("Provider: {}", config.provider);
        println!("Model:    {}", config.model);

        let Some(env_var) = AppConfig::api_key_env(&config.provider) else {
            println!("Provider '{}' needs no API key.", config.provider);
            return Ok(());
        };

        match config.resolve_api_key() {
            Some(key) => {
                println!("{} is set: {}", env_var, mask_key(&key));
                Ok(())
            }
            None => {
                println!("{} is NOT set.", env_var);
                Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    env_var
                )))
            }
        }
    }
}

/// Show just enough of a key to recognize it without revealing it.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 10 {
        let head: String = chars[..5].iter().collect();
        let tail: String = chars[chars.len() - 5..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_long_key() {
        assert_eq!(mask_key("gsk_abcdefghijklmnop_12345"), "gsk_a...12345");
    }

    #[test]
    fn test_mask_short_key() {
        assert_eq!(mask_key("short"), "***");
        assert_eq!(mask_key(""), "***");
    }
}

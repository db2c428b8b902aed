//! Persona loading.
//!
//! Loads a persona definition from a YAML file, falling back to the built-in
//! default companion persona when no file is configured.

use crate::types::PersonaDefinition;
use lumen_core::{AppError, AppResult};
use std::path::Path;

/// The built-in companion persona.
///
/// A warm, supportive wellbeing companion that answers only from the
/// retrieved document context.
pub fn default_persona() -> PersonaDefinition {
    PersonaDefinition {
        id: "companion.default".to_string(),
        name: "Lumen".to_string(),
        greeting: "Hi! I'm Lumen, your friendly companion. I'm here for you.".to_string(),
        farewell: "Bye! Remember, you're stronger than you think. Take care!".to_string(),
        system: "\
You are Lumen, a warm, friendly, and supportive wellbeing companion.\n\
Speak like a caring friend who listens with empathy, not like a doctor.\n\
Use gentle encouragement and kind words. Share simple, practical tips\n\
drawn from the provided context. Keep answers positive and reassuring.\n\
If someone feels down, remind them they're not alone."
            .to_string(),
        template: "\
Context: {{context}}\n\
Question: {{question}}\n\
Chat history: {{chat_history}}\n\
\n\
Answer as Lumen:"
            .to_string(),
    }
}

/// Load a persona definition from a YAML file.
///
/// When `path` is `None`, the built-in default persona is returned.
pub fn load_persona(path: Option<&Path>) -> AppResult<PersonaDefinition> {
    let Some(path) = path else {
        tracing::debug!("Using built-in default persona");
        return Ok(default_persona());
    };

    tracing::debug!("Loading persona from: {:?}", path);

    if !path.exists() {
        return Err(AppError::Prompt(format!(
            "Persona file not found: {:?}",
            path
        )));
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Prompt(format!("Failed to read persona file {:?}: {}", path, e)))?;

    let persona: PersonaDefinition = serde_yaml::from_str(&contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse persona YAML {:?}: {}", path, e)))?;

    validate_persona(&persona)?;

    tracing::info!("Loaded persona: {} ({})", persona.id, persona.name);

    Ok(persona)
}

/// Validate required persona fields.
fn validate_persona(persona: &PersonaDefinition) -> AppResult<()> {
    if persona.id.is_empty() {
        return Err(AppError::Prompt("Persona id must not be empty".to_string()));
    }
    if persona.template.is_empty() {
        return Err(AppError::Prompt(
            "Persona template must not be empty".to_string(),
        ));
    }
    for var in ["{{context}}", "{{question}}", "{{chat_history}}"] {
        if !persona.template.contains(var) {
            return Err(AppError::Prompt(format!(
                "Persona template is missing the {} variable",
                var
            )));
        }
    }
    Ok(())
}

//! Persona prompt types.

use serde::{Deserialize, Serialize};

/// A persona definition, loaded from YAML or built in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaDefinition {
    /// Unique persona identifier
    pub id: String,

    /// Display name used in front ends (e.g., "Lumen")
    pub name: String,

    /// Line printed when an interactive session starts
    #[serde(default)]
    pub greeting: String,

    /// Line printed when an interactive session ends
    #[serde(default)]
    pub farewell: String,

    /// System message defining tone and behavior
    pub system: String,

    /// Handlebars template with `context`, `question`, `chat_history`
    pub template: String,
}

/// A fully rendered prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedPrompt {
    /// System message
    pub system: String,

    /// User message with context, question, and history substituted
    pub user: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_deserialization() {
        let yaml = r#"
id: companion.default
name: Lumen
greeting: "Hi! I'm here for you."
farewell: "Take care!"
system: "You are a warm companion."
template: "Context: {{context}}\nQuestion: {{question}}\nHistory: {{chat_history}}"
"#;

        let persona: PersonaDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(persona.id, "companion.default");
        assert_eq!(persona.name, "Lumen");
        assert!(persona.template.contains("{{question}}"));
    }

    #[test]
    fn test_optional_greeting_defaults_empty() {
        let yaml = r#"
id: p
name: P
system: s
template: t
"#;
        let persona: PersonaDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(persona.greeting.is_empty());
        assert!(persona.farewell.is_empty());
    }
}

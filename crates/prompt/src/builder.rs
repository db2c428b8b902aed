//! Prompt rendering.
//!
//! Renders a persona template with the per-request variables using
//! Handlebars. The template is fixed per deployment; only the variables
//! change between requests.

use crate::types::{PersonaDefinition, RenderedPrompt};
use handlebars::Handlebars;
use lumen_core::{AppError, AppResult};
use serde::Serialize;

/// Variables substituted into the persona template per request.
#[derive(Debug, Clone, Serialize)]
pub struct PromptVars {
    /// Concatenated retrieved chunk texts
    pub context: String,

    /// The user's question
    pub question: String,

    /// Serialized conversation history
    pub chat_history: String,
}

/// Render a persona template with the given variables.
///
/// Returns a `RenderedPrompt` carrying the persona's system message and the
/// substituted user message, ready for a single LLM completion.
pub fn render_prompt(persona: &PersonaDefinition, vars: &PromptVars) -> AppResult<RenderedPrompt> {
    tracing::debug!("Rendering persona template: {}", persona.id);

    let mut handlebars = Handlebars::new();
    // Chunk text may contain braces or HTML-ish fragments; substitute verbatim.
    handlebars.register_escape_fn(handlebars::no_escape);

    let user = handlebars
        .render_template(&persona.template, vars)
        .map_err(|e| AppError::Prompt(format!("Failed to render persona template: {}", e)))?;

    Ok(RenderedPrompt {
        system: persona.system.clone(),
        user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::default_persona;

    fn vars() -> PromptVars {
        PromptVars {
            context: "Take deep breaths when stressed.".to_string(),
            question: "I feel stressed".to_string(),
            chat_history: "You: hi\nLumen: hello".to_string(),
        }
    }

    #[test]
    fn test_render_substitutes_all_variables() {
        let persona = default_persona();
        let rendered = render_prompt(&persona, &vars()).unwrap();

        assert!(rendered.user.contains("Take deep breaths when stressed."));
        assert!(rendered.user.contains("I feel stressed"));
        assert!(rendered.user.contains("You: hi"));
        assert_eq!(rendered.system, persona.system);
    }

    #[test]
    fn test_render_does_not_escape_html() {
        let mut persona = default_persona();
        persona.template =
            "{{context}} / {{question}} / {{chat_history}}".to_string();

        let rendered = render_prompt(
            &persona,
            &PromptVars {
                context: "<b>bold</b>".to_string(),
                question: "q".to_string(),
                chat_history: String::new(),
            },
        )
        .unwrap();

        assert!(rendered.user.contains("<b>bold</b>"));
    }

    #[test]
    fn test_render_empty_history() {
        let persona = default_persona();
        let rendered = render_prompt(
            &persona,
            &PromptVars {
                context: "c".to_string(),
                question: "q".to_string(),
                chat_history: String::new(),
            },
        )
        .unwrap();

        assert!(rendered.user.contains("Chat history:"));
    }
}

//! Persona prompt system for Lumen.
//!
//! A persona is a fixed text skeleton that defines the assistant's tone and
//! instructions, rendered per request with the retrieved `context`, the
//! user's `question`, and the serialized `chat_history`.
//!
//! Personas ship with a built-in default (a warm wellbeing companion) and
//! can be replaced with a YAML definition file.

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::{render_prompt, PromptVars};
pub use loader::{default_persona, load_persona};
pub use types::{PersonaDefinition, RenderedPrompt};

//! Retrieval-augmented answer pipeline.
//!
//! Ties retrieval, prompt rendering, and LLM completion together behind the
//! `AnswerEngine` trait. Front ends (CLI, server) only see the trait, so
//! tests can swap in a stub engine.

use crate::embeddings::EmbeddingProvider;
use crate::index::ChunkIndex;
use crate::types::{AnswerResult, ConversationTurn};
use lumen_core::AppResult;
use lumen_llm::{LlmClient, LlmRequest};
use lumen_prompt::{render_prompt, PersonaDefinition, PromptVars};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

/// Separator between retrieved chunk texts in the prompt context.
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Sampling temperature for persona-flavored answers.
const ANSWER_TEMPERATURE: f32 = 0.7;

/// Upper bound on generated answer length.
const ANSWER_MAX_TOKENS: u32 = 1024;

/// Anything that can answer a question given conversation history.
#[async_trait::async_trait]
pub trait AnswerEngine: Send + Sync {
    /// Produce an answer for `question`, using `history` for context.
    ///
    /// The history is read-only; session bookkeeping belongs to the caller.
    async fn answer(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> AppResult<AnswerResult>;
}

/// The production answer pipeline: embed, retrieve, render, complete.
pub struct Pipeline {
    // rusqlite connections are not Sync; the index is read-only after build
    // so the lock only serializes the similarity scan.
    index: Mutex<ChunkIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    persona: PersonaDefinition,
    model: String,
    top_k: usize,
}

impl Pipeline {
    pub fn new(
        index: ChunkIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        persona: PersonaDefinition,
        model: String,
        top_k: usize,
    ) -> Self {
        Self {
            index: Mutex::new(index),
            embedder,
            llm,
            persona,
            model,
            top_k,
        }
    }

    /// The persona this pipeline answers as.
    pub fn persona(&self) -> &PersonaDefinition {
        &self.persona
    }

    /// Serialize history as alternating "You:"/"<persona>:" lines.
    fn serialize_history(&self, history: &[ConversationTurn]) -> String {
        history
            .iter()
            .flat_map(|turn| {
                [
                    format!("You: {}", turn.question),
                    format!("{}: {}", self.persona.name, turn.answer),
                ]
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait::async_trait]
impl AnswerEngine for Pipeline {
    async fn answer(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> AppResult<AnswerResult> {
        let query_embedding = self.embedder.embed(question).await?;

        let retrieved = {
            let index = self
                .index
                .lock()
                .map_err(|_| lumen_core::AppError::Knowledge("Index lock poisoned".to_string()))?;
            index.search(&query_embedding, self.top_k)?
        };

        tracing::debug!(
            "Retrieved {} chunks for question ({} history turns)",
            retrieved.len(),
            history.len()
        );

        let context = retrieved
            .iter()
            .map(|(chunk, _)| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let source_files: BTreeSet<String> = retrieved
            .iter()
            .map(|(chunk, _)| chunk.source_file.clone())
            .filter(|name| !name.is_empty())
            .collect();

        let vars = PromptVars {
            context,
            question: question.to_string(),
            chat_history: self.serialize_history(history),
        };
        let rendered = render_prompt(&self.persona, &vars)?;

        let request = LlmRequest::new(rendered.user, &self.model)
            .with_system(rendered.system)
            .with_temperature(ANSWER_TEMPERATURE)
            .with_max_tokens(ANSWER_MAX_TOKENS);

        let response = self.llm.complete(&request).await?;

        Ok(AnswerResult {
            answer_text: response.content,
            source_files,
        })
    }
}

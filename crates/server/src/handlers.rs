//! Request handlers.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::Json;
use lumen_knowledge::ConversationTurn;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Minimal browser chat page, served at the root.
const CHAT_PAGE: &str = include_str!("../assets/chat.html");

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,

    /// Omitted on the first request of a conversation; the response carries
    /// the id to send back on subsequent turns.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub session_id: String,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".to_string()));
    }

    let session_id = payload
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let history = state.history(&session_id).await;

    tracing::info!(
        session_id = %session_id,
        history_turns = history.len(),
        "Answering chat request"
    );

    let result = state.engine.answer(message, &history).await?;

    state
        .record_turn(
            &session_id,
            ConversationTurn {
                question: message.to_string(),
                answer: result.answer_text.clone(),
            },
        )
        .await;

    Ok(Json(ChatResponse {
        answer: result.answer_text,
        sources: result.source_files.into_iter().collect(),
        session_id,
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn home(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(CHAT_PAGE.replace("{{assistant_name}}", &state.assistant_name))
}

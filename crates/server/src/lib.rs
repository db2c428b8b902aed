//! HTTP front end.
//!
//! Exposes the answer engine over a small REST surface: `POST /chat` for
//! question answering, `GET /health` for liveness, and a minimal chat page
//! at the root. Conversation history is tracked per session id on the
//! server; clients pass the id back to continue a conversation.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::router;
pub use state::AppState;

use lumen_core::{AppError, AppResult};
use std::sync::Arc;

/// Bind and serve until the process is terminated.
pub async fn run_server(bind_addr: &str, state: Arc<AppState>) -> AppResult<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("Failed to bind {}: {}", bind_addr, e)))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| AppError::Server(format!("Failed to read local address: {}", e)))?;
    tracing::info!("Listening on http://{}", local_addr);

    axum::serve(listener, router(state))
        .await
        .map_err(|e| AppError::Server(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use lumen_core::AppResult;
    use lumen_knowledge::{AnswerEngine, AnswerResult, ConversationTurn};
    use std::collections::BTreeSet;
    use tower::util::ServiceExt;

    /// Engine that answers with the number of history turns it was given.
    #[derive(Debug)]
    struct EchoEngine;

    #[async_trait::async_trait]
    impl AnswerEngine for EchoEngine {
        async fn answer(
            &self,
            question: &str,
            history: &[ConversationTurn],
        ) -> AppResult<AnswerResult> {
            let mut source_files = BTreeSet::new();
            source_files.insert("tips.txt".to_string());
            Ok(AnswerResult {
                answer_text: format!("echo:{}:turns={}", question, history.len()),
                source_files,
            })
        }
    }

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(Arc::new(EchoEngine), "Lumen".to_string()))
    }

    async fn post_chat(
        app: &axum::Router,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_chat_returns_answer_and_session_id() {
        let app = router(test_state());
        let (status, body) = post_chat(&app, serde_json::json!({ "message": "hello" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "echo:hello:turns=0");
        assert_eq!(body["sources"][0], "tips.txt");
        assert!(!body["session_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let app = router(test_state());
        let (status, body) = post_chat(&app, serde_json::json!({ "message": "   " })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let app = router(test_state());

        let (_, first) = post_chat(&app, serde_json::json!({ "message": "one" })).await;
        let session_a = first["session_id"].as_str().unwrap().to_string();

        // Same session accumulates history.
        let (_, second) = post_chat(
            &app,
            serde_json::json!({ "message": "two", "session_id": session_a }),
        )
        .await;
        assert_eq!(second["answer"], "echo:two:turns=1");

        // A fresh session starts empty.
        let (_, other) = post_chat(&app, serde_json::json!({ "message": "three" })).await;
        assert_eq!(other["answer"], "echo:three:turns=0");
        assert_ne!(other["session_id"], second["session_id"]);
    }

    #[tokio::test]
    async fn test_home_serves_chat_page() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("Lumen"));
    }
}

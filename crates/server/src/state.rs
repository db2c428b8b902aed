//! Shared server state.

use lumen_knowledge::{AnswerEngine, ConversationTurn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Upper bound on concurrently tracked sessions. When a new session would
/// exceed it, the longest-idle session is dropped.
const MAX_SESSIONS: usize = 1024;

/// One client's conversation, with its last activity time for eviction.
struct Session {
    turns: Vec<ConversationTurn>,
    last_active: Instant,
}

/// State shared across request handlers.
///
/// Conversation histories live per session id, so concurrent clients never
/// see each other's turns. Histories are kept in memory only and capped at
/// `MAX_SESSIONS`; a restart starts every session fresh.
pub struct AppState {
    /// The answer engine behind every /chat request
    pub engine: Arc<dyn AnswerEngine>,

    /// Per-session conversation histories
    sessions: RwLock<HashMap<String, Session>>,

    /// Display name the assistant answers as
    pub assistant_name: String,
}

impl AppState {
    pub fn new(engine: Arc<dyn AnswerEngine>, assistant_name: String) -> Self {
        Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
            assistant_name,
        }
    }

    /// Snapshot the history for a session (empty for unknown sessions).
    pub async fn history(&self, session_id: &str) -> Vec<ConversationTurn> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|session| session.turns.clone())
            .unwrap_or_default()
    }

    /// Append a completed turn to a session's history.
    ///
    /// Creating a session past the cap evicts the longest-idle one first.
    pub async fn record_turn(&self, session_id: &str, turn: ConversationTurn) {
        let mut sessions = self.sessions.write().await;

        if !sessions.contains_key(session_id) && sessions.len() >= MAX_SESSIONS {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_active)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                tracing::debug!("Evicting idle session {}", oldest);
                sessions.remove(&oldest);
            }
        }

        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                turns: Vec::new(),
                last_active: Instant::now(),
            });
        session.turns.push(turn);
        session.last_active = Instant::now();
    }

    /// Number of sessions currently tracked.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

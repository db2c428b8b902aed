//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A chunk of document text with its embedding.
///
/// Produced by the loader and chunker at index-build time; immutable once
/// stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Name of the originating file (not the full path)
    pub source_file: String,

    /// Position within the source document
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector (normalized); set once at build time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// One question/answer exchange in a conversation.
///
/// Histories are append-only within a session; turns are never edited or
/// removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// What the user asked
    pub question: String,

    /// What the assistant answered
    pub answer: String,
}

/// The result of one answer pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    /// Generated answer text
    pub answer_text: String,

    /// Deduplicated source file names of the retrieved chunks
    pub source_files: BTreeSet<String>,
}

/// Statistics for a built index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of chunks stored
    pub chunks_count: u32,

    /// Distinct source file names
    pub source_files: BTreeSet<String>,
}

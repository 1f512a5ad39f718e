use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub title: String,
    pub source_path: String,
    pub text: String,
    pub checksum: String,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub source_path: String,
    pub title: String,
    pub chunk_index: u64,
    /// Offset of the first character of `text` within the document, in chars.
    pub start_char: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

impl Turn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    pub category: Option<String>,
}

impl ChatRequest {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AnswerOrigin {
    Canned,
    Generated,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub answer: String,
    pub origin: AnswerOrigin,
    pub standalone_question: Option<String>,
    /// Source paths of the chunks the answer was composed from, in rank order.
    pub sources: Vec<String>,
}

impl ChatReply {
    pub fn canned(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            origin: AnswerOrigin::Canned,
            standalone_question: None,
            sources: Vec::new(),
        }
    }

    pub fn failed(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            origin: AnswerOrigin::Failed,
            standalone_question: None,
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
    pub extensions: Vec<String>,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: 1_000,
            chunk_overlap_chars: 100,
            extensions: vec!["docx".to_string()],
        }
    }
}

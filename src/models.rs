use std::sync::Arc;

use crate::rag::{AnswerSource, RagEngine};
use crate::session::ChatSession;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RagEngine>,
    pub session: ChatSession,
}

impl AppState {
    pub fn new(engine: RagEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            session: ChatSession::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatResponse {
    pub messages: Vec<ChatMessage>,
    /// None when answering failed and an apology was recorded instead
    pub source: Option<AnswerSource>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub chunks: usize,
    pub embedding_model: String,
    pub llm_configured: bool,
}

//! Process-wide chat history

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::ChatMessage;

pub const GREETING: &str = "Hello! I'm your Home Insurance Assistant. Ask me anything about your policy coverage, claims process, or policy details.";

/// Questions offered in the sidebar
pub const SAMPLE_QUESTIONS: [&str; 5] = [
    "What does my policy cover for water damage?",
    "How do I file a claim for roof damage?",
    "What is my deductible for fire damage?",
    "Are home office equipment covered?",
    "What's the process for emergency repairs?",
];

#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<RwLock<Vec<ChatMessage>>>,
}

impl ChatSession {
    /// A history holding only the greeting
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(vec![ChatMessage::assistant(GREETING)])),
        }
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.inner.read().await.clone()
    }

    pub async fn push(&self, message: ChatMessage) {
        self.inner.write().await.push(message);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[tokio::test]
    async fn test_starts_with_greeting() {
        let session = ChatSession::new();
        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, GREETING);
    }

    #[tokio::test]
    async fn test_clones_share_history() {
        let session = ChatSession::new();
        let other = session.clone();
        other.push(ChatMessage::user("Is mold covered?")).await;
        session.push(ChatMessage::assistant("No.")).await;

        assert_eq!(session.len().await, 3);
        let messages = other.messages().await;
        assert_eq!(messages[1], ChatMessage::user("Is mold covered?"));
        assert_eq!(messages[2], ChatMessage::assistant("No."));
    }
}

pub mod budget;
pub mod conversation;
pub mod summarizer;
pub mod token_counter;
pub mod window;

pub use budget::{BudgetUpdate, TokenBudget, TokenStatus, UsageState};
pub use conversation::Conversation;
pub use summarizer::ContextSummarizer;
pub use token_counter::TokenCounter;
pub use window::ContextFitter;

use serde::{Deserialize, Serialize};

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// A role/content pair in the shape chat-completion APIs accept.
///
/// Roles are free-form: only `"system"` carries meaning for fitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ROLE_SYSTEM, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ROLE_USER, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ROLE_ASSISTANT, content)
    }

    pub fn is_system(&self) -> bool {
        self.role == ROLE_SYSTEM
    }
}

/// A conversation entry with its token cost cached at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: String,
    content: String,
    token_count: usize,
    timestamp: i64,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>, counter: &TokenCounter) -> Self {
        let role = role.into();
        let content = content.into();
        let token_count = counter.count_text(&content) + token_counter::MESSAGE_OVERHEAD;

        Self {
            role,
            content,
            token_count,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn is_system(&self) -> bool {
        self.role == ROLE_SYSTEM
    }

    pub fn to_chat(&self) -> ChatMessage {
        ChatMessage::new(self.role.clone(), self.content.clone())
    }
}

pub mod agent;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod observability;
pub mod resilience;

pub use agent::{Agent, AgentKind, AgentProfile};
pub use client::{CompletionClient, MemoryProvider};
pub use config::MotomiConfig;
pub use context::{ChatMessage, ContextFitter, Conversation, TokenBudget};
pub use error::{MotomiError, Result};

pub mod profile;

pub use profile::{AgentKind, AgentProfile};

use crate::client::{CompletionClient, CompletionRequest, MemoryProvider};
use crate::config::MotomiConfig;
use crate::context::{Conversation, ContextFitter, TokenBudget, ROLE_ASSISTANT, ROLE_USER};
use crate::error::{MotomiError, Result};
use crate::observability::MetricsCollector;
use std::sync::Arc;
use tracing::{info, instrument};

/// Memory blurbs appended to the system prompt before each request
pub const MEMORY_BLURB_COUNT: usize = 3;

pub const DEFAULT_MAX_REPLY_TOKENS: usize = 2048;

/// One agent identity driving its own token-managed conversation
pub struct Agent {
    profile: AgentProfile,
    conversation: Conversation,
    fitter: ContextFitter,
    client: Arc<dyn CompletionClient>,
    memory: Option<Arc<dyn MemoryProvider>>,
    max_reply_tokens: usize,
}

impl Agent {
    pub fn new(
        profile: AgentProfile,
        budget: TokenBudget,
        client: Arc<dyn CompletionClient>,
        model: Option<String>,
    ) -> Self {
        let conversation = Conversation::new(budget)
            .with_client(client.clone(), model)
            .with_label(profile.kind.as_str());

        let mut agent = Self {
            profile,
            conversation,
            fitter: ContextFitter::default(),
            client,
            memory: None,
            max_reply_tokens: DEFAULT_MAX_REPLY_TOKENS,
        };
        agent.refresh_system_prompt();
        agent
    }

    pub fn from_config(
        config: &MotomiConfig,
        kind: AgentKind,
        client: Arc<dyn CompletionClient>,
    ) -> Result<Self> {
        let profile = config.profile(kind)?;
        let budget = config.budget.to_budget()?;

        Ok(Self::new(profile, budget, client, config.client.model.clone())
            .with_fitter(config.fitter.to_fitter())
            .with_max_reply_tokens(config.client.max_reply_tokens))
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryProvider>) -> Self {
        self.memory = Some(memory);
        self.refresh_system_prompt();
        self
    }

    pub fn with_fitter(mut self, fitter: ContextFitter) -> Self {
        self.fitter = fitter;
        self
    }

    pub fn with_max_reply_tokens(mut self, max_reply_tokens: usize) -> Self {
        self.max_reply_tokens = max_reply_tokens;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.conversation = self.conversation.with_metrics(metrics);
        self
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Rebuild the system prompt from the profile and current memories
    pub fn refresh_system_prompt(&mut self) {
        let prompt = match &self.memory {
            Some(memory) => format!(
                "{}\n\n{}",
                self.profile.system_prompt.trim(),
                memory.format_for_context(MEMORY_BLURB_COUNT)
            ),
            None => self.profile.system_prompt.trim().to_string(),
        };

        if self.conversation.system_prompt() != Some(prompt.as_str()) {
            self.conversation.set_system_prompt(prompt);
        }
    }

    /// Send one user turn and record the reply.
    ///
    /// The user message stays in history even if the completion fails.
    #[instrument(skip(self, input), fields(agent = %self.profile.kind))]
    pub async fn respond(&mut self, input: &str) -> Result<String> {
        self.refresh_system_prompt();
        self.conversation.add_message(input, ROLE_USER);

        if self.conversation.maybe_summarize().await {
            info!("history summarized before request");
        }

        let messages = self.conversation.fit_messages(&self.fitter);
        let request = CompletionRequest::new(
            self.conversation.completion_model(),
            messages,
            self.max_reply_tokens,
        );

        let response = self.client.complete(request).await?;
        let reply = response
            .first_content()
            .ok_or(MotomiError::EmptyCompletion)?
            .to_string();

        self.conversation.add_message(reply.clone(), ROLE_ASSISTANT);
        Ok(reply)
    }

    /// Built-in chat commands. `None` means the input isn't a command.
    pub fn handle_command(&mut self, input: &str) -> Option<String> {
        match input.trim().to_lowercase().as_str() {
            "clear" => {
                self.conversation.clear();
                Some("Conversation history cleared.".to_string())
            }
            "status" | "token status" => {
                let status = self.conversation.get_token_status();
                Some(format!(
                    "Token status for {}:\n\
                     Current tokens: {}\n\
                     Maximum tokens: {}\n\
                     Usage: {:.1}%\n\
                     Warning issued: {}\n\
                     Summarization performed: {}",
                    self.profile.name,
                    status.current_tokens,
                    status.max_tokens,
                    status.usage_percent,
                    status.warning_issued,
                    status.summarization_performed
                ))
            }
            _ => None,
        }
    }
}

/// Token-managed conversation state

use crate::client::CompletionClient;
use crate::context::budget::{BudgetUpdate, TokenBudget, TokenStatus, UsageState};
use crate::context::summarizer::ContextSummarizer;
use crate::context::token_counter::TokenCounter;
use crate::context::window::ContextFitter;
use crate::context::{ChatMessage, Message, ROLE_SYSTEM};
use crate::error::Result;
use crate::log_budget;
use crate::observability::MetricsCollector;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Fewest messages worth summarizing
pub const MIN_MESSAGES_TO_SUMMARIZE: usize = 6;

/// Messages left verbatim after a summarization (two exchanges)
pub const KEEP_AFTER_SUMMARY: usize = 4;

const DEFAULT_LABEL: &str = "default";

/// Message history with running token accounting and one-shot summarization.
///
/// A conversation is driven by one caller at a time: `maybe_summarize` must
/// be awaited before the next mutation. No locking happens internally.
pub struct Conversation {
    id: Uuid,
    label: String,
    budget: TokenBudget,
    counter: TokenCounter,
    usage: UsageState,
    system_prompt: Option<String>,
    messages: Vec<Message>,
    client: Option<Arc<dyn CompletionClient>>,
    completion_model: Option<String>,
    metrics: Option<MetricsCollector>,
}

impl Conversation {
    pub fn new(budget: TokenBudget) -> Self {
        let counter = TokenCounter::new(budget.model());
        Self {
            id: Uuid::new_v4(),
            label: DEFAULT_LABEL.to_string(),
            budget,
            counter,
            usage: UsageState::default(),
            system_prompt: None,
            messages: Vec::new(),
            client: None,
            completion_model: None,
            metrics: None,
        }
    }

    /// Attach the client used for summaries. `model` is the deployment the
    /// client should call; the budget's model is used when it's `None`.
    pub fn with_client(mut self, client: Arc<dyn CompletionClient>, model: Option<String>) -> Self {
        self.client = Some(client);
        self.completion_model = model;
        self
    }

    /// Name recorded on logs and metrics, usually the agent's
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        metrics.set_tokens(&self.label, self.usage.current_tokens());
        self.metrics = Some(metrics);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn budget(&self) -> &TokenBudget {
        &self.budget
    }

    pub fn usage(&self) -> &UsageState {
        &self.usage
    }

    pub fn counter(&self) -> &TokenCounter {
        &self.counter
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// History without the system prompt
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn completion_model(&self) -> &str {
        self.completion_model.as_deref().unwrap_or(self.budget.model())
    }

    pub fn add_message(&mut self, content: impl Into<String>, role: impl Into<String>) {
        let message = Message::new(role, content, &self.counter);
        let tokens = message.token_count();
        self.messages.push(message);
        self.add_tokens(tokens as i64);
    }

    /// Set or replace the system prompt, charging only the token difference.
    /// An empty prompt clears it.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        let old_tokens = self.system_prompt_tokens();

        self.system_prompt = if prompt.is_empty() { None } else { Some(prompt) };
        let new_tokens = self.system_prompt_tokens();

        self.add_tokens(new_tokens as i64 - old_tokens as i64);
    }

    /// System prompt first, then the history, as role/content pairs
    pub fn get_messages(&self) -> Vec<ChatMessage> {
        let mut result = Vec::with_capacity(self.messages.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            result.push(ChatMessage::system(prompt.clone()));
        }
        result.extend(self.messages.iter().map(Message::to_chat));
        result
    }

    /// Drop the history and reset usage, keeping the system prompt
    pub fn clear(&mut self) {
        let system_tokens = self.system_prompt_tokens();
        self.messages.clear();
        self.usage.reset();
        self.add_tokens(system_tokens as i64);
        log_budget!(debug, self.label.as_str(), tokens = system_tokens, "conversation cleared");
    }

    pub fn get_token_status(&self) -> TokenStatus {
        self.usage.status(&self.budget)
    }

    /// Change the budget at runtime. Rejected updates leave it untouched.
    pub fn update_budget(&mut self, update: &BudgetUpdate) -> Result<bool> {
        let changed = self.budget.apply(update)?;
        if changed && self.usage.check_warning(&self.budget) {
            self.on_warning();
        }
        Ok(changed)
    }

    /// Current messages fitted to the usable ceiling
    pub fn fit_messages(&self, fitter: &ContextFitter) -> Vec<ChatMessage> {
        let messages = self.get_messages();
        let fitted = fitter.fit_with(&self.counter, &messages, self.budget.usable_tokens());

        if fitted != messages {
            log_budget!(
                debug,
                self.label.as_str(),
                before = messages.len(),
                after = fitted.len(),
                "history cut to fit context"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_fit_truncation(&self.label);
            }
        }
        fitted
    }

    /// The last `num_exchanges` user/assistant pairs as plain text
    pub fn recent_transcript(&self, num_exchanges: usize) -> String {
        let limit = num_exchanges * 2;
        let start = self.messages.len().saturating_sub(limit);
        format!(
            "Recent conversation:\n\n{}",
            ContextSummarizer::format_transcript(&self.messages[start..])
        )
    }

    /// Replace older history with a model-written summary if the budget calls for it.
    ///
    /// Runs at most once per conversation (until `clear`). Keeps the last
    /// [`KEEP_AFTER_SUMMARY`] messages verbatim. Returns false, leaving the
    /// conversation untouched, when summarization isn't due, isn't possible,
    /// fails, or would not shrink the history.
    #[instrument(skip(self), fields(conversation = %self.id, agent = %self.label))]
    pub async fn maybe_summarize(&mut self) -> bool {
        if !self.usage.should_summarize(&self.budget) {
            return false;
        }
        let Some(client) = self.client.clone() else {
            return false;
        };
        if self.messages.len() < MIN_MESSAGES_TO_SUMMARIZE {
            return false;
        }

        let split = self.messages.len() - KEEP_AFTER_SUMMARY;
        let request = ContextSummarizer::segment_request(&self.messages[..split], self.completion_model());

        let summary = match client.complete(request).await {
            Ok(response) => match response.first_content() {
                Some(text) => text.to_string(),
                None => {
                    log_budget!(warn, self.label.as_str(), "summary response had no choices");
                    self.record_summarization(false);
                    return false;
                }
            },
            Err(e) => {
                log_budget!(warn, self.label.as_str(), error = %e, "summarization request failed");
                self.record_summarization(false);
                return false;
            }
        };

        let old_tokens: usize = self.messages[..split].iter().map(Message::token_count).sum();
        let summary_message = Message::new(
            ROLE_SYSTEM,
            ContextSummarizer::summary_content(&summary),
            &self.counter,
        );
        let new_tokens = summary_message.token_count();

        if new_tokens >= old_tokens {
            log_budget!(
                info,
                self.label.as_str(),
                old_tokens,
                new_tokens,
                "summary not smaller than history, keeping original"
            );
            self.record_summarization(false);
            return false;
        }

        self.messages.drain(..split);
        self.messages.insert(0, summary_message);
        self.add_tokens(new_tokens as i64 - old_tokens as i64);
        self.usage.mark_summarized();
        self.record_summarization(true);

        log_budget!(
            info,
            self.label.as_str(),
            summarized = split,
            old_tokens,
            new_tokens,
            current_tokens = self.usage.current_tokens(),
            "conversation summarized"
        );
        true
    }

    fn system_prompt_tokens(&self) -> usize {
        self.system_prompt
            .as_deref()
            .map(|p| self.counter.count_message(&ChatMessage::system(p)))
            .unwrap_or(0)
    }

    fn add_tokens(&mut self, delta: i64) {
        if self.usage.apply_delta(delta, &self.budget) {
            self.on_warning();
        }
        if let Some(metrics) = &self.metrics {
            metrics.set_tokens(&self.label, self.usage.current_tokens());
        }
    }

    fn on_warning(&self) {
        let status = self.get_token_status();
        log_budget!(
            warn,
            self.label.as_str(),
            current_tokens = status.current_tokens,
            usage_percent = status.usage_percent,
            "token usage crossed warning threshold"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_warning(&self.label);
        }
    }

    fn record_summarization(&self, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_summarization(&self.label, success);
        }
    }
}

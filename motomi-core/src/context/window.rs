/// Context window fitting

use crate::context::token_counter::TokenCounter;
use crate::context::ChatMessage;
use tracing::debug;

/// Content used when not even a truncated prefix fits
pub const TRUNCATION_PLACEHOLDER: &str = "[Content truncated due to length]";

/// Appended to content cut short by the fitter
pub const TRUNCATION_MARKER: &str = " [... truncated]";

const MARKER_HEADROOM: usize = 10;
const DEGRADED_RECENT: usize = 2;

/// Fits a message history into a token ceiling.
///
/// Priority order is system messages, then the `preserve_recent` newest
/// messages, then as many older messages as fit, newest first. The fitter
/// holds no state and can be shared between conversations.
#[derive(Debug, Clone)]
pub struct ContextFitter {
    preserve_recent: usize,
    min_truncation_budget: usize,
}

impl ContextFitter {
    pub fn new(preserve_recent: usize, min_truncation_budget: usize) -> Self {
        Self {
            preserve_recent,
            min_truncation_budget,
        }
    }

    pub fn preserve_recent(&self) -> usize {
        self.preserve_recent
    }

    pub fn min_truncation_budget(&self) -> usize {
        self.min_truncation_budget
    }

    pub fn fit(&self, messages: &[ChatMessage], ceiling: usize, model: &str) -> Vec<ChatMessage> {
        self.fit_with(&TokenCounter::new(model), messages, ceiling)
    }

    pub fn fit_with(
        &self,
        counter: &TokenCounter,
        messages: &[ChatMessage],
        ceiling: usize,
    ) -> Vec<ChatMessage> {
        if messages.is_empty() {
            return Vec::new();
        }

        let total = counter.count_messages(messages);
        if total <= ceiling {
            return messages.to_vec();
        }

        let (system, regular): (Vec<ChatMessage>, Vec<ChatMessage>) =
            messages.iter().cloned().partition(|m| m.is_system());

        let split = regular.len().saturating_sub(self.preserve_recent);
        let (older, recent) = regular.split_at(split);

        let mut fixed = system.clone();
        fixed.extend_from_slice(recent);
        let fixed_tokens = counter.count_messages(&fixed);

        if fixed_tokens > ceiling {
            debug!(
                total,
                fixed_tokens,
                ceiling,
                "system and recent messages exceed ceiling, forcing truncation"
            );
            let mut kept = system;
            kept.extend_from_slice(&recent[recent.len().saturating_sub(DEGRADED_RECENT)..]);
            if kept.is_empty() {
                kept.extend(regular.last().cloned());
            }
            return self.force_fit(counter, kept, ceiling);
        }

        // Walk older messages newest first
        let mut available = ceiling - fixed_tokens;
        let mut included = Vec::new();

        for message in older.iter().rev() {
            let tokens = counter.count_message(message);
            if tokens <= available {
                included.push(message.clone());
                available -= tokens;
            } else {
                if available > self.min_truncation_budget {
                    included.push(truncate_message(counter, message, available));
                }
                break;
            }
        }
        included.reverse();

        debug!(
            total,
            ceiling,
            kept_older = included.len(),
            dropped_older = older.len() - included.len(),
            "fitted messages to context"
        );

        let mut result = system;
        result.extend(included);
        result.extend_from_slice(recent);
        result
    }

    /// Last resort: shrink contents oldest first until the set fits.
    fn force_fit(
        &self,
        counter: &TokenCounter,
        mut kept: Vec<ChatMessage>,
        ceiling: usize,
    ) -> Vec<ChatMessage> {
        for i in 0..kept.len() {
            let total = counter.count_messages(&kept);
            if total <= ceiling {
                return kept;
            }

            let current = counter.count_message(&kept[i]);
            let target = current.saturating_sub(total - ceiling);
            let shrunk = truncate_message(counter, &kept[i], target);
            if counter.count_message(&shrunk) < current {
                kept[i] = shrunk;
            }
        }

        while kept.len() > 1 && counter.count_messages(&kept) > ceiling {
            kept.remove(0);
        }

        if counter.count_messages(&kept) > ceiling {
            if let Some(last) = kept.last_mut() {
                last.content = TRUNCATION_PLACEHOLDER.to_string();
            }
        }

        kept
    }
}

impl Default for ContextFitter {
    fn default() -> Self {
        Self::new(4, 100)
    }
}

/// Truncate one message so it costs at most `max_tokens`, overhead included.
///
/// Falls back to [`TRUNCATION_PLACEHOLDER`] when no prefix fits.
pub fn truncate_message(counter: &TokenCounter, message: &ChatMessage, max_tokens: usize) -> ChatMessage {
    let overhead = counter.count_message(&ChatMessage::new(message.role.clone(), ""));
    let placeholder = ChatMessage::new(message.role.clone(), TRUNCATION_PLACEHOLDER);

    if max_tokens <= overhead {
        return placeholder;
    }

    let allowed = max_tokens - overhead;
    if counter.count_text(&message.content) <= allowed {
        return message.clone();
    }

    let mut keep = allowed.saturating_sub(MARKER_HEADROOM);
    while keep > 0 {
        if let Some(prefix) = counter.truncate_text(&message.content, keep) {
            let candidate = format!("{}{}", prefix, TRUNCATION_MARKER);
            if counter.count_text(&candidate) <= allowed {
                return ChatMessage::new(message.role.clone(), candidate);
            }
        }
        keep -= 1;
    }

    placeholder
}

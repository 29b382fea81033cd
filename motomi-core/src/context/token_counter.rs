/// Token counting utilities

use crate::context::ChatMessage;
use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

/// Model context windows
pub const MODEL_TOKEN_LIMITS: &[(&str, usize)] = &[
    ("gpt-3.5-turbo", 16385),
    ("gpt-3.5-turbo-16k", 16385),
    ("gpt-4", 8192),
    ("gpt-4-32k", 32768),
    ("gpt-4-turbo", 128000),
    ("gpt-4o", 128000),
    ("o3-mini", 16384),
    ("claude-3-opus", 200000),
    ("claude-3-sonnet", 200000),
    ("claude-3-haiku", 200000),
];

/// Ceiling for models missing from [`MODEL_TOKEN_LIMITS`]
pub const DEFAULT_TOKEN_LIMIT: usize = 4096;

/// Model assumed when a caller doesn't name one
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Role and formatting tokens charged to every message, whatever its role
pub const MESSAGE_OVERHEAD: usize = 4;

/// Tokens priming the assistant reply, charged once per request
pub const REPLY_PRIMING: usize = 3;

const CHARS_PER_TOKEN: usize = 4;

static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn cl100k() -> Option<&'static CoreBPE> {
    CL100K.get_or_init(|| tiktoken_rs::cl100k_base().ok()).as_ref()
}

/// GPT-style families and unknown names both resolve to cl100k. `None` means
/// the BPE tables failed to load and the character heuristic takes over.
fn resolve_encoding(_model: &str) -> Option<&'static CoreBPE> {
    cl100k()
}

#[derive(Clone)]
pub struct TokenCounter {
    model: String,
    bpe: Option<&'static CoreBPE>,
}

impl TokenCounter {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            bpe: resolve_encoding(model),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Context window of this counter's model
    pub fn token_limit(&self) -> usize {
        token_limit(&self.model)
    }

    /// Number of tokens `text` encodes to. Empty text is zero.
    pub fn count_text(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        match self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => text.chars().count().div_ceil(CHARS_PER_TOKEN),
        }
    }

    pub fn count_message(&self, message: &ChatMessage) -> usize {
        self.count_text(&message.content) + MESSAGE_OVERHEAD
    }

    pub fn count_messages(&self, messages: &[ChatMessage]) -> usize {
        messages
            .iter()
            .map(|m| self.count_message(m))
            .sum::<usize>()
            + REPLY_PRIMING
    }

    /// Keep the first `max_tokens` tokens of `text`.
    ///
    /// Returns `None` if the prefix can't be decoded back to valid UTF-8,
    /// which happens when the cut lands inside a multi-byte character.
    pub fn truncate_text(&self, text: &str, max_tokens: usize) -> Option<String> {
        match self.bpe {
            Some(bpe) => {
                let tokens = bpe.encode_with_special_tokens(text);
                if tokens.len() <= max_tokens {
                    return Some(text.to_string());
                }
                bpe.decode(tokens[..max_tokens].to_vec()).ok()
            }
            None => Some(text.chars().take(max_tokens * CHARS_PER_TOKEN).collect()),
        }
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

/// Hard ceiling for `model`, or [`DEFAULT_TOKEN_LIMIT`] when unknown
pub fn token_limit(model: &str) -> usize {
    MODEL_TOKEN_LIMITS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, limit)| *limit)
        .unwrap_or(DEFAULT_TOKEN_LIMIT)
}

pub fn count_text(text: &str, model: &str) -> usize {
    TokenCounter::new(model).count_text(text)
}

pub fn count_message(message: &ChatMessage, model: &str) -> usize {
    TokenCounter::new(model).count_message(message)
}

pub fn count_messages(messages: &[ChatMessage], model: &str) -> usize {
    TokenCounter::new(model).count_messages(messages)
}

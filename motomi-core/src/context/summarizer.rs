/// Conversation summarization prompts and fallbacks

use crate::client::{CompletionClient, CompletionRequest};
use crate::context::{ChatMessage, Message, ROLE_USER};
use crate::error::{MotomiError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;

/// Reply budget for summary requests
pub const SUMMARY_MAX_TOKENS: usize = 1024;

const SEGMENT_INSTRUCTION: &str = "Summarize the following conversation segment concisely while \
preserving key information. Use third person, objective language.";

const BLOCK_INSTRUCTION: &str = "You are a summarization assistant.";

const TOPIC_COUNT: usize = 5;

static TOPIC_WORD: OnceLock<Option<Regex>> = OnceLock::new();

/// Words of four or more characters
fn topic_word_pattern() -> Option<&'static Regex> {
    TOPIC_WORD
        .get_or_init(|| Regex::new(r"\b\w{4,}\b").ok())
        .as_ref()
}

/// Builds summary requests and the messages that replace summarized history
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextSummarizer;

impl ContextSummarizer {
    /// Render messages as alternating `User:` / `Assistant:` paragraphs.
    ///
    /// Any role other than `user` is shown as `Assistant`.
    pub fn format_transcript(messages: &[Message]) -> String {
        let mut transcript = String::new();
        for message in messages {
            let speaker = if message.role() == ROLE_USER { "User" } else { "Assistant" };
            transcript.push_str(speaker);
            transcript.push_str(": ");
            transcript.push_str(message.content());
            transcript.push_str("\n\n");
        }
        transcript
    }

    /// Request asking for a third-person summary of a conversation segment
    pub fn segment_request(messages: &[Message], model: &str) -> CompletionRequest {
        CompletionRequest::new(
            model,
            vec![
                ChatMessage::system(SEGMENT_INSTRUCTION),
                ChatMessage::user(Self::format_transcript(messages)),
            ],
            SUMMARY_MAX_TOKENS,
        )
    }

    /// Content of the synthetic message standing in for summarized history
    pub fn summary_content(summary: &str) -> String {
        format!("[SUMMARY OF PREVIOUS CONVERSATION: {}]", summary)
    }

    /// Summarize an arbitrary block of chat messages with the client.
    ///
    /// Never fails: a client error yields a placeholder noting how many
    /// messages were omitted.
    pub async fn summarize_block(
        client: &dyn CompletionClient,
        messages: &[ChatMessage],
        model: &str,
    ) -> ChatMessage {
        match Self::request_block_summary(client, messages, model).await {
            Ok(summary) => ChatMessage::system(format!("CONVERSATION SUMMARY: {}", summary)),
            Err(e) => {
                warn!(error = %e, messages = messages.len(), "block summarization failed");
                ChatMessage::system(format!(
                    "Previous conversation omitted to save space. Contains {} messages.",
                    messages.len()
                ))
            }
        }
    }

    async fn request_block_summary(
        client: &dyn CompletionClient,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<String> {
        let conversation = messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Below is a segment of conversation.\n\
             Please summarize the key points in a concise way that preserves all important information.\n\
             Focus on facts, preferences, and context that would be important for continuing the conversation.\n\n\
             CONVERSATION:\n{}\n\nSUMMARY:",
            conversation
        );

        let request = CompletionRequest::new(
            model,
            vec![ChatMessage::system(BLOCK_INSTRUCTION), ChatMessage::user(prompt)],
            SUMMARY_MAX_TOKENS,
        );

        let response = client.complete(request).await?;
        response
            .first_content()
            .map(str::to_string)
            .ok_or(MotomiError::EmptyCompletion)
    }

    /// Summary built without a model: message counts plus the most frequent words
    pub fn fallback_summary(messages: &[ChatMessage]) -> ChatMessage {
        let user_messages = messages.iter().filter(|m| m.role == ROLE_USER).count();
        let assistant_messages = messages
            .iter()
            .filter(|m| m.role == crate::context::ROLE_ASSISTANT)
            .count();

        let topics = Self::top_topics(messages);

        ChatMessage::system(format!(
            "SUMMARIZED CONTEXT: {} user messages and {} assistant messages about {}",
            user_messages,
            assistant_messages,
            topics.join(", ")
        ))
    }

    fn top_topics(messages: &[ChatMessage]) -> Vec<String> {
        let Some(word_pattern) = topic_word_pattern() else {
            return Vec::new();
        };

        let mut counts: HashMap<String, usize> = HashMap::new();
        // First-seen order breaks frequency ties
        let mut order: Vec<String> = Vec::new();

        for message in messages {
            let lower = message.content.to_lowercase();
            for word in word_pattern.find_iter(&lower).map(|m| m.as_str()) {
                let count = counts.entry(word.to_string()).or_insert(0);
                if *count == 0 {
                    order.push(word.to_string());
                }
                *count += 1;
            }
        }

        let mut ranked: Vec<(usize, String)> = order
            .into_iter()
            .map(|word| (counts[&word], word))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        ranked.into_iter().take(TOPIC_COUNT).map(|(_, word)| word).collect()
    }
}

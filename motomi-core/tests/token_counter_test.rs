/// Tests for token estimation

#[cfg(test)]
mod tests {
    use motomi_core::context::token_counter::{
        count_message, count_messages, count_text, token_limit, TokenCounter, DEFAULT_TOKEN_LIMIT,
        MESSAGE_OVERHEAD, REPLY_PRIMING,
    };
    use motomi_core::context::ChatMessage;

    #[test]
    fn test_empty_text_is_zero() {
        assert_eq!(count_text("", "gpt-4"), 0);
        assert_eq!(count_text("", "some-unknown-model"), 0);
    }

    #[test]
    fn test_known_tokenization() {
        assert_eq!(count_text("hello world", "gpt-3.5-turbo"), 2);
    }

    #[test]
    fn test_unknown_model_falls_back_to_default_encoding() {
        let text = "Fallback encodings should never fail on ordinary text.";
        assert!(count_text(text, "DeepSeek-R1") > 0);
        assert_eq!(count_text(text, "DeepSeek-R1"), count_text(text, "gpt-4"));
    }

    #[test]
    fn test_count_is_deterministic() {
        let counter = TokenCounter::new("gpt-4o");
        let text = "Deterministic estimates matter for budgeting.";
        assert_eq!(counter.count_text(text), counter.count_text(text));
    }

    #[test]
    fn test_message_overhead_is_role_independent() {
        let content = "Same content, different roles";
        let base = count_text(content, "gpt-4");

        for message in [
            ChatMessage::system(content),
            ChatMessage::user(content),
            ChatMessage::assistant(content),
            ChatMessage::new("tool", content),
        ] {
            assert_eq!(count_message(&message, "gpt-4"), base + MESSAGE_OVERHEAD);
        }
    }

    #[test]
    fn test_count_messages_adds_reply_priming_once() {
        let messages = vec![
            ChatMessage::system("You are helpful."),
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello! How can I help?"),
        ];
        let per_message: usize = messages.iter().map(|m| count_message(m, "gpt-4")).sum();

        assert_eq!(count_messages(&messages, "gpt-4"), per_message + REPLY_PRIMING);
        assert_eq!(count_messages(&[], "gpt-4"), REPLY_PRIMING);
    }

    #[test]
    fn test_token_limits() {
        assert_eq!(token_limit("gpt-4"), 8192);
        assert_eq!(token_limit("gpt-4o"), 128000);
        assert_eq!(token_limit("gpt-3.5-turbo"), 16385);
        assert_eq!(token_limit("claude-3-haiku"), 200000);
        assert_eq!(token_limit("o3-mini"), 16384);
        assert_eq!(token_limit("not-a-model"), DEFAULT_TOKEN_LIMIT);
        // Lookup doesn't depend on call order
        assert_eq!(token_limit("gpt-4"), token_limit("gpt-4"));
    }

    #[test]
    fn test_truncate_text_keeps_prefix() {
        let counter = TokenCounter::new("gpt-4");
        let text = "one two three four five six seven eight nine ten";

        let prefix = counter.truncate_text(text, 3).unwrap();
        assert!(text.starts_with(&prefix));
        assert_eq!(counter.count_text(&prefix), 3);

        assert_eq!(counter.truncate_text(text, 1000).unwrap(), text);
    }
}

/// Tests for context fitting

mod common;

#[cfg(test)]
mod tests {
    use super::common::filler;
    use motomi_core::context::token_counter::TokenCounter;
    use motomi_core::context::window::{
        truncate_message, ContextFitter, TRUNCATION_MARKER, TRUNCATION_PLACEHOLDER,
    };
    use motomi_core::context::ChatMessage;

    const MODEL: &str = "gpt-4";

    fn history(system: &str, regular: usize, reps: usize) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(system)];
        for i in 0..regular {
            let content = format!("message {} {}", i, filler(reps));
            if i % 2 == 0 {
                messages.push(ChatMessage::user(content));
            } else {
                messages.push(ChatMessage::assistant(content));
            }
        }
        messages
    }

    fn counter() -> TokenCounter {
        TokenCounter::new(MODEL)
    }

    #[test]
    fn test_empty_input_returns_empty() {
        let fitter = ContextFitter::default();
        assert!(fitter.fit(&[], 100, MODEL).is_empty());
        assert!(fitter.fit(&[], 0, MODEL).is_empty());
    }

    #[test]
    fn test_under_ceiling_is_unchanged() {
        let messages = history("You are helpful.", 6, 1);
        let fitter = ContextFitter::default();

        let fitted = fitter.fit(&messages, 8000, MODEL);
        assert_eq!(fitted, messages);
    }

    #[test]
    fn test_fifty_messages_keep_system_and_last_four() {
        let messages = history("You are a careful migration architect.", 49, 10);
        assert_eq!(messages.len(), 50);

        let counter = counter();
        let mut fixed = vec![messages[0].clone()];
        fixed.extend_from_slice(&messages[46..]);
        // Too little room for an older message and too little to truncate one
        let ceiling = counter.count_messages(&fixed) + 50;
        assert!(counter.count_message(&messages[45]) > 50);

        let fitted = ContextFitter::default().fit(&messages, ceiling, MODEL);

        assert_eq!(fitted.len(), 5);
        assert_eq!(fitted[0], messages[0]);
        assert_eq!(&fitted[1..], &messages[46..]);
        assert!(counter.count_messages(&fitted) <= ceiling);
    }

    #[test]
    fn test_older_messages_fill_newest_first() {
        let messages = history("System.", 10, 5);
        let counter = counter();

        let mut fixed = vec![messages[0].clone()];
        fixed.extend_from_slice(&messages[7..]);
        let older_size = counter.count_message(&messages[6]);
        // Room for exactly two older messages and a sliver
        let ceiling = counter.count_messages(&fixed) + 2 * older_size + 10;

        let fitted = ContextFitter::default().fit(&messages, ceiling, MODEL);

        assert_eq!(fitted[0], messages[0]);
        assert_eq!(&fitted[1..3], &messages[5..7]);
        assert_eq!(&fitted[3..], &messages[7..]);
        assert!(counter.count_messages(&fitted) <= ceiling);
    }

    #[test]
    fn test_older_message_truncated_when_budget_allows() {
        let messages = history("System.", 6, 60);
        let counter = counter();

        let mut fixed = vec![messages[0].clone()];
        fixed.extend_from_slice(&messages[3..]);
        let ceiling = counter.count_messages(&fixed) + 200;
        assert!(counter.count_message(&messages[2]) > 200);

        let fitted = ContextFitter::default().fit(&messages, ceiling, MODEL);

        assert_eq!(fitted.len(), 6);
        assert_eq!(fitted[0], messages[0]);
        assert!(fitted[1].content.ends_with(TRUNCATION_MARKER));
        assert_eq!(fitted[1].role, messages[2].role);
        assert_eq!(&fitted[2..], &messages[3..]);
        assert!(counter.count_messages(&fitted) <= ceiling);
    }

    #[test]
    fn test_small_remaining_budget_skips_truncation() {
        let fitter = ContextFitter::new(4, 100);
        let messages = history("System.", 6, 60);
        let counter = counter();

        let mut fixed = vec![messages[0].clone()];
        fixed.extend_from_slice(&messages[3..]);
        let ceiling = counter.count_messages(&fixed) + 100;

        let fitted = fitter.fit(&messages, ceiling, MODEL);
        assert_eq!(fitted.len(), 5);
        assert!(!fitted.iter().any(|m| m.content.ends_with(TRUNCATION_MARKER)));
    }

    #[test]
    fn test_system_messages_keep_relative_order() {
        let messages = vec![
            ChatMessage::system("First system note."),
            ChatMessage::user(filler(40)),
            ChatMessage::system("Second system note."),
            ChatMessage::assistant(filler(40)),
            ChatMessage::user("short one"),
            ChatMessage::assistant("short two"),
            ChatMessage::user("short three"),
            ChatMessage::assistant("short four"),
        ];
        let counter = counter();
        let ceiling = counter.count_messages(&messages) - 1;

        let fitted = ContextFitter::default().fit(&messages, ceiling, MODEL);

        let systems: Vec<_> = fitted.iter().filter(|m| m.is_system()).cloned().collect();
        assert_eq!(systems, vec![messages[0].clone(), messages[2].clone()]);
        assert_eq!(&fitted[fitted.len() - 4..], &messages[4..]);
        assert!(counter.count_messages(&fitted) <= ceiling);
    }

    #[test]
    fn test_degraded_path_keeps_system_and_last_two() {
        let messages = history("Keep me.", 8, 100);
        let counter = counter();

        let mut minimal = vec![messages[0].clone()];
        minimal.extend_from_slice(&messages[7..]);
        let ceiling = counter.count_messages(&minimal) + 20;

        let fitted = ContextFitter::default().fit(&messages, ceiling, MODEL);

        assert_eq!(fitted.len(), 3);
        assert_eq!(fitted[0], messages[0]);
        assert_eq!(fitted[2], messages[8]);
        assert!(counter.count_messages(&fitted) <= ceiling);
    }

    #[test]
    fn test_degraded_path_truncates_contents_to_fit() {
        let messages = history("Keep me.", 8, 100);
        let counter = counter();
        let ceiling = 300;

        let fitted = ContextFitter::default().fit(&messages, ceiling, MODEL);

        assert!(!fitted.is_empty());
        assert!(fitted.len() <= 3);
        assert!(counter.count_messages(&fitted) <= ceiling);
        assert!(fitted.iter().any(|m| m.content.ends_with(TRUNCATION_MARKER)));
    }

    #[test]
    fn test_oversized_system_message_alone_is_truncated() {
        let messages = vec![ChatMessage::system(filler(200))];
        let counter = counter();

        let fitted = ContextFitter::default().fit(&messages, 150, MODEL);

        assert_eq!(fitted.len(), 1);
        assert!(fitted[0].is_system());
        assert!(fitted[0].content.ends_with(TRUNCATION_MARKER));
        assert!(counter.count_messages(&fitted) <= 150);
    }

    #[test]
    fn test_tiny_ceiling_yields_single_placeholder() {
        let messages = history("System prompt.", 6, 20);

        for ceiling in [0, 1, 5] {
            let fitted = ContextFitter::default().fit(&messages, ceiling, MODEL);
            assert_eq!(fitted.len(), 1);
            assert_eq!(fitted[0].content, TRUNCATION_PLACEHOLDER);
        }
    }

    #[test]
    fn test_fitting_is_idempotent() {
        let fitter = ContextFitter::default();
        let cases = vec![
            (history("System.", 6, 1), 8000),
            (history("You are a careful migration architect.", 49, 10), 1200),
            (history("System.", 6, 60), 900),
            (history("Keep me.", 8, 100), 300),
            (vec![ChatMessage::system(filler(200))], 150),
            (history("System prompt.", 6, 20), 3),
        ];

        for (messages, ceiling) in cases {
            let once = fitter.fit(&messages, ceiling, MODEL);
            let twice = fitter.fit(&once, ceiling, MODEL);
            assert_eq!(once, twice, "ceiling {}", ceiling);
        }
    }

    #[test]
    fn test_fitted_output_respects_ceiling() {
        let fitter = ContextFitter::default();
        let counter = counter();
        let messages = history("System prompt for the observer.", 20, 15);

        for ceiling in [20, 50, 120, 400, 1000, 2500] {
            let fitted = fitter.fit(&messages, ceiling, MODEL);
            let fits = counter.count_messages(&fitted) <= ceiling;
            let placeholder = fitted.len() == 1 && fitted[0].content == TRUNCATION_PLACEHOLDER;
            assert!(fits || placeholder, "ceiling {}", ceiling);
        }
    }

    #[test]
    fn test_truncate_message_placeholder_when_overhead_exceeds() {
        let counter = counter();
        let message = ChatMessage::user("anything at all");

        let truncated = truncate_message(&counter, &message, 3);
        assert_eq!(truncated.content, TRUNCATION_PLACEHOLDER);
        assert_eq!(truncated.role, "user");
    }

    #[test]
    fn test_truncate_message_leaves_fitting_content() {
        let counter = counter();
        let message = ChatMessage::assistant("short");

        assert_eq!(truncate_message(&counter, &message, 100), message);
    }
}

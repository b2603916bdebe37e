#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use chat_types::event::ChatEvent;
    use chat_types::message::{Message, MessagePatch, Sender};
    use chat_types::session::SessionSummary;

    use crate::state::UiState;

    fn summary(id: &str, minutes_ago: i64) -> SessionSummary {
        SessionSummary {
            id: id.to_string(),
            name: format!("Chat {id}"),
            last_updated_at: Utc::now() - Duration::minutes(minutes_ago),
            message_count: 1,
        }
    }

    fn activated(session_id: &str, messages: Vec<Message>) -> ChatEvent {
        ChatEvent::SessionActivated {
            session_id: session_id.to_string(),
            messages,
        }
    }

    // ─── UiState Tests ───────────────────────────────────────

    #[test]
    fn test_ui_state_initial() {
        let state = UiState::new();
        assert!(state.messages.is_empty());
        assert!(state.sessions.is_empty());
        assert!(state.active_session_id.is_none());
        assert!(!state.is_loading);
        assert!(state.error.is_none());
        assert!(state.config_error.is_none());
        assert!(state.input_text.is_empty());
        assert!(state.show_sidebar);
        assert!(!state.show_settings);
    }

    #[test]
    fn test_session_activated_replaces_transcript() {
        let mut state = UiState::new();
        state.messages.push(Message::greeting());

        state.process_events(vec![activated(
            "session-1",
            vec![Message::user("1-user", "hi"), Message::system("2-system", "x")],
        )]);

        assert_eq!(state.active_session_id.as_deref(), Some("session-1"));
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].sender, Sender::User);
    }

    #[test]
    fn test_append_only_applies_to_active_session() {
        let mut state = UiState::new();
        state.process_events(vec![activated("session-1", vec![])]);

        state.process_events(vec![
            ChatEvent::MessageAppended {
                session_id: "session-1".to_string(),
                message: Message::user("1-user", "visible"),
            },
            ChatEvent::MessageAppended {
                session_id: "session-2".to_string(),
                message: Message::user("2-user", "hidden"),
            },
        ]);

        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].text, "visible");
    }

    #[test]
    fn test_patch_updates_matching_message() {
        let mut state = UiState::new();
        state.process_events(vec![activated(
            "session-1",
            vec![Message::ai_thinking("1-ai-text")],
        )]);

        state.process_events(vec![ChatEvent::MessagePatched {
            session_id: "session-1".to_string(),
            message_id: "1-ai-text".to_string(),
            patch: MessagePatch {
                text: Some("Hello".to_string()),
                is_thinking_phase: Some(false),
                ..Default::default()
            },
        }]);

        assert_eq!(state.messages[0].text, "Hello");
        assert!(!state.messages[0].is_thinking_phase);
    }

    #[test]
    fn test_patch_for_other_session_is_ignored() {
        let mut state = UiState::new();
        state.process_events(vec![activated(
            "session-1",
            vec![Message::ai_thinking("1-ai-text")],
        )]);

        state.process_events(vec![ChatEvent::MessagePatched {
            session_id: "session-2".to_string(),
            message_id: "1-ai-text".to_string(),
            patch: MessagePatch {
                text: Some("late arrival".to_string()),
                ..Default::default()
            },
        }]);

        assert!(state.messages[0].text.is_empty());
        assert!(state.messages[0].is_thinking_phase);
    }

    #[test]
    fn test_patch_for_unknown_message_is_ignored() {
        let mut state = UiState::new();
        state.process_events(vec![activated("session-1", vec![Message::greeting()])]);

        state.process_events(vec![ChatEvent::MessagePatched {
            session_id: "session-1".to_string(),
            message_id: "no-such-id".to_string(),
            patch: MessagePatch {
                text: Some("x".to_string()),
                ..Default::default()
            },
        }]);

        assert_eq!(state.messages.len(), 1);
        assert_ne!(state.messages[0].text, "x");
    }

    #[test]
    fn test_loading_and_error_transitions() {
        let mut state = UiState::new();

        state.process_events(vec![
            ChatEvent::LoadingChanged { is_loading: true },
            ChatEvent::Error {
                message: "boom".to_string(),
            },
        ]);
        assert!(state.is_loading);
        assert_eq!(state.error.as_deref(), Some("boom"));

        state.process_events(vec![
            ChatEvent::ErrorCleared,
            ChatEvent::LoadingChanged { is_loading: false },
        ]);
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_config_error_set_and_cleared() {
        let mut state = UiState::new();

        state.process_events(vec![ChatEvent::ConfigError {
            message: "no key".to_string(),
        }]);
        assert_eq!(state.config_error.as_deref(), Some("no key"));
        assert!(!state.can_send());

        state.process_events(vec![ChatEvent::ConfigErrorCleared]);
        assert!(state.config_error.is_none());
    }

    #[test]
    fn test_sorted_sessions_most_recent_first() {
        let mut state = UiState::new();
        state.process_events(vec![ChatEvent::SessionsChanged {
            sessions: vec![summary("a", 30), summary("b", 1), summary("c", 10)],
        }]);

        let order: Vec<&str> = state
            .sorted_sessions()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_can_send_gating() {
        let mut state = UiState::new();
        assert!(!state.can_send());

        state.input_text = "hello".to_string();
        assert!(state.can_send());

        state.is_loading = true;
        assert!(!state.can_send());

        state.is_loading = false;
        state.input_text = "   ".to_string();
        assert!(!state.can_send());
    }
}

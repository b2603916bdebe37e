#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::error::*;
    use crate::message::*;
    use crate::session::*;

    // ─── Message Tests ───────────────────────────────────────

    #[test]
    fn test_message_user() {
        let msg = Message::user("1-user", "Hello");
        assert_eq!(msg.sender, Sender::User);
        assert_eq!(msg.text, "Hello");
        assert!(msg.image_url.is_none());
        assert!(!msg.is_thinking_phase);
        assert!(!msg.is_generating_image);
    }

    #[test]
    fn test_message_system() {
        let msg = Message::system("1-system-error", "something failed");
        assert_eq!(msg.sender, Sender::System);
        assert_eq!(msg.text, "something failed");
    }

    #[test]
    fn test_message_ai_thinking() {
        let msg = Message::ai_thinking("1-ai-text");
        assert_eq!(msg.sender, Sender::Ai);
        assert!(msg.text.is_empty());
        assert!(msg.is_thinking_phase);
    }

    #[test]
    fn test_message_image_placeholder() {
        let msg = Message::image_placeholder("1-ai-image", "a red fox");
        assert_eq!(msg.sender, Sender::Ai);
        assert!(msg.is_generating_image);
        assert_eq!(msg.image_prompt.as_deref(), Some("a red fox"));
        assert!(msg.text.contains("a red fox"));
    }

    #[test]
    fn test_greeting_mentions_image_command() {
        let msg = Message::greeting();
        assert_eq!(msg.sender, Sender::Ai);
        assert!(msg.text.contains("/image"));
    }

    #[test]
    fn test_message_serialization_roundtrip() {
        let msg = Message::user("42-user", "test input");
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, msg);
    }

    #[test]
    fn test_message_serialization_skips_absent_flags() {
        let msg = Message::user("42-user", "hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("is_generating_image"));
        assert!(!json.contains("image_url"));
    }

    #[test]
    fn test_sender_serialization() {
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Sender::Ai).unwrap(), r#""ai""#);
        assert_eq!(serde_json::to_string(&Sender::System).unwrap(), r#""system""#);
    }

    // ─── MessagePatch Tests ──────────────────────────────────

    #[test]
    fn test_patch_empty_is_noop() {
        let mut msg = Message::user("1-user", "original");
        let before = msg.clone();
        MessagePatch::default().apply(&mut msg);
        assert_eq!(msg, before);
    }

    #[test]
    fn test_patch_text_and_flags() {
        let mut msg = Message::ai_thinking("1-ai-text");
        let patch = MessagePatch {
            text: Some("Hello".to_string()),
            is_thinking_phase: Some(false),
            ..Default::default()
        };
        patch.apply(&mut msg);
        assert_eq!(msg.text, "Hello");
        assert!(!msg.is_thinking_phase);
        assert_eq!(msg.sender, Sender::Ai);
    }

    #[test]
    fn test_patch_converts_to_system_error() {
        let mut msg = Message::ai_thinking("1-ai-text");
        let patch = MessagePatch {
            text: Some("AI Error: rate limited".to_string()),
            sender: Some(Sender::System),
            is_thinking_phase: Some(false),
            ..Default::default()
        };
        patch.apply(&mut msg);
        assert_eq!(msg.sender, Sender::System);
        assert!(msg.text.starts_with("AI Error:"));
    }

    #[test]
    fn test_patch_image_completion() {
        let mut msg = Message::image_placeholder("1-ai-image", "sunset");
        let patch = MessagePatch {
            text: Some(String::new()),
            image_url: Some("data:image/png;base64,AAAA".to_string()),
            is_generating_image: Some(false),
            ..Default::default()
        };
        patch.apply(&mut msg);
        assert!(msg.text.is_empty());
        assert!(!msg.is_generating_image);
        assert!(msg.image_url.is_some());
        assert_eq!(msg.image_prompt.as_deref(), Some("sunset"));
    }

    // ─── Session Tests ───────────────────────────────────────

    #[test]
    fn test_new_session_is_seeded_with_greeting() {
        let session = ChatSessionRecord::new("session-1");
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].sender, Sender::Ai);
        assert!(session.name.starts_with(DEFAULT_NAME_PREFIX));
        assert_eq!(session.created_at, session.last_updated_at);
    }

    #[test]
    fn test_session_auto_rename_from_user_message() {
        let mut session = ChatSessionRecord::new("session-1");
        let msg = Message::user("1-user", "explain lifetimes in rust please");
        session.maybe_auto_rename(&msg);
        assert_eq!(session.name, "explain lifetimes in rust please");
    }

    #[test]
    fn test_session_auto_rename_only_once() {
        let mut session = ChatSessionRecord::new("session-1");
        session.maybe_auto_rename(&Message::user("1-user", "first meaningful question"));
        let renamed = session.name.clone();
        session.maybe_auto_rename(&Message::user("2-user", "second different question"));
        assert_eq!(session.name, renamed);
    }

    #[test]
    fn test_session_auto_rename_ignores_ai_messages() {
        let mut session = ChatSessionRecord::new("session-1");
        let default_name = session.name.clone();
        session.maybe_auto_rename(&Message::system("1-system-error", "an error notice here"));
        assert_eq!(session.name, default_name);
    }

    #[test]
    fn test_session_auto_rename_skips_short_text() {
        let mut session = ChatSessionRecord::new("session-1");
        let default_name = session.name.clone();
        session.maybe_auto_rename(&Message::user("1-user", "ok"));
        assert_eq!(session.name, default_name);
    }

    #[test]
    fn test_session_serialization_roundtrip_is_lossless() {
        let mut session = ChatSessionRecord::new("session-1");
        session.messages.push(Message::user("1-user", "hello"));
        session.messages.push(Message::image_placeholder("2-ai-image", "a cat"));
        session.touch();

        let json = serde_json::to_string(&session).unwrap();
        let restored: ChatSessionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);

        // Idempotent: a second cycle produces identical bytes
        let json2 = serde_json::to_string(&restored).unwrap();
        assert_eq!(json, json2);
    }

    #[test]
    fn test_session_timestamps_serialize_as_iso8601() {
        let session = ChatSessionRecord::new("session-1");
        let json = serde_json::to_value(&session).unwrap();
        let created = json["created_at"].as_str().unwrap();
        assert!(created.contains('T'), "expected ISO-8601, got {created}");
    }

    #[test]
    fn test_session_summary() {
        let mut session = ChatSessionRecord::new("session-1");
        session.messages.push(Message::user("1-user", "hi"));
        let summary = session.summary();
        assert_eq!(summary.id, "session-1");
        assert_eq!(summary.message_count, 2);
        assert_eq!(summary.last_updated_at, session.last_updated_at);
    }

    // ─── Config Tests ────────────────────────────────────────

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.gateway.api_key.is_empty());
        assert_eq!(config.gateway.model, "gemini-2.0-flash");
        assert!(config.gateway.api_base.is_none());
        assert_eq!(config.gateway.base_url(), DEFAULT_API_BASE);
        assert_eq!(config.storage.backend, StorageBackendType::Auto);
    }

    #[test]
    fn test_config_custom_base_url() {
        let mut config = GatewayConfig::default();
        config.api_base = Some("https://proxy.example".to_string());
        assert_eq!(config.base_url(), "https://proxy.example");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    // ─── Error Tests ─────────────────────────────────────────

    #[test]
    fn test_error_display() {
        let err = ChatError::Gateway("rate limit".to_string());
        assert_eq!(err.to_string(), "Gateway error: rate limit");

        let err = ChatError::Config("API key missing".to_string());
        assert_eq!(err.to_string(), "Configuration error: API key missing");

        let err = ChatError::Storage("idb closed".to_string());
        assert_eq!(err.to_string(), "Storage error: idb closed");
    }

    #[test]
    fn test_config_error_is_distinguishable() {
        let err = ChatError::Config("API key missing".to_string());
        assert!(matches!(err, ChatError::Config(_)));
        let err = ChatError::Gateway("HTTP 500".to_string());
        assert!(!matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{{bad}}").unwrap_err();
        let err: ChatError = serde_err.into();
        assert!(matches!(err, ChatError::Serialization(_)));
    }
}

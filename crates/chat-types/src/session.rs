use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{Message, Sender};

/// Prefix of auto-generated session names. A session still carrying it is
/// renamed once, from the first user message saved into it.
pub const DEFAULT_NAME_PREFIX: &str = "Chat - ";

/// One persisted conversation thread.
///
/// Timestamps serialize as RFC 3339 strings and round-trip exactly, so a
/// save/load cycle never alters a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSessionRecord {
    pub id: String,
    pub name: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl ChatSessionRecord {
    /// Build a fresh session seeded with the synthetic greeting.
    /// `messages` is never empty after creation.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: format!("{}{}", DEFAULT_NAME_PREFIX, Local::now().format("%H:%M %d/%m/%Y")),
            messages: vec![Message::greeting()],
            created_at: now,
            last_updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }

    /// Rewrite the default timestamp name from a user message's leading
    /// words. Applies at most once per session: once renamed, the default
    /// prefix is gone and later user messages leave the name alone.
    pub fn maybe_auto_rename(&mut self, message: &Message) {
        if message.sender != Sender::User || !self.name.starts_with(DEFAULT_NAME_PREFIX) {
            return;
        }
        if let Some(name) = derive_name(&message.text) {
            self.name = name;
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            last_updated_at: self.last_updated_at,
            message_count: self.messages.len(),
        }
    }
}

/// Sidebar projection of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub name: String,
    pub last_updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// First five words of the text, truncated to 30 chars (27 + ellipsis).
/// Returns `None` for texts too short to make a meaningful name.
fn derive_name(text: &str) -> Option<String> {
    let leading = text.split(' ').take(5).collect::<Vec<_>>().join(" ");
    if leading.chars().count() <= 3 {
        return None;
    }
    if leading.chars().count() > 30 {
        let truncated: String = leading.chars().take(27).collect();
        Some(format!("{truncated}..."))
    } else {
        Some(leading)
    }
}

#[cfg(test)]
mod name_tests {
    use super::derive_name;

    #[test]
    fn short_text_yields_no_name() {
        assert_eq!(derive_name("ok"), None);
        assert_eq!(derive_name("a b"), None);
    }

    #[test]
    fn takes_first_five_words() {
        assert_eq!(
            derive_name("one two three four five six seven"),
            Some("one two three four five".to_string())
        );
    }

    #[test]
    fn truncates_long_names() {
        let name = derive_name("supercalifragilistic expialidocious atrocious").unwrap();
        assert_eq!(name.chars().count(), 30);
        assert!(name.ends_with("..."));
    }
}

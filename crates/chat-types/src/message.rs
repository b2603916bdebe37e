use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
    /// System-originated notices, mostly error messages in the transcript
    System,
}

/// A single message in a conversation.
///
/// Immutable once finalized, except for the fields a streaming turn mutates
/// in place: `text`, `is_thinking_phase`, and `is_generating_image`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique within its session: millisecond clock + role suffix
    pub id: String,
    /// Chat text, image status text, or an error notice
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// URL of a generated image, once available
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_url: Option<String>,
    /// The prompt the image was generated from
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_prompt: Option<String>,
    /// True while this message is a placeholder for a pending image
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub is_generating_image: bool,
    /// True while the AI has produced no content yet for this turn
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub is_thinking_phase: bool,
}

/// Greeting that seeds every new session, so the transcript is never empty.
pub const GREETING_TEXT: &str =
    "Hi! I'm your AI assistant. Ask me anything, or type `/image <prompt>` to generate a picture.";

const GREETING_ID: &str = "initial-ai-greeting";

impl Message {
    fn base(id: impl Into<String>, text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            image_url: None,
            image_prompt: None,
            is_generating_image: false,
            is_thinking_phase: false,
        }
    }

    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::base(id, text, Sender::User)
    }

    pub fn system(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::base(id, text, Sender::System)
    }

    /// Empty AI placeholder shown while the first chunk is pending
    pub fn ai_thinking(id: impl Into<String>) -> Self {
        let mut msg = Self::base(id, "", Sender::Ai);
        msg.is_thinking_phase = true;
        msg
    }

    /// AI placeholder for a pending image generation
    pub fn image_placeholder(id: impl Into<String>, prompt: &str) -> Self {
        let mut msg = Self::base(id, format!("Generating image for: \"{prompt}\""), Sender::Ai);
        msg.is_generating_image = true;
        msg.image_prompt = Some(prompt.to_string());
        msg
    }

    /// The synthetic greeting seeding a fresh session
    pub fn greeting() -> Self {
        Self::base(GREETING_ID, GREETING_TEXT, Sender::Ai)
    }
}

/// Partial message update — `None` fields are left untouched.
///
/// Every post-creation mutation travels in this shape, both to the session
/// store and to the UI event stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePatch {
    pub text: Option<String>,
    pub sender: Option<Sender>,
    pub image_url: Option<String>,
    pub image_prompt: Option<String>,
    pub is_generating_image: Option<bool>,
    pub is_thinking_phase: Option<bool>,
}

impl MessagePatch {
    /// Merge this patch into an existing message
    pub fn apply(&self, message: &mut Message) {
        if let Some(text) = &self.text {
            message.text = text.clone();
        }
        if let Some(sender) = self.sender {
            message.sender = sender;
        }
        if let Some(url) = &self.image_url {
            message.image_url = Some(url.clone());
        }
        if let Some(prompt) = &self.image_prompt {
            message.image_prompt = Some(prompt.clone());
        }
        if let Some(flag) = self.is_generating_image {
            message.is_generating_image = flag;
        }
        if let Some(flag) = self.is_thinking_phase {
            message.is_thinking_phase = flag;
        }
    }
}

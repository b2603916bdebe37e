//! Port traits — the hexagonal architecture boundary.
//!
//! These traits are defined here in `chat-core` (pure Rust).
//! Implementations live in `chat-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use async_trait::async_trait;
use chat_types::{message::Message, session::ChatSessionRecord, Result};

// ─── AI Gateway Port ─────────────────────────────────────────

/// Opaque handle to an open turn-taking dialogue with the AI service.
/// The gateway keeps the seeded history behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u64);

/// One increment of a streamed AI response.
/// Exactly one final chunk (or one error chunk) terminates a turn; a chunk
/// may carry text and the final marker simultaneously.
#[derive(Debug, Clone, Default)]
pub struct StreamChunk {
    pub text: Option<String>,
    pub error: Option<String>,
    pub is_final_chunk: bool,
}

/// Outcome of a one-shot image generation call
#[derive(Debug, Clone, Default)]
pub struct ImageOutcome {
    pub image_url: Option<String>,
    pub prompt: Option<String>,
    pub error: Option<String>,
}

#[async_trait(?Send)]
pub trait AiGatewayPort {
    /// Open a conversational context, optionally seeded with prior turns so
    /// the AI's context matches what the user sees.
    ///
    /// Fails with [`chat_types::ChatError::Config`] when credentials are
    /// absent or invalid; that variant is what the controller treats as
    /// fatal-until-reconfigured.
    fn open_context(&self, prior_messages: &[Message]) -> Result<ContextHandle>;

    /// Release the history behind a handle. Contexts live for the page
    /// session otherwise, so the controller closes the one it abandons
    /// whenever it opens a replacement. Closing an unknown handle is a
    /// no-op.
    fn close_context(&self, context: ContextHandle);

    /// Stream one turn, invoking `on_chunk` per increment.
    ///
    /// The returned future may itself fail independently of any chunk-level
    /// error (e.g. the transport drops mid-stream).
    async fn stream_turn(
        &self,
        context: ContextHandle,
        user_text: &str,
        on_chunk: &mut (dyn FnMut(StreamChunk) + '_),
    ) -> Result<()>;

    /// Generate an image from a text prompt
    async fn generate_image(&self, prompt: &str) -> Result<ImageOutcome>;
}

// ─── Session Store Port ──────────────────────────────────────

/// Persistence for the session collection and the active-session pointer.
/// Pure serialization, no business logic. Implementations tolerate absence
/// (first run) and malformed stored data by returning an empty/absent
/// result, never an error the controller has to special-case.
#[async_trait(?Send)]
pub trait SessionStorePort {
    async fn load_sessions(&self) -> Result<Vec<ChatSessionRecord>>;

    async fn save_sessions(&self, sessions: &[ChatSessionRecord]) -> Result<()>;

    async fn load_active_session_id(&self) -> Result<Option<String>>;

    async fn save_active_session_id(&self, id: &str) -> Result<()>;
}

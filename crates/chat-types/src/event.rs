use serde::{Deserialize, Serialize};

use crate::message::{Message, MessagePatch};
use crate::session::SessionSummary;

/// Events emitted by the session controller.
/// The UI drains these once per frame and reduces them into its view state.
///
/// Message events carry the owning session id: a slow turn finishing after
/// the user switched sessions still patches the session it belongs to, and
/// the view simply ignores events for sessions it is not showing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChatEvent {
    /// A session became the displayed one; `messages` is the full transcript
    SessionActivated {
        session_id: String,
        messages: Vec<Message>,
    },

    /// The session collection changed (created/deleted/renamed/touched)
    SessionsChanged { sessions: Vec<SessionSummary> },

    /// A message was appended to a session
    MessageAppended { session_id: String, message: Message },

    /// An existing message was mutated in place
    MessagePatched {
        session_id: String,
        message_id: String,
        patch: MessagePatch,
    },

    /// A send started or finished
    LoadingChanged { is_loading: bool },

    /// A recoverable failure, shown as a dismissable banner
    Error { message: String },

    /// Clear the banner (a new send started)
    ErrorCleared,

    /// The gateway is unusable — blocks the whole UI until reconfigured
    ConfigError { message: String },

    /// Configuration was repaired
    ConfigErrorCleared,
}

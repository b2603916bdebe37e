//! UI-level state that drives rendering.
//! A read-only projection of the session controller's state, updated
//! each frame by draining the EventBus.

use chat_types::event::ChatEvent;
use chat_types::message::Message;
use chat_types::session::SessionSummary;

/// State visible to UI panels
pub struct UiState {
    /// Transcript of the displayed session
    pub messages: Vec<Message>,
    /// Sidebar entries, in controller order (render sorts by recency)
    pub sessions: Vec<SessionSummary>,
    /// Id of the displayed session
    pub active_session_id: Option<String>,
    /// A send is in flight
    pub is_loading: bool,
    /// Dismissable error banner
    pub error: Option<String>,
    /// Blocking configuration error
    pub config_error: Option<String>,
    /// Input field content
    pub input_text: String,
    /// Whether the session sidebar is expanded
    pub show_sidebar: bool,
    /// Whether the settings panel is open
    pub show_settings: bool,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            sessions: Vec::new(),
            active_session_id: None,
            is_loading: false,
            error: None,
            config_error: None,
            input_text: String::new(),
            show_sidebar: true,
            show_settings: false,
        }
    }

    /// Process events from the EventBus and update UI state.
    ///
    /// Message events for sessions other than the displayed one are
    /// ignored here; the controller already applied them to its records,
    /// and switching back replays the full transcript via
    /// [`ChatEvent::SessionActivated`].
    pub fn process_events(&mut self, events: Vec<ChatEvent>) {
        for event in events {
            match event {
                ChatEvent::SessionActivated {
                    session_id,
                    messages,
                } => {
                    self.active_session_id = Some(session_id);
                    self.messages = messages;
                }
                ChatEvent::SessionsChanged { sessions } => {
                    self.sessions = sessions;
                }
                ChatEvent::MessageAppended {
                    session_id,
                    message,
                } => {
                    if self.active_session_id.as_deref() == Some(session_id.as_str()) {
                        self.messages.push(message);
                    }
                }
                ChatEvent::MessagePatched {
                    session_id,
                    message_id,
                    patch,
                } => {
                    if self.active_session_id.as_deref() != Some(session_id.as_str()) {
                        continue;
                    }
                    match self.messages.iter_mut().find(|m| m.id == message_id) {
                        Some(message) => patch.apply(message),
                        None => log::debug!("patch for unknown message {message_id} ignored"),
                    }
                }
                ChatEvent::LoadingChanged { is_loading } => {
                    self.is_loading = is_loading;
                }
                ChatEvent::Error { message } => {
                    self.error = Some(message);
                }
                ChatEvent::ErrorCleared => {
                    self.error = None;
                }
                ChatEvent::ConfigError { message } => {
                    self.config_error = Some(message);
                }
                ChatEvent::ConfigErrorCleared => {
                    self.config_error = None;
                }
            }
        }
    }

    /// Sidebar entries, most recently updated first
    pub fn sorted_sessions(&self) -> Vec<&SessionSummary> {
        let mut sessions: Vec<&SessionSummary> = self.sessions.iter().collect();
        sessions.sort_by(|a, b| b.last_updated_at.cmp(&a.last_updated_at));
        sessions
    }

    /// The input can submit: something to send, nothing in flight, and
    /// the gateway is usable
    pub fn can_send(&self) -> bool {
        !self.input_text.trim().is_empty() && !self.is_loading && self.config_error.is_none()
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

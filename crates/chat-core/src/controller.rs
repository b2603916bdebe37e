//! Session controller — the core state machine of the chat client.
//!
//! Owns the session collection, the active-session pointer, and the open
//! conversational context. Mediates between UI intents, the AI gateway, and
//! the session store. Every persisted mutation funnels through
//! [`SessionController::append_message`] or
//! [`SessionController::update_message_in_session`], so the stored
//! representation never diverges from what the user sees for more than one
//! event.
//!
//! All methods take `&self`: the controller is shared behind an `Rc` and
//! stays callable while a streamed turn is suspended on the network, so a
//! session switch can land mid-turn. State lives in `Cell`/`RefCell`
//! fields and no internal borrow is held across an await; the `is_loading`
//! flag is the only admission control on sends.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use chrono::Utc;
use uuid::Uuid;

use chat_types::{
    event::ChatEvent,
    message::{Message, MessagePatch, Sender},
    session::ChatSessionRecord,
    ChatError, Result,
};

use crate::event_bus::EventBus;
use crate::ports::{AiGatewayPort, ContextHandle, SessionStorePort};

/// Literal command prefix routing a message to image generation.
/// Matched case-insensitively, trailing space included.
const IMAGE_COMMAND: &str = "/image ";

pub struct SessionController {
    gateway: RefCell<Rc<dyn AiGatewayPort>>,
    store: Rc<dyn SessionStorePort>,
    event_bus: EventBus,
    context: Cell<Option<ContextHandle>>,
    sessions: RefCell<Vec<ChatSessionRecord>>,
    active_session_id: RefCell<Option<String>>,
    current_ai_message_id: RefCell<Option<String>>,
    is_loading: Cell<bool>,
    config_error: RefCell<Option<String>>,
    last_millis: Cell<i64>,
}

impl SessionController {
    pub fn new(
        gateway: Rc<dyn AiGatewayPort>,
        store: Rc<dyn SessionStorePort>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            gateway: RefCell::new(gateway),
            store,
            event_bus,
            context: Cell::new(None),
            sessions: RefCell::new(Vec::new()),
            active_session_id: RefCell::new(None),
            current_ai_message_id: RefCell::new(None),
            is_loading: Cell::new(false),
            config_error: RefCell::new(None),
            last_millis: Cell::new(0),
        }
    }

    // ─── Accessors ───────────────────────────────────────────

    pub fn sessions(&self) -> Ref<'_, Vec<ChatSessionRecord>> {
        self.sessions.borrow()
    }

    pub fn active_session_id(&self) -> Option<String> {
        self.active_session_id.borrow().clone()
    }

    pub fn active_messages(&self) -> Option<Ref<'_, [Message]>> {
        let id = self.active_session_id.borrow().clone()?;
        Ref::filter_map(self.sessions.borrow(), |sessions| {
            sessions
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.messages.as_slice())
        })
        .ok()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.get()
    }

    pub fn config_error(&self) -> Option<String> {
        self.config_error.borrow().clone()
    }

    pub fn current_ai_message_id(&self) -> Option<String> {
        self.current_ai_message_id.borrow().clone()
    }

    // ─── Lifecycle ───────────────────────────────────────────

    /// Probe the gateway, load persisted state, and activate a session.
    ///
    /// A configuration failure halts initialization: the config error is
    /// recorded and emitted, and the UI stays on the blocking notice until
    /// the gateway is replaced.
    pub async fn initialize(&self) -> Result<()> {
        let gateway = self.gateway.borrow().clone();
        match gateway.open_context(&[]) {
            // The probe only validates configuration
            Ok(probe) => gateway.close_context(probe),
            Err(e) => {
                self.report_gateway_failure(&e);
                return Err(e);
            }
        }
        if self.config_error.borrow_mut().take().is_some() {
            self.event_bus.emit(ChatEvent::ConfigErrorCleared);
        }

        let loaded = match self.store.load_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                log::warn!("could not load persisted sessions, starting empty: {e}");
                Vec::new()
            }
        };
        *self.sessions.borrow_mut() = loaded;
        self.emit_sessions_changed();

        let active = match self.store.load_active_session_id().await {
            Ok(id) => id,
            Err(e) => {
                log::warn!("could not load active session id: {e}");
                None
            }
        };

        let known = active
            .as_deref()
            .is_some_and(|id| self.sessions.borrow().iter().any(|s| s.id == id));
        match active {
            Some(id) if known => self.load_session(&id).await,
            _ => self.start_new_session().await,
        }
    }

    /// Swap the gateway adapter (after a settings change) and clear any
    /// configuration error. The caller re-runs [`Self::initialize`].
    pub fn replace_gateway(&self, gateway: Rc<dyn AiGatewayPort>) {
        self.close_context();
        *self.gateway.borrow_mut() = gateway;
        if self.config_error.borrow_mut().take().is_some() {
            self.event_bus.emit(ChatEvent::ConfigErrorCleared);
        }
    }

    /// Create a fresh session seeded with the greeting, open an unseeded
    /// context, persist, and mark it active.
    pub async fn start_new_session(&self) -> Result<()> {
        let session_id = format!("session-{}", Uuid::new_v4());
        let record = ChatSessionRecord::new(session_id.as_str());

        let gateway = self.gateway.borrow().clone();
        let context = match gateway.open_context(&[]) {
            Ok(ctx) => ctx,
            Err(e) => {
                self.report_gateway_failure(&e);
                return Err(e);
            }
        };

        self.close_context();
        self.context.set(Some(context));
        *self.active_session_id.borrow_mut() = Some(session_id.clone());
        let messages = record.messages.clone();
        self.sessions.borrow_mut().push(record);
        self.persist_collection().await;
        self.persist_active_id(&session_id).await;

        self.event_bus.emit(ChatEvent::SessionActivated {
            session_id,
            messages,
        });
        Ok(())
    }

    /// Activate a stored session, re-opening the conversational context
    /// seeded with its messages so the AI's view matches the transcript.
    /// An unknown id falls back to a new session — recovery, not a no-op.
    pub async fn load_session(&self, session_id: &str) -> Result<()> {
        let record = self
            .sessions
            .borrow()
            .iter()
            .find(|s| s.id == session_id)
            .cloned();
        let Some(record) = record else {
            log::warn!("session {session_id} not found, starting a new chat instead");
            return self.start_new_session().await;
        };

        let gateway = self.gateway.borrow().clone();
        match gateway.open_context(&record.messages) {
            Ok(context) => {
                self.close_context();
                self.context.set(Some(context));
                *self.active_session_id.borrow_mut() = Some(record.id.clone());
                self.persist_active_id(&record.id).await;
                self.event_bus.emit(ChatEvent::SessionActivated {
                    session_id: record.id,
                    messages: record.messages,
                });
                Ok(())
            }
            Err(e) => {
                self.report_gateway_failure(&e);
                Err(e)
            }
        }
    }

    /// Remove a session. Deleting the active one promotes the most recently
    /// updated survivor, or starts fresh when none remain.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let removed = {
            let mut sessions = self.sessions.borrow_mut();
            let before = sessions.len();
            sessions.retain(|s| s.id != session_id);
            sessions.len() != before
        };
        if !removed {
            log::warn!("delete requested for unknown session {session_id}");
            return Ok(());
        }
        self.persist_collection().await;

        if self.active_session_id.borrow().as_deref() != Some(session_id) {
            return Ok(());
        }
        *self.active_session_id.borrow_mut() = None;
        self.close_context();

        let most_recent = self
            .sessions
            .borrow()
            .iter()
            .max_by_key(|s| s.last_updated_at)
            .map(|s| s.id.clone());
        match most_recent {
            Some(id) => self.load_session(&id).await,
            None => self.start_new_session().await,
        }
    }

    // ─── Sending ─────────────────────────────────────────────

    /// Send a message from the input box.
    ///
    /// A no-op (Ok, no events) when the text is blank, a send is already in
    /// flight, a configuration error is set, or no session is active. The
    /// in-flight guard is checked before the first await, so a second send
    /// arriving while a turn streams is rejected, never interleaved.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() || self.is_loading.get() || self.config_error.borrow().is_some()
        {
            return Ok(());
        }
        let Some(session_id) = self.active_session_id.borrow().clone() else {
            return Ok(());
        };

        self.set_loading(true);
        self.event_bus.emit(ChatEvent::ErrorCleared);

        let user_id = self.next_message_id("user");
        self.append_message(&session_id, Message::user(user_id, text))
            .await;

        match strip_image_command(text) {
            Some(prompt) => self.run_image_turn(&session_id, &prompt).await,
            None => self.run_chat_turn(&session_id, text).await,
        }
    }

    async fn run_image_turn(&self, session_id: &str, prompt: &str) -> Result<()> {
        if prompt.is_empty() {
            let text = "Image generation failed: no prompt given after the /image command";
            self.event_bus.emit(ChatEvent::Error {
                message: text.to_string(),
            });
            let id = self.next_message_id("system-error");
            self.append_message(session_id, Message::system(id, text)).await;
            self.set_loading(false);
            return Ok(());
        }

        let placeholder_id = self.next_message_id("ai-image");
        self.append_message(session_id, Message::image_placeholder(&placeholder_id, prompt))
            .await;

        let gateway = self.gateway.borrow().clone();
        let patch = match gateway.generate_image(prompt).await {
            Ok(outcome) => match outcome.image_url {
                Some(url) => MessagePatch {
                    text: Some(String::new()),
                    image_url: Some(url),
                    image_prompt: outcome.prompt,
                    is_generating_image: Some(false),
                    ..Default::default()
                },
                None => {
                    let reason = outcome
                        .error
                        .unwrap_or_else(|| "unknown cause".to_string());
                    self.image_failure_patch(&reason)
                }
            },
            Err(e) => self.image_failure_patch(&e.to_string()),
        };

        self.update_message_in_session(session_id, &placeholder_id, patch)
            .await;
        self.set_loading(false);
        Ok(())
    }

    fn image_failure_patch(&self, reason: &str) -> MessagePatch {
        let text = format!("Image generation failed: {reason}");
        self.event_bus.emit(ChatEvent::Error {
            message: text.clone(),
        });
        MessagePatch {
            text: Some(text),
            sender: Some(Sender::System),
            is_generating_image: Some(false),
            ..Default::default()
        }
    }

    async fn run_chat_turn(&self, session_id: &str, user_text: &str) -> Result<()> {
        let Some(context) = self.context.get() else {
            let text = "Chat context is not open; the message cannot be sent";
            self.event_bus.emit(ChatEvent::Error {
                message: text.to_string(),
            });
            let id = self.next_message_id("system-error");
            self.append_message(session_id, Message::system(id, text)).await;
            self.set_loading(false);
            return Ok(());
        };

        let ai_id = self.next_message_id("ai-text");
        *self.current_ai_message_id.borrow_mut() = Some(ai_id.clone());
        self.append_message(session_id, Message::ai_thinking(&ai_id))
            .await;

        // Chunk text accumulates here, local to this send; the stored
        // message always receives the full accumulator, never a delta.
        let mut accumulated = String::new();
        let mut terminal: Option<MessagePatch> = None;

        let gateway = self.gateway.borrow().clone();
        let result = gateway
            .stream_turn(context, user_text, &mut |chunk| {
                if let Some(reason) = chunk.error {
                    self.event_bus.emit(ChatEvent::Error {
                        message: format!("AI stream error: {reason}"),
                    });
                    let patch = MessagePatch {
                        text: Some(format!("AI Error: {reason}")),
                        sender: Some(Sender::System),
                        is_thinking_phase: Some(false),
                        ..Default::default()
                    };
                    self.apply_patch_in_memory(session_id, &ai_id, &patch);
                    terminal = Some(patch);
                    return;
                }
                if let Some(text) = chunk.text {
                    accumulated.push_str(&text);
                    let patch = MessagePatch {
                        text: Some(accumulated.clone()),
                        is_thinking_phase: Some(false),
                        ..Default::default()
                    };
                    self.apply_patch_in_memory(session_id, &ai_id, &patch);
                }
                if chunk.is_final_chunk {
                    terminal = Some(MessagePatch {
                        text: Some(accumulated.clone()),
                        is_thinking_phase: Some(false),
                        ..Default::default()
                    });
                }
            })
            .await;

        match result {
            Ok(()) => {
                // A well-behaved gateway always terminates with a final or
                // error chunk; tolerate one that just ends.
                let patch = terminal.unwrap_or_else(|| MessagePatch {
                    text: Some(accumulated.clone()),
                    is_thinking_phase: Some(false),
                    ..Default::default()
                });
                self.update_message_in_session(session_id, &ai_id, patch)
                    .await;
            }
            Err(e) => {
                let mut text = format!("Failed to send message: {e}.");
                if !accumulated.is_empty() {
                    text.push_str(&format!(" Partial response: {accumulated}"));
                }
                self.event_bus.emit(ChatEvent::Error {
                    message: text.clone(),
                });
                let patch = MessagePatch {
                    text: Some(text),
                    sender: Some(Sender::System),
                    is_thinking_phase: Some(false),
                    ..Default::default()
                };
                self.update_message_in_session(session_id, &ai_id, patch)
                    .await;
            }
        }

        *self.current_ai_message_id.borrow_mut() = None;
        self.set_loading(false);
        Ok(())
    }

    // ─── Mutation funnel ─────────────────────────────────────

    /// Append a message to a session, auto-rename on the first user message,
    /// and persist the whole collection.
    pub async fn append_message(&self, session_id: &str, message: Message) {
        {
            let mut sessions = self.sessions.borrow_mut();
            let Some(session) = sessions.iter_mut().find(|s| s.id == session_id) else {
                log::warn!("dropping message for unknown session {session_id}");
                return;
            };
            session.maybe_auto_rename(&message);
            session.messages.push(message.clone());
            session.touch();
        }
        self.event_bus.emit(ChatEvent::MessageAppended {
            session_id: session_id.to_string(),
            message,
        });
        self.persist_collection().await;
    }

    /// Merge a patch into an existing message and persist. The single funnel
    /// through which post-creation mutations reach the session store.
    ///
    /// The target session is addressed by id, never by "currently displayed":
    /// a slow turn finishing after a session switch patches the session it
    /// belongs to. Missing session or message drops the update.
    pub async fn update_message_in_session(
        &self,
        session_id: &str,
        message_id: &str,
        patch: MessagePatch,
    ) {
        {
            let mut sessions = self.sessions.borrow_mut();
            let Some(session) = sessions.iter_mut().find(|s| s.id == session_id) else {
                log::warn!("dropping update for unknown session {session_id}");
                return;
            };
            let Some(message) = session.messages.iter_mut().find(|m| m.id == message_id) else {
                log::warn!("dropping update for unknown message {message_id} in {session_id}");
                return;
            };
            patch.apply(message);
            session.touch();
        }
        self.event_bus.emit(ChatEvent::MessagePatched {
            session_id: session_id.to_string(),
            message_id: message_id.to_string(),
            patch,
        });
        self.persist_collection().await;
    }

    /// In-memory patch for streaming deltas: updates the record and the UI
    /// but defers persistence to the terminal patch of the turn.
    fn apply_patch_in_memory(&self, session_id: &str, message_id: &str, patch: &MessagePatch) {
        {
            let mut sessions = self.sessions.borrow_mut();
            let target = sessions
                .iter_mut()
                .find(|s| s.id == session_id)
                .and_then(|s| s.messages.iter_mut().find(|m| m.id == message_id));
            let Some(message) = target else {
                log::warn!("dropping streaming patch for missing message {message_id}");
                return;
            };
            patch.apply(message);
        }
        self.event_bus.emit(ChatEvent::MessagePatched {
            session_id: session_id.to_string(),
            message_id: message_id.to_string(),
            patch: patch.clone(),
        });
    }

    // ─── Internals ───────────────────────────────────────────

    /// Release the context this controller currently holds, if any
    fn close_context(&self) {
        if let Some(old) = self.context.take() {
            self.gateway.borrow().close_context(old);
        }
    }

    fn set_loading(&self, is_loading: bool) {
        self.is_loading.set(is_loading);
        self.event_bus.emit(ChatEvent::LoadingChanged { is_loading });
    }

    fn report_gateway_failure(&self, error: &ChatError) {
        match error {
            ChatError::Config(message) => {
                *self.config_error.borrow_mut() = Some(message.clone());
                self.close_context();
                self.event_bus.emit(ChatEvent::ConfigError {
                    message: message.clone(),
                });
            }
            other => {
                self.event_bus.emit(ChatEvent::Error {
                    message: format!("Failed to open chat context: {other}"),
                });
            }
        }
    }

    fn emit_sessions_changed(&self) {
        self.event_bus.emit(ChatEvent::SessionsChanged {
            sessions: self.sessions.borrow().iter().map(|s| s.summary()).collect(),
        });
    }

    async fn persist_collection(&self) {
        self.emit_sessions_changed();
        // Snapshot so no borrow lives across the await
        let snapshot = self.sessions.borrow().clone();
        if let Err(e) = self.store.save_sessions(&snapshot).await {
            log::error!("failed to persist sessions: {e}");
            self.event_bus.emit(ChatEvent::Error {
                message: format!("Failed to save chat history: {e}"),
            });
        }
    }

    async fn persist_active_id(&self, session_id: &str) {
        if let Err(e) = self.store.save_active_session_id(session_id).await {
            log::error!("failed to persist active session id: {e}");
        }
    }

    /// Message ids come from a monotonic millisecond clock plus a role
    /// suffix; the bump-on-collision guard keeps back-to-back ids unique.
    fn next_message_id(&self, suffix: &str) -> String {
        let mut millis = Utc::now().timestamp_millis();
        if millis <= self.last_millis.get() {
            millis = self.last_millis.get() + 1;
        }
        self.last_millis.set(millis);
        format!("{millis}-{suffix}")
    }
}

/// `Some(prompt)` when the text starts with the `/image ` command
/// (case-insensitive); the prompt is trimmed and may be empty.
fn strip_image_command(text: &str) -> Option<String> {
    let prefix = text.get(..IMAGE_COMMAND.len())?;
    if prefix.eq_ignore_ascii_case(IMAGE_COMMAND) {
        Some(text[IMAGE_COMMAND.len()..].trim().to_string())
    } else {
        None
    }
}

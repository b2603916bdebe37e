//! Session persistence over a byte-level KV backend.
//!
//! Stored values are plain JSON so a user can inspect them from the
//! browser's devtools. Missing or malformed data loads as empty rather
//! than failing: losing history beats refusing to start.

use std::rc::Rc;

use async_trait::async_trait;

use chat_core::ports::SessionStorePort;
use chat_types::{session::ChatSessionRecord, Result};

use crate::storage::KvStore;

pub const SESSIONS_KEY: &str = "chat:sessions";
pub const ACTIVE_SESSION_KEY: &str = "chat:active-session";

pub struct LocalSessionStore {
    kv: Rc<dyn KvStore>,
}

impl LocalSessionStore {
    pub fn new(kv: Rc<dyn KvStore>) -> Self {
        Self { kv }
    }
}

#[async_trait(?Send)]
impl SessionStorePort for LocalSessionStore {
    async fn load_sessions(&self) -> Result<Vec<ChatSessionRecord>> {
        let Some(bytes) = self.kv.get(SESSIONS_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_slice(&bytes) {
            Ok(sessions) => Ok(sessions),
            Err(e) => {
                log::warn!("stored sessions are unreadable, discarding: {e}");
                Ok(Vec::new())
            }
        }
    }

    async fn save_sessions(&self, sessions: &[ChatSessionRecord]) -> Result<()> {
        let bytes = serde_json::to_vec(sessions)?;
        self.kv.set(SESSIONS_KEY, &bytes).await
    }

    async fn load_active_session_id(&self) -> Result<Option<String>> {
        let Some(bytes) = self.kv.get(ACTIVE_SESSION_KEY).await? else {
            return Ok(None);
        };
        match String::from_utf8(bytes) {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                log::warn!("stored active session id is unreadable: {e}");
                Ok(None)
            }
        }
    }

    async fn save_active_session_id(&self, id: &str) -> Result<()> {
        self.kv.set(ACTIVE_SESSION_KEY, id.as_bytes()).await
    }
}

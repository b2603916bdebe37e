//! Browser adapters for the chat-core port traits.
//!
//! Everything here touches the JS world: `fetch()` via gloo-net for the
//! AI gateway, IndexedDB via web-sys for persistence. The core crates
//! never import from this one.

pub mod config_store;
pub mod gateway;
pub mod session_store;
pub mod storage;

//! WASM-target tests for chat-platform (Node.js runtime).
//!
//! Covers MemoryKv, the session/config stores layered on it, Gemini
//! context bookkeeping, and the SSE line parser under
//! wasm32-unknown-unknown via `wasm-pack test --node`.
//!
//! IndexedDB requires a browser and is exercised there, not here.

use wasm_bindgen_test::*;

use std::rc::Rc;

use chat_core::ports::AiGatewayPort;
use chat_core::ports::SessionStorePort;
use chat_platform::config_store;
use chat_platform::gateway::gemini::parse_sse_data;
use chat_platform::gateway::GeminiGateway;
use chat_platform::session_store::{LocalSessionStore, SESSIONS_KEY};
use chat_platform::storage::{KvStore, MemoryKv};
use chat_types::config::{AppConfig, GatewayConfig};
use chat_types::message::Message;
use chat_types::session::ChatSessionRecord;

// ─── MemoryKv Tests ──────────────────────────────────────

#[wasm_bindgen_test]
fn memory_kv_backend_name() {
    let kv = MemoryKv::new();
    assert_eq!(kv.backend_name(), "memory");
}

#[wasm_bindgen_test]
async fn memory_kv_get_missing() {
    let kv = MemoryKv::new();
    let result = kv.get("nonexistent").await.unwrap();
    assert!(result.is_none());
}

#[wasm_bindgen_test]
async fn memory_kv_set_and_get() {
    let kv = MemoryKv::new();
    kv.set("key1", b"value1").await.unwrap();
    let result = kv.get("key1").await.unwrap();
    assert_eq!(result, Some(b"value1".to_vec()));
}

#[wasm_bindgen_test]
async fn memory_kv_overwrite() {
    let kv = MemoryKv::new();
    kv.set("key", b"v1").await.unwrap();
    kv.set("key", b"v2").await.unwrap();
    let result = kv.get("key").await.unwrap();
    assert_eq!(result, Some(b"v2".to_vec()));
}

#[wasm_bindgen_test]
async fn memory_kv_delete() {
    let kv = MemoryKv::new();
    kv.set("key", b"val").await.unwrap();
    kv.delete("key").await.unwrap();
    let result = kv.get("key").await.unwrap();
    assert!(result.is_none());
}

#[wasm_bindgen_test]
async fn memory_kv_delete_nonexistent() {
    let kv = MemoryKv::new();
    kv.delete("nonexistent").await.unwrap();
}

// ─── LocalSessionStore Tests ─────────────────────────────

#[wasm_bindgen_test]
async fn session_store_empty_on_first_run() {
    let store = LocalSessionStore::new(Rc::new(MemoryKv::new()));
    assert!(store.load_sessions().await.unwrap().is_empty());
    assert!(store.load_active_session_id().await.unwrap().is_none());
}

#[wasm_bindgen_test]
async fn session_store_round_trip() {
    let store = LocalSessionStore::new(Rc::new(MemoryKv::new()));

    let mut session = ChatSessionRecord::new("session-1");
    session
        .messages
        .push(Message::user("100-user", "hello there"));
    let sessions = vec![session, ChatSessionRecord::new("session-2")];

    store.save_sessions(&sessions).await.unwrap();
    let loaded = store.load_sessions().await.unwrap();
    assert_eq!(loaded, sessions);
}

#[wasm_bindgen_test]
async fn session_store_active_id_round_trip() {
    let store = LocalSessionStore::new(Rc::new(MemoryKv::new()));
    store.save_active_session_id("session-42").await.unwrap();
    assert_eq!(
        store.load_active_session_id().await.unwrap().as_deref(),
        Some("session-42")
    );
}

#[wasm_bindgen_test]
async fn session_store_tolerates_corrupt_data() {
    let kv = Rc::new(MemoryKv::new());
    kv.set(SESSIONS_KEY, b"{not json").await.unwrap();

    let store = LocalSessionStore::new(kv);
    assert!(store.load_sessions().await.unwrap().is_empty());
}

// ─── Config store Tests ──────────────────────────────────

#[wasm_bindgen_test]
async fn config_store_defaults_when_absent() {
    let kv = MemoryKv::new();
    let config = config_store::load_config(&kv).await;
    assert_eq!(config, AppConfig::default());
    assert!(config.gateway.api_key.is_empty());
}

#[wasm_bindgen_test]
async fn config_store_round_trip() {
    let kv = MemoryKv::new();
    let mut config = AppConfig::default();
    config.gateway.api_key = "test-key".to_string();
    config.gateway.model = "gemini-2.5-pro".to_string();

    config_store::save_config(&kv, &config).await.unwrap();
    assert_eq!(config_store::load_config(&kv).await, config);
}

// ─── Gemini context Tests ────────────────────────────────

fn gateway_with_key() -> GeminiGateway {
    let mut config = GatewayConfig::default();
    config.api_key = "test-key".to_string();
    GeminiGateway::new(config)
}

#[wasm_bindgen_test]
fn gemini_open_context_requires_api_key() {
    let gateway = GeminiGateway::new(GatewayConfig::default());
    assert!(gateway.open_context(&[]).is_err());
}

#[wasm_bindgen_test]
fn gemini_close_context_releases_history() {
    let gateway = gateway_with_key();
    let first = gateway.open_context(&[]).unwrap();
    let _second = gateway
        .open_context(&[Message::user("1-user", "hi")])
        .unwrap();
    assert_eq!(gateway.open_context_count(), 2);

    gateway.close_context(first);
    assert_eq!(gateway.open_context_count(), 1);

    // Closing an already-closed handle is a no-op
    gateway.close_context(first);
    assert_eq!(gateway.open_context_count(), 1);
}

// ─── SSE parser Tests ────────────────────────────────────

#[wasm_bindgen_test]
fn sse_ignores_blank_and_comment_lines() {
    assert!(parse_sse_data("").is_none());
    assert!(parse_sse_data(": keep-alive").is_none());
    assert!(parse_sse_data("event: message").is_none());
    assert!(parse_sse_data("data: [DONE]").is_none());
}

#[wasm_bindgen_test]
fn sse_extracts_text_delta() {
    let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#;
    let chunk = parse_sse_data(line).unwrap();
    assert_eq!(chunk.text.as_deref(), Some("Hello"));
    assert!(!chunk.is_final_chunk);
    assert!(chunk.error.is_none());
}

#[wasm_bindgen_test]
fn sse_finish_reason_marks_final() {
    let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"done"}]},"finishReason":"STOP"}]}"#;
    let chunk = parse_sse_data(line).unwrap();
    assert_eq!(chunk.text.as_deref(), Some("done"));
    assert!(chunk.is_final_chunk);
}

#[wasm_bindgen_test]
fn sse_api_error_becomes_error_chunk() {
    let line = r#"data: {"error":{"code":429,"message":"quota exceeded"}}"#;
    let chunk = parse_sse_data(line).unwrap();
    assert_eq!(chunk.error.as_deref(), Some("quota exceeded"));
}

#[wasm_bindgen_test]
fn sse_blocked_prompt_becomes_error_chunk() {
    let line = r#"data: {"promptFeedback":{"blockReason":"SAFETY"}}"#;
    let chunk = parse_sse_data(line).unwrap();
    assert!(chunk.error.as_deref().unwrap().contains("SAFETY"));
}

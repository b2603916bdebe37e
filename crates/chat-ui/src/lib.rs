//! UI panels and view state for the chat client.
//!
//! Pure egui: no wasm-bindgen, no network. Panels render from [`state::UiState`]
//! and hand user intents back to the caller as plain values.

pub mod panels;
pub mod state;
pub mod theme;

mod tests;

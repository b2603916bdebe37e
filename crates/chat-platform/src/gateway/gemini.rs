//! Google Generative Language API adapter.
//!
//! Speaks the v1beta REST protocol: `streamGenerateContent` over SSE for
//! chat turns, Imagen `:predict` for the `/image` command. Uses browser
//! `fetch()` via gloo-net, reading the response body incrementally
//! through its ReadableStream so chunks surface as they arrive.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;
use gloo_net::http::Request;
use js_sys::Uint8Array;
use serde::Deserialize;
use serde_json::{json, Value};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::ReadableStreamDefaultReader;

use chat_core::ports::{AiGatewayPort, ContextHandle, ImageOutcome, StreamChunk};
use chat_types::{
    config::GatewayConfig,
    message::{Message, Sender},
    ChatError, Result,
};

/// Gateway holding one turn-history per open context.
///
/// Contexts are plain request-payload fragments; nothing is held open on
/// the server side, so "opening" a context never touches the network and
/// only validates configuration.
pub struct GeminiGateway {
    config: GatewayConfig,
    contexts: RefCell<HashMap<u64, Vec<Value>>>,
    next_context_id: Cell<u64>,
}

impl GeminiGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            contexts: RefCell::new(HashMap::new()),
            next_context_id: Cell::new(1),
        }
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.config.base_url(),
            self.config.model,
            self.config.api_key
        )
    }

    fn predict_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:predict?key={}",
            self.config.base_url(),
            self.config.image_model,
            self.config.api_key
        )
    }

    /// Number of contexts currently holding a history. The controller
    /// closes abandoned handles, so this stays at one per live session.
    pub fn open_context_count(&self) -> usize {
        self.contexts.borrow().len()
    }
}

fn turn(role: &str, text: &str) -> Value {
    json!({ "role": role, "parts": [{ "text": text }] })
}

#[async_trait(?Send)]
impl AiGatewayPort for GeminiGateway {
    fn open_context(&self, prior_messages: &[Message]) -> Result<ContextHandle> {
        if self.config.api_key.trim().is_empty() {
            return Err(ChatError::Config(
                "Gemini API key is not set. Add it in Settings.".to_string(),
            ));
        }

        // System notices and empty placeholders are UI artifacts; the
        // model only sees the user/model dialogue.
        let history: Vec<Value> = prior_messages
            .iter()
            .filter(|m| m.sender != Sender::System && !m.text.is_empty())
            .map(|m| {
                let role = match m.sender {
                    Sender::User => "user",
                    _ => "model",
                };
                turn(role, &m.text)
            })
            .collect();

        let id = self.next_context_id.get();
        self.next_context_id.set(id + 1);
        self.contexts.borrow_mut().insert(id, history);
        Ok(ContextHandle(id))
    }

    fn close_context(&self, context: ContextHandle) {
        self.contexts.borrow_mut().remove(&context.0);
    }

    async fn stream_turn(
        &self,
        context: ContextHandle,
        user_text: &str,
        on_chunk: &mut (dyn FnMut(StreamChunk) + '_),
    ) -> Result<()> {
        let user_turn = turn("user", user_text);
        let contents: Vec<Value> = {
            let contexts = self.contexts.borrow();
            let history = contexts.get(&context.0).ok_or_else(|| {
                ChatError::Gateway(format!("context {} is not open", context.0))
            })?;
            history.iter().cloned().chain([user_turn.clone()]).collect()
        };

        let response = Request::post(&self.stream_url())
            .header("Content-Type", "application/json")
            .json(&json!({ "contents": contents }))
            .map_err(|e| ChatError::Network(e.to_string()))?
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !response.ok() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ChatError::Gateway(format!(
                "HTTP {status}: {}",
                error_detail(&body)
            )));
        }

        let stream = response
            .body()
            .ok_or_else(|| ChatError::Network("response has no body".to_string()))?;
        let reader: ReadableStreamDefaultReader = stream
            .get_reader()
            .dyn_into()
            .map_err(|_| ChatError::Network("unsupported stream reader".to_string()))?;

        let mut model_text = String::new();
        let mut buffer = String::new();
        let mut terminated = false;
        let mut failed = false;

        'read: loop {
            let step = JsFuture::from(reader.read())
                .await
                .map_err(|e| ChatError::Network(format!("{:?}", e)))?;
            let done = js_sys::Reflect::get(&step, &JsValue::from_str("done"))
                .ok()
                .and_then(|v| v.as_bool())
                .unwrap_or(true);
            if done {
                break;
            }
            let value = js_sys::Reflect::get(&step, &JsValue::from_str("value"))
                .map_err(|e| ChatError::Network(format!("{:?}", e)))?;
            buffer.push_str(&String::from_utf8_lossy(&Uint8Array::new(&value).to_vec()));

            while let Some(pos) = buffer.find('\n') {
                let line: String = buffer.drain(..=pos).collect();
                let Some(chunk) = parse_sse_data(line.trim()) else {
                    continue;
                };
                if chunk.error.is_some() {
                    failed = true;
                }
                if let Some(text) = &chunk.text {
                    model_text.push_str(text);
                }
                terminated = chunk.is_final_chunk || failed;
                on_chunk(chunk);
                if terminated {
                    break 'read;
                }
            }
        }
        let _ = reader.cancel();

        // The last payload may arrive without a trailing newline
        if !terminated {
            if let Some(chunk) = parse_sse_data(buffer.trim()) {
                failed = chunk.error.is_some();
                if let Some(text) = &chunk.text {
                    model_text.push_str(text);
                }
                terminated = chunk.is_final_chunk || failed;
                on_chunk(chunk);
            }
        }

        if failed {
            // An error chunk ends the turn; the rejected user turn is not
            // recorded so a retry re-sends it cleanly.
            return Ok(());
        }
        if !terminated {
            on_chunk(StreamChunk {
                is_final_chunk: true,
                ..Default::default()
            });
        }

        if let Some(history) = self.contexts.borrow_mut().get_mut(&context.0) {
            history.push(user_turn);
            history.push(turn("model", &model_text));
        }
        Ok(())
    }

    async fn generate_image(&self, prompt: &str) -> Result<ImageOutcome> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1, "outputMimeType": "image/png" },
        });

        let response = Request::post(&self.predict_url())
            .header("Content-Type", "application/json")
            .json(&body)
            .map_err(|e| ChatError::Network(e.to_string()))?
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !response.ok() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ChatError::Gateway(format!(
                "HTTP {status}: {}",
                error_detail(&body)
            )));
        }

        let data: PredictResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Gateway(e.to_string()))?;

        let Some(prediction) = data.predictions.into_iter().next() else {
            return Ok(ImageOutcome {
                error: Some("no image returned".to_string()),
                ..Default::default()
            });
        };

        match prediction.bytes_base64_encoded {
            Some(b64) if !b64.is_empty() => {
                let mime = prediction
                    .mime_type
                    .unwrap_or_else(|| "image/png".to_string());
                Ok(ImageOutcome {
                    image_url: Some(format!("data:{mime};base64,{b64}")),
                    prompt: Some(prompt.to_string()),
                    error: None,
                })
            }
            _ => Ok(ImageOutcome {
                error: Some(
                    prediction
                        .rai_filtered_reason
                        .unwrap_or_else(|| "no image returned".to_string()),
                ),
                ..Default::default()
            }),
        }
    }
}

// ─── SSE parsing ─────────────────────────────────────────────

/// Interpret one SSE line from `streamGenerateContent`.
///
/// Returns `None` for blank/keep-alive lines and payloads carrying
/// nothing of interest. A returned chunk holds the text delta of that
/// payload; the final marker is set when the candidate reports a finish
/// reason, and a blocked prompt or in-stream API error surfaces as an
/// error chunk.
pub fn parse_sse_data(line: &str) -> Option<StreamChunk> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    let parsed: StreamPayload = match serde_json::from_str(payload) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("unparseable stream payload: {e}");
            return None;
        }
    };

    if let Some(error) = parsed.error {
        return Some(StreamChunk {
            error: Some(error.message),
            ..Default::default()
        });
    }
    if let Some(reason) = parsed
        .prompt_feedback
        .and_then(|f| f.block_reason)
    {
        return Some(StreamChunk {
            error: Some(format!("prompt was blocked: {reason}")),
            ..Default::default()
        });
    }

    let candidate = parsed.candidates.into_iter().next()?;
    let text: String = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .concat()
        })
        .unwrap_or_default();

    Some(StreamChunk {
        text: (!text.is_empty()).then_some(text),
        error: None,
        is_final_chunk: candidate.finish_reason.is_some(),
    })
}

#[derive(Deserialize)]
struct StreamPayload {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(default, rename = "blockReason")]
    block_reason: Option<String>,
}

// ─── Imagen response types ───────────────────────────────────

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
struct Prediction {
    #[serde(default, rename = "bytesBase64Encoded")]
    bytes_base64_encoded: Option<String>,
    #[serde(default, rename = "mimeType")]
    mime_type: Option<String>,
    #[serde(default, rename = "raiFilteredReason")]
    rai_filtered_reason: Option<String>,
}

/// Pull the human-readable message out of an API error body, falling
/// back to the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

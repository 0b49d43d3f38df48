//! Gemini stream payload types.
//!
//! # Gemini Protocol Overview
//!
//! Gemini emits flat NDJSON objects, not JSON-RPC. Two dialects show up:
//!
//! - the CLI's `stream-json` events with a `type` discriminator
//!   (`init`, `message`, `tool_use`, `tool_result`, `error`, `result`),
//!   where `delta: true` marks a streaming `content` fragment;
//! - relay objects with a string `delta` and a `phase` field.
//!
//! Both parse into [`GeminiStreamEvent`]. `delta` and `content` stay dynamic
//! because their JSON type differs between the two.

use serde::Deserialize;
use serde_json::Value;

/// A Gemini stream event. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeminiStreamEvent {
    #[serde(rename = "type")]
    pub event_type: Option<String>,

    /// Lifecycle phase; wins over `type` when both are present.
    pub phase: Option<String>,

    /// snake_case on the wire, like every Gemini field.
    pub session_id: Option<String>,

    pub model: Option<String>,

    /// "assistant" or "user" on message events.
    pub role: Option<String>,

    /// Message text; a fragment when `delta` is `true`.
    pub content: Option<Value>,

    /// A text fragment (string) or the streaming flag (bool).
    pub delta: Option<Value>,

    pub tool_name: Option<String>,

    /// Tool arguments. Gemini says "parameters", not "params".
    pub parameters: Option<Value>,

    /// Free-form status line, or "success"/"error" on tool results.
    pub status: Option<String>,

    pub message: Option<String>,

    /// A bare string or an object with a `message`.
    pub error: Option<Value>,
}

impl GeminiStreamEvent {
    /// `phase`, falling back to `type`.
    pub fn phase(&self) -> Option<&str> {
        self.phase.as_deref().or(self.event_type.as_deref())
    }

    pub fn error_text(&self) -> Option<&str> {
        let from_error = match &self.error {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Object(map)) => map.get("message").and_then(Value::as_str),
            _ => None,
        };
        from_error
            .or(self.message.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

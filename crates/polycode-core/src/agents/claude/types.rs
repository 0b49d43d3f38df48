//! Claude stream-json payload types.
//!
//! Claude emits one JSON object per line. With partial messages enabled the
//! low-level block events arrive wrapped:
//!
//! ```json
//! {"type":"stream_event","event":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}}
//! ```
//!
//! Older builds and some relays send the inner event bare. Both shapes parse
//! into [`ClaudeStreamEvent`]: a flat struct whose `event_type` says which of
//! the optional fields are populated. A flat struct tolerates new event
//! types where a tagged enum would reject them.

use serde::Deserialize;
use serde_json::Value;

/// A Claude stream event, top-level or unwrapped from `stream_event`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClaudeStreamEvent {
    /// "system", "assistant", "user", "result", "stream_event",
    /// "message_start", "content_block_start", "content_block_delta", ...
    #[serde(rename = "type")]
    pub event_type: String,

    /// e.g. "init" for system events, "success"/"error_max_turns" for results.
    pub subtype: Option<String>,

    pub session_id: Option<String>,

    /// Model name on `system/init`.
    pub model: Option<String>,

    /// The wrapped event inside a `stream_event` envelope.
    pub event: Option<Value>,

    /// Content block index on block events.
    pub index: Option<u64>,

    /// Present on `content_block_start`.
    pub content_block: Option<ContentBlock>,

    /// Present on `content_block_delta` and `message_delta`.
    pub delta: Option<Delta>,

    /// Whole message on `assistant` (and `user`) events. Kept dynamic because
    /// `user` messages may carry a bare string as content.
    pub message: Option<Value>,

    /// Final answer text on `result`.
    pub result: Option<String>,

    pub is_error: bool,
}

/// A complete assistant message from a one-shot `assistant` event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssistantMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

/// A content block: text, thinking or tool_use.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,

    pub text: Option<String>,

    pub thinking: Option<String>,

    /// Tool use id, for tool_use blocks.
    pub id: Option<String>,

    /// Tool name, for tool_use blocks.
    pub name: Option<String>,

    /// Tool input. On `content_block_start` this is usually `{}` and the real
    /// arguments stream in as `input_json_delta` fragments.
    pub input: Option<Value>,
}

/// Incremental change inside a block, or message-level metadata on
/// `message_delta` (which carries no `type`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Delta {
    /// "text_delta", "thinking_delta", "input_json_delta", or empty.
    #[serde(rename = "type")]
    pub delta_type: String,

    pub text: Option<String>,

    pub thinking: Option<String>,

    /// A raw fragment of the tool's JSON arguments. Not valid JSON alone.
    pub partial_json: Option<String>,

    pub stop_reason: Option<String>,
}

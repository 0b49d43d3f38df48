//! Codex JSON-RPC payload types.
//!
//! # Codex Protocol Overview
//!
//! Codex speaks JSON-RPC 2.0. Three message shapes reach us:
//!
//! 1. **Notification**: `method`, no `id`. Almost all streaming output.
//!    `{"method": "item/agentMessage/delta", "params": {"delta": "Hi"}}`
//! 2. **Server request**: `method` AND `id`. Codex asking the host something
//!    (approvals). Handled by the adapter, not the classifier.
//! 3. **Response**: `id`, no `method`. Replies to requests the adapter sent.
//!
//! Field spellings drift between Codex releases (`tokenUsage` vs
//! `token_usage`, `exitCode` vs `exit_code`), so most structs carry aliases.

use serde::Deserialize;
use serde_json::Value;

use crate::usage::TokenBreakdown;

/// A JSON-RPC message from Codex.
///
/// `#[serde(untagged)]` tries variants in order, so the most specific shape
/// (both `id` and `method`) must come first.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    ServerRequest(JsonRpcServerRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcServerRequest {
    pub method: String,
    pub id: Value,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Params of `item/started`, `item/updated` and `item/completed`.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemParams {
    pub item: CodexItem,
}

/// An item in a Codex turn.
///
/// Different item types populate different optional fields; `item_type`
/// says which ones are meaningful.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodexItem {
    pub id: Option<String>,

    /// "agentMessage", "reasoning", "commandExecution", "fileChange",
    /// "mcpToolCall", ...
    #[serde(rename = "type")]
    pub item_type: String,

    pub text: Option<String>,

    /// A command line string or an argv array.
    pub command: Option<Value>,
    #[serde(alias = "exit_code")]
    pub exit_code: Option<i64>,
    pub status: Option<String>,
    #[serde(alias = "duration_ms")]
    pub duration_ms: Option<u64>,

    /// Either an array of entries or a map keyed by path.
    pub changes: Option<Value>,
    pub diff: Option<String>,
    pub preview: Option<String>,
    #[serde(alias = "file_path")]
    pub file_path: Option<String>,

    pub server: Option<String>,
    #[serde(alias = "toolName", alias = "tool_name")]
    pub tool: Option<String>,

    pub error: Option<Value>,
}

impl CodexItem {
    /// The item's file changes, whichever shape they arrived in.
    pub fn file_changes(&self) -> Vec<FileChangeEntry> {
        match &self.changes {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| FileChangeEntry::deserialize(entry).ok())
                .collect(),
            Some(Value::Object(by_path)) => by_path
                .iter()
                .map(|(path, entry)| {
                    let mut change = FileChangeEntry::deserialize(entry).unwrap_or_default();
                    if change.path.is_empty() {
                        change.path = path.clone();
                    }
                    change
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// One file touched by a `fileChange` item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileChangeEntry {
    pub path: String,
    pub kind: Option<Value>,
    pub diff: Option<String>,
    #[serde(alias = "additions", alias = "linesAdded", alias = "lines_added")]
    pub added: Option<u64>,
    #[serde(alias = "deletions", alias = "linesRemoved", alias = "lines_removed")]
    pub removed: Option<u64>,
    pub hunks: Vec<Hunk>,
}

/// A structured diff hunk. Lines are either plain strings or objects with
/// a sign/type tag and the line text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Hunk {
    pub header: Option<String>,
    pub lines: Vec<Value>,
}

/// Params of the `error` notification.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorParams {
    pub error: Option<Value>,
    pub message: Option<String>,
    #[serde(alias = "will_retry")]
    pub will_retry: bool,
}

/// Params of `turn/started`, `turn/completed` and `turn/failed`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TurnParams {
    pub turn: Option<TurnInfo>,
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TurnInfo {
    pub id: Option<String>,
    pub status: Option<String>,
    pub error: Option<Value>,
}

/// Params of `thread/tokenUsage/updated`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TokenUsageParams {
    #[serde(alias = "tokenUsage", alias = "token_usage", alias = "info")]
    pub usage: Option<TokenUsageInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TokenUsageInfo {
    #[serde(alias = "total_token_usage")]
    pub total: Option<TokenBreakdown>,
    #[serde(alias = "last_token_usage")]
    pub last: Option<TokenBreakdown>,
    #[serde(rename = "modelContextWindow", alias = "model_context_window")]
    pub model_context_window: Option<u64>,
}

/// Params of `thread/started`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThreadStartedParams {
    pub thread: Option<ThreadInfo>,
    #[serde(rename = "threadId", alias = "thread_id")]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThreadInfo {
    pub id: Option<String>,
}

/// Params of `thread/name/updated`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThreadNameParams {
    #[serde(alias = "threadName", alias = "thread_name", alias = "title")]
    pub name: Option<String>,
}

/// Pull a human-readable message out of an error value that may be a bare
/// string or an object with a `message` field.
pub fn error_message(error: &Value) -> Option<String> {
    let message = match error {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("message").and_then(Value::as_str),
        _ => None,
    };
    message
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

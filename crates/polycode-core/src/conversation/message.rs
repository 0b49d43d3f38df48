//! Chat message types.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// What kind of content a message holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Tool,
    Diff,
    Error,
    Reasoning,
}

/// A single entry in a session's conversation.
///
/// Lists of messages are append-only; only the last entry is ever mutated
/// (see [`super::merge`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub message_type: MessageType,
    pub content: String,
    /// Milliseconds since the Unix epoch (UTC).
    pub created_at: i64,
}

impl Message {
    /// Create a message stamped with a fresh id and the current time.
    pub fn new(
        session_id: impl Into<String>,
        role: MessageRole,
        message_type: MessageType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            role,
            message_type,
            content: content.into(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    /// Whether this message has the given (role, type) pair.
    pub fn is_kind(&self, role: MessageRole, message_type: MessageType) -> bool {
        self.role == role && self.message_type == message_type
    }
}

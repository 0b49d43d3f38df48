//! Normalized classifier output shared by every provider.
//!
//! Each provider classifier turns one raw payload into a [`Classification`]:
//! zero or more [`ParsedUpdate`]s for the merge engine plus lifecycle hints
//! (live status, turn end, telemetry, native session id, title).

use serde::{Deserialize, Serialize};

use crate::conversation::{MessageRole, MessageType};
use crate::usage::ContextUsageSnapshot;

/// How a [`ParsedUpdate`] is folded into the message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeMode {
    /// Concatenate onto the last message when (role, type) match.
    Append,

    /// Overwrite the last message when (role, type) match, else append.
    ReplaceOrCreate,

    /// Always a fresh entry, unless an identical one sits in the dedup window.
    NewEntry,
}

/// A single normalized change to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedUpdate {
    pub role: MessageRole,
    pub message_type: MessageType,
    pub content: String,
    pub mode: MergeMode,
}

impl ParsedUpdate {
    pub fn new(
        role: MessageRole,
        message_type: MessageType,
        content: impl Into<String>,
        mode: MergeMode,
    ) -> Self {
        Self {
            role,
            message_type,
            content: content.into(),
            mode,
        }
    }

    /// Streaming assistant text fragment.
    pub fn text_delta(content: impl Into<String>) -> Self {
        Self::new(
            MessageRole::Assistant,
            MessageType::Text,
            content,
            MergeMode::Append,
        )
    }

    /// Authoritative assistant text that supersedes any streamed draft.
    pub fn final_text(content: impl Into<String>) -> Self {
        Self::new(
            MessageRole::Assistant,
            MessageType::Text,
            content,
            MergeMode::ReplaceOrCreate,
        )
    }

    /// Streaming reasoning fragment.
    pub fn reasoning_delta(content: impl Into<String>) -> Self {
        Self::new(
            MessageRole::Assistant,
            MessageType::Reasoning,
            content,
            MergeMode::Append,
        )
    }

    /// Complete reasoning block.
    pub fn final_reasoning(content: impl Into<String>) -> Self {
        Self::new(
            MessageRole::Assistant,
            MessageType::Reasoning,
            content,
            MergeMode::ReplaceOrCreate,
        )
    }

    /// A rendered tool invocation.
    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(
            MessageRole::Assistant,
            MessageType::Tool,
            content,
            MergeMode::NewEntry,
        )
    }

    /// A system-level error surfaced into the conversation.
    pub fn error(content: impl Into<String>) -> Self {
        Self::new(
            MessageRole::System,
            MessageType::Error,
            content,
            MergeMode::NewEntry,
        )
    }
}

/// What a payload says about the session's live status line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusHint {
    /// Payload carries no status information.
    #[default]
    Unchanged,

    /// Show this phrase; the session is working.
    Set(String),

    /// Turn is over, clear the status.
    Clear,
}

/// A session title suggested by a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleHint {
    /// The provider renamed the thread; always applied.
    Rename(String),

    /// Guessed from the conversation; only fills an empty title.
    Derived(String),
}

impl TitleHint {
    pub fn text(&self) -> &str {
        match self {
            TitleHint::Rename(text) | TitleHint::Derived(text) => text,
        }
    }
}

/// Everything one raw payload contributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub status: StatusHint,
    pub updates: Vec<ParsedUpdate>,
    pub context_usage: Option<ContextUsageSnapshot>,
    pub turn_ended: bool,
    pub native_session_id: Option<String>,
    pub title: Option<TitleHint>,
}

impl Classification {
    /// The result for payloads we do not understand.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A bare status change.
    pub fn status(text: impl Into<String>) -> Self {
        Self {
            status: StatusHint::Set(text.into()),
            ..Self::default()
        }
    }

    /// Marks the turn as finished and clears the status.
    pub fn end_turn(mut self) -> Self {
        self.turn_ended = true;
        self.status = StatusHint::Clear;
        self
    }

    pub fn with_update(mut self, update: ParsedUpdate) -> Self {
        self.updates.push(update);
        self
    }

    pub fn with_status(mut self, text: impl Into<String>) -> Self {
        self.status = StatusHint::Set(text.into());
        self
    }

    /// True when applying this classification would change nothing.
    pub fn is_empty(&self) -> bool {
        self.status == StatusHint::Unchanged
            && self.updates.is_empty()
            && self.context_usage.is_none()
            && !self.turn_ended
            && self.native_session_id.is_none()
            && self.title.is_none()
    }
}

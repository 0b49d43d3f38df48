//! Per-session state.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::{ClassifierState, TitleHint};
use crate::conversation::Message;
use crate::logging::LogHandle;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Whether a turn is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnState {
    #[default]
    Idle,
    Busy { started_at: DateTime<Utc> },
}

/// Everything the engine tracks for one session.
#[derive(Debug)]
pub struct SessionState {
    pub id: SessionId,

    /// The conversation. Only the last entry is ever mutated.
    pub messages: Vec<Message>,

    /// Tool-call buffer and per-turn flags for the classifiers.
    pub classifier: ClassifierState,

    pub turn: TurnState,

    /// Live status phrase; `None` while idle.
    pub status: Option<String>,

    /// Submissions deferred while busy, oldest first.
    pub queue: VecDeque<String>,

    pub title: Option<String>,

    /// The provider's own id for this conversation, used for resume.
    pub native_session_id: Option<String>,

    /// Raw event log; empty when logging is off.
    pub log: LogHandle,
}

impl SessionState {
    pub fn new(id: SessionId, log: LogHandle) -> Self {
        Self {
            id,
            messages: Vec::new(),
            classifier: ClassifierState::new(),
            turn: TurnState::Idle,
            status: None,
            queue: VecDeque::new(),
            title: None,
            native_session_id: None,
            log,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.turn, TurnState::Busy { .. })
    }

    pub fn turn_started_at(&self) -> Option<DateTime<Utc>> {
        match self.turn {
            TurnState::Busy { started_at } => Some(started_at),
            TurnState::Idle => None,
        }
    }

    /// Enter Busy with a fresh clock and the given status.
    pub fn begin_turn(&mut self, status: impl Into<String>) {
        self.turn = TurnState::Busy {
            started_at: Utc::now(),
        };
        self.status = Some(status.into());
    }

    /// Return to Idle and drop per-turn classifier state.
    pub fn end_turn(&mut self) {
        self.turn = TurnState::Idle;
        self.status = None;
        self.classifier.reset_turn();
    }

    /// Apply a title hint. Returns true if the title changed.
    pub fn apply_title(&mut self, hint: &TitleHint) -> bool {
        let text = hint.text();
        let applies = match hint {
            TitleHint::Rename(_) => true,
            TitleHint::Derived(_) => self.title.is_none(),
        };
        if !applies || self.title.as_deref() == Some(text) {
            return false;
        }
        self.title = Some(text.to_string());
        true
    }
}

//! Boundaries to the outside world.
//!
//! The engine never talks to a provider process or to disk directly. An
//! [`AgentAdapter`] carries submissions and interrupts to whatever runs the
//! agent CLI, and a [`MessageLoader`] supplies stored history when a session
//! is activated.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::conversation::Message;
use crate::logging::is_safe_file_stem;
use crate::session::SessionId;

/// Failure reported by an adapter.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The text could not be delivered (broken pipe, closed socket).
    #[error("transport error: {0}")]
    Transport(String),
    /// The provider process has exited.
    #[error("agent process is not running")]
    ProcessGone,
    #[error("{0}")]
    Other(String),
}

/// Failure loading stored history.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session id {0:?} cannot name a history file")]
    InvalidSessionId(String),
}

/// Sends work to a provider process.
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    /// Deliver one user submission.
    async fn submit(&self, session_id: &SessionId, text: &str) -> Result<(), AdapterError>;

    /// Ask the provider to stop the current turn. Best-effort.
    async fn interrupt(&self, session_id: &SessionId) -> Result<(), AdapterError>;
}

#[async_trait]
impl<T: AgentAdapter + ?Sized> AgentAdapter for Arc<T> {
    async fn submit(&self, session_id: &SessionId, text: &str) -> Result<(), AdapterError> {
        (**self).submit(session_id, text).await
    }

    async fn interrupt(&self, session_id: &SessionId) -> Result<(), AdapterError> {
        (**self).interrupt(session_id).await
    }
}

/// Supplies stored conversation history. Read-only.
#[async_trait]
pub trait MessageLoader: Send + Sync {
    async fn load_messages(&self, session_id: &SessionId) -> Result<Vec<Message>, LoaderError>;
}

/// Loads `{dir}/{session_id}.jsonl`, one serialized [`Message`] per line.
#[derive(Debug, Clone)]
pub struct JsonlMessageLoader {
    dir: PathBuf,
}

impl JsonlMessageLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MessageLoader for JsonlMessageLoader {
    /// Returns an empty list if the file doesn't exist. Blank lines are
    /// skipped; any other unparseable line fails the load. Ids that are not
    /// plain file names are rejected.
    async fn load_messages(&self, session_id: &SessionId) -> Result<Vec<Message>, LoaderError> {
        if !is_safe_file_stem(session_id.as_str()) {
            return Err(LoaderError::InvalidSessionId(session_id.to_string()));
        }
        let file_path = self.dir.join(format!("{session_id}.jsonl"));

        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(file_path)?;
        let reader = BufReader::new(file);
        let mut messages = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let message: Message = serde_json::from_str(&line)?;
            messages.push(message);
        }

        Ok(messages)
    }
}

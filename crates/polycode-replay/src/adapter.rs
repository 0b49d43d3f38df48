//! Adapter used during replay.
//!
//! There is no live provider process, so submissions are only recorded and
//! logged. The transcript supplies whatever the provider "answered".

use std::sync::Mutex;

use async_trait::async_trait;
use polycode_core::{AdapterError, AgentAdapter, SessionId};

#[derive(Debug, Default)]
pub struct ReplayAdapter {
    submissions: Mutex<Vec<(SessionId, String)>>,
}

impl ReplayAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texts submitted to `session_id`, in send order.
    pub fn submitted(&self, session_id: &SessionId) -> Vec<String> {
        match self.submissions.lock() {
            Ok(guard) => guard
                .iter()
                .filter(|(id, _)| id == session_id)
                .map(|(_, text)| text.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl AgentAdapter for ReplayAdapter {
    async fn submit(&self, session_id: &SessionId, text: &str) -> Result<(), AdapterError> {
        log::info!("[{}] submit: {}", session_id, text);
        self.submissions
            .lock()
            .map_err(|e| AdapterError::Other(e.to_string()))?
            .push((session_id.clone(), text.to_string()));
        Ok(())
    }

    async fn interrupt(&self, session_id: &SessionId) -> Result<(), AdapterError> {
        log::info!("[{}] interrupt", session_id);
        Ok(())
    }
}

//! The session engine.
//!
//! Owns every session's state and ties the pieces together: provider
//! payloads go through the classifiers into the merge engine, status hints
//! and turn ends drive the busy/idle state machine, and submissions are
//! either forwarded to the adapter or queued until the session is idle.
//!
//! The engine is a plain owned value. Its only suspension points are the
//! adapter calls made from [`Engine::submit`], [`Engine::interrupt`] and the
//! queue flush that follows a turn end.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;

use crate::adapter::{AdapterError, AgentAdapter, LoaderError, MessageLoader};
use crate::agents::{self, Classification, ClassifierState, ParsedUpdate, ProviderTag, StatusHint};
use crate::config::EngineConfig;
use crate::conversation::{merge, merge_all, Message, MessageRole, MessageType};
use crate::event_bus::{EventBus, SessionTopic};
use crate::logging::{log_line, open_log_file, INBOUND, OUTBOUND};
use crate::usage::{ContextUsageSnapshot, ContextUsageTracker};

use super::state::{SessionId, SessionState};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Submission is blank")]
    BlankSubmission,

    #[error("Failed to send submission: {0}")]
    Transport(#[from] AdapterError),

    #[error("Failed to load history: {0}")]
    Load(#[from] LoaderError),
}

/// What happened to an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Forwarded to the adapter; the session is now busy.
    Sent,
    /// Deferred until the session is idle.
    Queued,
}

/// Per-session conversation and turn bookkeeping for all sessions.
pub struct Engine {
    sessions: HashMap<SessionId, SessionState>,
    usage: ContextUsageTracker,
    config: EngineConfig,
    adapter: Box<dyn AgentAdapter>,
    loader: Option<Box<dyn MessageLoader>>,
    event_bus: Arc<EventBus>,
}

impl Engine {
    pub fn new(config: EngineConfig, adapter: impl AgentAdapter + 'static) -> Self {
        let event_bus = Arc::new(EventBus::with_capacity(config.event_bus_capacity));
        Self {
            sessions: HashMap::new(),
            usage: ContextUsageTracker::new(),
            config,
            adapter: Box::new(adapter),
            loader: None,
            event_bus,
        }
    }

    /// Use `loader` for history when sessions are activated.
    pub fn with_loader(mut self, loader: impl MessageLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The bus change notifications are published on.
    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Feed one raw provider payload into a session.
    pub async fn on_provider_event(&mut self, session_id: &SessionId, provider: ProviderTag, payload: &Value) {
        let classification = match self.sessions.get_mut(session_id) {
            Some(state) => {
                log_line(&state.log, INBOUND, &payload.to_string());
                agents::classify(provider, payload, &mut state.classifier)
            }
            None => {
                // Unknown sessions only come into existence for payloads that mean something.
                let mut classifier = ClassifierState::new();
                let classification = agents::classify(provider, payload, &mut classifier);
                if classification.is_empty() && classifier == ClassifierState::new() {
                    log::debug!("Ignoring unclassified payload for unknown session {}", session_id);
                    return;
                }
                let state = session_entry(&mut self.sessions, &self.config, session_id);
                log_line(&state.log, INBOUND, &payload.to_string());
                state.classifier = classifier;
                classification
            }
        };
        if classification.is_empty() {
            return;
        }

        let flush = self.apply(session_id, classification);
        if flush {
            self.flush_queue(session_id).await;
        }
    }

    /// Apply a classification to session state and announce what changed.
    /// Returns true if a busy turn just ended.
    fn apply(&mut self, session_id: &SessionId, classification: Classification) -> bool {
        let Classification {
            status,
            updates,
            context_usage,
            turn_ended,
            native_session_id,
            title,
        } = classification;

        let state = session_entry(&mut self.sessions, &self.config, session_id);

        let messages_changed = merge_all(
            &mut state.messages,
            session_id.as_str(),
            &updates,
            self.config.dedup_window,
        );

        let mut status_changed = false;
        match status {
            StatusHint::Set(text) if !state.is_busy() => {
                log::debug!("Late event for idle session {}, marking busy", session_id);
                state.begin_turn(text);
                status_changed = true;
            }
            StatusHint::Set(text) => {
                if state.status.as_deref() != Some(text.as_str()) {
                    state.status = Some(text);
                    status_changed = true;
                }
            }
            StatusHint::Clear => status_changed = state.status.take().is_some(),
            StatusHint::Unchanged => {}
        }

        let mut flush = false;
        if turn_ended {
            if state.is_busy() {
                log::info!("Turn ended for session {}", session_id);
                status_changed = true;
                flush = true;
            }
            state.end_turn();
        }

        if let Some(native_id) = native_session_id {
            if state.native_session_id.as_deref() != Some(native_id.as_str()) {
                log::info!("Session {} bound to provider session {}", session_id, native_id);
                state.native_session_id = Some(native_id);
            }
        }

        let title_changed = match &title {
            Some(hint) => state.apply_title(hint),
            None => false,
        };

        if messages_changed {
            self.emit_messages(session_id);
        }
        if status_changed {
            self.emit_status(session_id);
        }
        if title_changed {
            self.emit_title(session_id);
        }
        if let Some(snapshot) = context_usage {
            self.event_bus
                .emit_session(SessionTopic::Usage, session_id.as_str(), &snapshot);
            self.usage.record(session_id, snapshot);
        }

        flush
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Submit user text. Sent right away when the session is idle, queued
    /// otherwise. Blank text is rejected without touching anything.
    pub async fn submit(&mut self, session_id: &SessionId, text: &str) -> Result<SubmitOutcome, EngineError> {
        if text.trim().is_empty() {
            return Err(EngineError::BlankSubmission);
        }

        let state = session_entry(&mut self.sessions, &self.config, session_id);

        if state.is_busy() {
            state.queue.push_back(text.to_string());
            log::debug!("Session {} busy, queued ({} pending)", session_id, state.queue.len());
            self.emit_queue(session_id);
            return Ok(SubmitOutcome::Queued);
        }

        if !state.queue.is_empty() {
            state.queue.push_back(text.to_string());
            self.emit_queue(session_id);
            self.flush_queue(session_id).await;
            return Ok(SubmitOutcome::Queued);
        }

        self.send(session_id, text.to_string()).await?;
        Ok(SubmitOutcome::Sent)
    }

    /// Stop the current turn. Local state goes idle immediately; the
    /// adapter is asked to interrupt but its failures are only logged.
    pub async fn interrupt(&mut self, session_id: &SessionId) {
        if let Some(state) = self.sessions.get_mut(session_id) {
            if state.is_busy() {
                log::info!("Interrupting session {}", session_id);
                state.end_turn();
                self.emit_status(session_id);
            }
        }

        if let Err(e) = self.adapter.interrupt(session_id).await {
            log::warn!("Interrupt failed for session {}: {}", session_id, e);
        }

        self.flush_queue(session_id).await;
    }

    /// Send queued submissions, oldest first, until one goes through.
    /// Items whose send fails are dropped after surfacing an error.
    async fn flush_queue(&mut self, session_id: &SessionId) {
        loop {
            let Some(state) = self.sessions.get_mut(session_id) else {
                return;
            };
            if state.is_busy() {
                return;
            }
            let Some(text) = state.queue.pop_front() else {
                return;
            };
            self.emit_queue(session_id);

            match self.send(session_id, text).await {
                Ok(()) => return,
                Err(e) => log::warn!("Dropped queued submission for {}: {}", session_id, e),
            }
        }
    }

    /// Record the user message, go busy and hand the text to the adapter.
    /// On failure the session returns to idle with an error message.
    async fn send(&mut self, session_id: &SessionId, text: String) -> Result<(), AdapterError> {
        let state = session_entry(&mut self.sessions, &self.config, session_id);
        log_line(&state.log, OUTBOUND, &text);
        state.messages.push(Message::new(
            session_id.as_str(),
            MessageRole::User,
            MessageType::Text,
            text.clone(),
        ));
        state.classifier.reset_turn();
        state.begin_turn(self.config.provisional_status.clone());
        self.emit_messages(session_id);
        self.emit_status(session_id);

        let result = self.adapter.submit(session_id, &text).await;

        if let Err(e) = &result {
            log::warn!("Submission failed for session {}: {}", session_id, e);
            let state = session_entry(&mut self.sessions, &self.config, session_id);
            state.end_turn();
            merge(
                &mut state.messages,
                session_id.as_str(),
                &ParsedUpdate::error(format!("Error: {e}")),
                self.config.dedup_window,
            );
            self.emit_messages(session_id);
            self.emit_status(session_id);
        }

        result
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Make a session known to the engine, loading stored history when a
    /// loader is configured and the session has no messages yet.
    pub async fn activate_session(&mut self, session_id: &SessionId) -> Result<(), EngineError> {
        let needs_history = session_entry(&mut self.sessions, &self.config, session_id)
            .messages
            .is_empty();

        let Some(loader) = self.loader.as_ref().filter(|_| needs_history) else {
            return Ok(());
        };
        let history = loader.load_messages(session_id).await?;
        if history.is_empty() {
            return Ok(());
        }

        log::info!("Loaded {} messages for session {}", history.len(), session_id);
        session_entry(&mut self.sessions, &self.config, session_id).messages = history;
        self.emit_messages(session_id);
        Ok(())
    }

    /// Forget a session entirely.
    pub fn remove_session(&mut self, session_id: &SessionId) -> Option<SessionState> {
        self.usage.clear(session_id);
        self.sessions.remove(session_id)
    }

    // ========================================================================
    // Read accessors
    // ========================================================================

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().cloned().collect()
    }

    pub fn messages(&self, session_id: &SessionId) -> &[Message] {
        self.sessions
            .get(session_id)
            .map(|s| s.messages.as_slice())
            .unwrap_or_default()
    }

    pub fn status(&self, session_id: &SessionId) -> Option<&str> {
        self.sessions.get(session_id)?.status.as_deref()
    }

    pub fn queued_count(&self, session_id: &SessionId) -> usize {
        self.sessions.get(session_id).map_or(0, |s| s.queue.len())
    }

    pub fn turn_started_at(&self, session_id: &SessionId) -> Option<DateTime<Utc>> {
        self.sessions.get(session_id)?.turn_started_at()
    }

    pub fn context_usage(&self, session_id: &SessionId) -> Option<&ContextUsageSnapshot> {
        self.usage.get(session_id)
    }

    pub fn title(&self, session_id: &SessionId) -> Option<&str> {
        self.sessions.get(session_id)?.title.as_deref()
    }

    pub fn native_session_id(&self, session_id: &SessionId) -> Option<&str> {
        self.sessions.get(session_id)?.native_session_id.as_deref()
    }

    pub fn is_busy(&self, session_id: &SessionId) -> bool {
        self.sessions.get(session_id).is_some_and(SessionState::is_busy)
    }

    /// True if any session has a turn in flight.
    pub fn is_any_busy(&self) -> bool {
        self.sessions.values().any(SessionState::is_busy)
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    fn emit_messages(&self, session_id: &SessionId) {
        let messages = self.messages(session_id);
        self.event_bus.emit_session(
            SessionTopic::Messages,
            session_id.as_str(),
            &json!({"count": messages.len(), "last": messages.last()}),
        );
    }

    fn emit_status(&self, session_id: &SessionId) {
        let started_at = self.turn_started_at(session_id).map(|t| t.timestamp_millis());
        self.event_bus.emit_session(
            SessionTopic::Status,
            session_id.as_str(),
            &json!({
                "status": self.status(session_id),
                "busy": self.is_busy(session_id),
                "startedAt": started_at,
            }),
        );
    }

    fn emit_queue(&self, session_id: &SessionId) {
        self.event_bus.emit_session(
            SessionTopic::Queue,
            session_id.as_str(),
            &json!({"queued": self.queued_count(session_id)}),
        );
    }

    fn emit_title(&self, session_id: &SessionId) {
        self.event_bus.emit_session(
            SessionTopic::Title,
            session_id.as_str(),
            &json!({"title": self.title(session_id)}),
        );
    }
}

/// Look up a session, creating it on first sight.
fn session_entry<'a>(
    sessions: &'a mut HashMap<SessionId, SessionState>,
    config: &EngineConfig,
    session_id: &SessionId,
) -> &'a mut SessionState {
    sessions.entry(session_id.clone()).or_insert_with(|| {
        log::debug!("New session {}", session_id);
        let log = open_log_file(config.log_dir.as_deref(), session_id.as_str());
        SessionState::new(session_id.clone(), log)
    })
}

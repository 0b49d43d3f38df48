//! Change notifications for presentation layers.
//!
//! The engine publishes one event per observable state change on a tokio
//! broadcast channel. Topics are `session:<kind>:<session id>`, for example
//! `session:messages:abc123`.
//!
//! # Example
//!
//! ```rust
//! use polycode_core::event_bus::{EventBus, SessionTopic};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.emit_session(SessionTopic::Status, "abc123", &serde_json::json!({"status": "Thinking"}));
//!
//! // let event = rx.recv().await.unwrap();
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default channel capacity. Slow subscribers lag past this many events.
pub const DEFAULT_CAPACITY: usize = 1024;

/// The kinds of per-session change the engine announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionTopic {
    Messages,
    Status,
    Queue,
    Usage,
    Title,
}

impl SessionTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionTopic::Messages => "messages",
            SessionTopic::Status => "status",
            SessionTopic::Queue => "queue",
            SessionTopic::Usage => "usage",
            SessionTopic::Title => "title",
        }
    }

    /// Full topic string for one session.
    pub fn for_session(&self, session_id: &str) -> String {
        format!("session:{}:{}", self.as_str(), session_id)
    }
}

impl fmt::Display for SessionTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A broadcast event: a topic and its JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

impl BroadcastEvent {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }
}

/// Publish-subscribe hub backed by a tokio broadcast channel.
pub struct EventBus {
    sender: broadcast::Sender<BroadcastEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus buffering up to `capacity` events per subscriber.
    /// A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it; with no
    /// subscribers the event is dropped and 0 is returned.
    pub fn emit<T: Serialize>(&self, topic: &str, payload: &T) -> usize {
        let json_payload = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Failed to serialize payload for {}: {}", topic, e);
                return 0;
            }
        };

        self.sender
            .send(BroadcastEvent::new(topic, json_payload))
            .unwrap_or(0)
    }

    /// Emit on a session topic.
    pub fn emit_session<T: Serialize>(&self, topic: SessionTopic, session_id: &str, payload: &T) -> usize {
        self.emit(&topic.for_session(session_id), payload)
    }

    /// Subscribe to all future events. Past events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

//! # polycode-core
//!
//! Provider event normalization and conversation merging for polycode.
//!
//! Coding-agent CLIs each stream their own wire format. This crate turns
//! their raw payloads into one canonical conversation per session and keeps
//! the turn bookkeeping around it.
//!
//! ## Key Concepts
//!
//! - **Classification**: what one raw payload means (updates, status, turn end)
//! - **Merge**: folding updates into a session's append-only message list
//! - **Engine**: per-session busy/idle state, outbound queue, usage, titles
//! - **Adapter**: the boundary to the process actually running the agent

pub mod adapter;
pub mod agents;
pub mod config;
pub mod conversation;
pub mod event_bus;
pub mod logging;
pub mod session;
pub mod usage;

// Re-export commonly used types
pub use adapter::{AdapterError, AgentAdapter, JsonlMessageLoader, LoaderError, MessageLoader};
pub use agents::{classify, Classification, ClassifierState, ParsedUpdate, ProviderTag, StatusHint};
pub use config::{ConfigError, EngineConfig};
pub use conversation::{Message, MessageRole, MessageType};
pub use event_bus::{BroadcastEvent, EventBus, SessionTopic};
pub use session::{Engine, EngineError, SessionId, SubmitOutcome};
pub use usage::ContextUsageSnapshot;

//! Sessions and the engine that drives them.
//!
//! Every piece of state is keyed by [`SessionId`]; sessions never share a
//! queue, a busy flag or a tool-call buffer.

mod engine;
mod state;

pub use engine::{Engine, EngineError, SubmitOutcome};
pub use state::{SessionId, SessionState, TurnState};

//! Codex (JSON-RPC) payload classification.

mod parser;
mod types;

pub use parser::classify;
pub use types::{CodexItem, FileChangeEntry, JsonRpcMessage};

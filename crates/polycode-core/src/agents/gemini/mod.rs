//! Gemini (flat delta/phase) payload classification.

mod parser;
mod types;

pub use parser::{classify, normalize_tool_name, MAX_STATUS_CHARS};
pub use types::GeminiStreamEvent;

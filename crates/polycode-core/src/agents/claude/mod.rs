//! Claude (stream-json) payload classification.

mod buffer;
mod parser;
mod types;

pub use buffer::ToolCallBuffer;
pub use parser::classify;
pub use types::{AssistantMessage, ClaudeStreamEvent, ContentBlock, Delta};

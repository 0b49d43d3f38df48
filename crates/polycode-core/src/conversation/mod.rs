//! Canonical conversation model and the merge policies that grow it.

mod merge;
mod message;

pub use merge::{merge, merge_all, MergeOutcome, DEFAULT_DEDUP_WINDOW};
pub use message::{Message, MessageRole, MessageType};

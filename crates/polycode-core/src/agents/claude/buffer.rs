//! Tool-call argument assembly.
//!
//! Claude streams a tool's arguments as raw JSON text fragments between a
//! `content_block_start` and its `content_block_stop`. The fragments are
//! only valid JSON once concatenated, so they are buffered verbatim here.

use serde_json::{Map, Value};

use crate::agents::event::ParsedUpdate;
use crate::agents::tools::render_tool;

/// A tool call under construction. At most one is live per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallBuffer {
    pub tool_name: String,
    pub partial_args_json: String,
    pub block_index: Option<u64>,
}

impl ToolCallBuffer {
    /// Open a buffer. A fully materialized, non-empty `input` on the start
    /// event seeds the arguments.
    pub fn open(tool_name: impl Into<String>, block_index: Option<u64>, input: Option<&Value>) -> Self {
        let partial_args_json = match input {
            Some(Value::Object(map)) if !map.is_empty() => {
                serde_json::to_string(map).unwrap_or_default()
            }
            _ => String::new(),
        };
        Self {
            tool_name: tool_name.into(),
            partial_args_json,
            block_index,
        }
    }

    /// Append a fragment exactly as received.
    pub fn push(&mut self, fragment: &str) {
        self.partial_args_json.push_str(fragment);
    }

    /// Whether a stop for `index` closes this buffer. A missing index on
    /// either side matches.
    pub fn closes_at(&self, index: Option<u64>) -> bool {
        match (self.block_index, index) {
            (Some(open), Some(stop)) => open == stop,
            _ => true,
        }
    }

    /// Parsed arguments. Malformed or non-object JSON yields an empty object.
    pub fn arguments(&self) -> Value {
        match serde_json::from_str::<Value>(&self.partial_args_json) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                if !self.partial_args_json.trim().is_empty() {
                    log::debug!(
                        "Malformed arguments for tool {}: {}",
                        self.tool_name,
                        err
                    );
                }
                Value::Object(Map::new())
            }
        }
    }

    /// Close the buffer into its single tool entry.
    pub fn finish(self) -> ParsedUpdate {
        let args = self.arguments();
        ParsedUpdate::tool(render_tool(&self.tool_name, &args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fragments_assemble_into_one_entry() {
        let mut buffer = ToolCallBuffer::open("Read", Some(1), Some(&json!({})));
        buffer.push("{\"path\":");
        buffer.push("\"a.txt\"}");

        let update = buffer.finish();
        assert_eq!(update, ParsedUpdate::tool("[Read] a.txt"));
    }

    #[test]
    fn seeded_from_materialized_input() {
        let buffer = ToolCallBuffer::open("Bash", None, Some(&json!({"command": "ls"})));
        assert_eq!(buffer.arguments(), json!({"command": "ls"}));
    }

    #[test]
    fn malformed_json_is_empty_object() {
        let mut buffer = ToolCallBuffer::open("Glob", Some(0), None);
        buffer.push("{\"pattern\": \"*.rs");
        assert_eq!(buffer.arguments(), json!({}));
        assert_eq!(buffer.finish().content, "[Glob]");
    }

    #[test]
    fn non_object_json_is_empty_object() {
        let mut buffer = ToolCallBuffer::open("Glob", Some(0), None);
        buffer.push("[1, 2]");
        assert_eq!(buffer.arguments(), json!({}));
    }

    #[test]
    fn stop_index_matching() {
        let buffer = ToolCallBuffer::open("Read", Some(3), None);
        assert!(buffer.closes_at(Some(3)));
        assert!(!buffer.closes_at(Some(4)));
        assert!(buffer.closes_at(None));

        let unindexed = ToolCallBuffer::open("Read", None, None);
        assert!(unindexed.closes_at(Some(7)));
    }
}

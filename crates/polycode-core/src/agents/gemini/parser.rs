//! Gemini stream classifier.
//!
//! Gemini has no block structure and no streamed tool arguments, so this
//! classifier is stateless. Each payload is inspected for, in order: the
//! native session id, streamed text, one-shot content, and its phase.

use serde::Deserialize;
use serde_json::Value;

use crate::agents::display::{non_blank, truncate_chars};
use crate::agents::event::{Classification, ParsedUpdate};
use crate::agents::tools::render_tool;

use super::types::GeminiStreamEvent;

/// Longest status line taken verbatim from a payload.
pub const MAX_STATUS_CHARS: usize = 120;

/// Classify one Gemini payload.
pub fn classify(payload: &Value) -> Classification {
    let event = match GeminiStreamEvent::deserialize(payload) {
        Ok(event) => event,
        Err(_) => return Classification::empty(),
    };

    let mut classification = Classification::empty();
    classification.native_session_id = non_blank(event.session_id.as_deref()).map(str::to_string);

    let phase = event.phase().unwrap_or("");
    let from_user = event.role.as_deref() == Some("user");

    if let Some(text) = streamed_text(&event).filter(|_| !from_user) {
        classification.updates.push(ParsedUpdate::text_delta(text));
    } else if phase == "message" && event.role.as_deref() == Some("assistant") {
        if let Some(text) = event.content.as_ref().and_then(Value::as_str).filter(|t| !t.trim().is_empty()) {
            classification.updates.push(ParsedUpdate::final_text(text));
        }
    }

    match phase {
        "completed" | "done" | "result" => classification.end_turn(),

        "error" | "failed" => {
            let classification = classification.with_status("Error");
            match event.error_text() {
                Some(text) => classification.with_update(ParsedUpdate::error(format!("Error: {text}"))),
                None => classification,
            }
        }

        "init" => {
            let status = match non_blank(event.model.as_deref()) {
                Some(model) => format!("Initialized ({model})"),
                None => "Initialized".to_string(),
            };
            classification.with_status(status)
        }

        "tool_use" => {
            let name = event
                .tool_name
                .as_deref()
                .map(normalize_tool_name)
                .unwrap_or_else(|| "Tool".to_string());
            let params = event.parameters.clone().unwrap_or(Value::Null);
            classification
                .with_status(format!("Using {name}"))
                .with_update(ParsedUpdate::tool(render_tool(&name, &params)))
        }

        // "success"/"error" here describe the tool, not the session.
        "tool_result" => match event.status.as_deref() {
            Some("error") => match event.error_text() {
                Some(text) => classification.with_update(ParsedUpdate::error(format!("Error: {text}"))),
                None => classification,
            },
            _ => classification.with_status("Thinking"),
        },

        _ => match explicit_status(&event) {
            Some(status) => classification.with_status(truncate_chars(status, MAX_STATUS_CHARS)),
            None => classification,
        },
    }
}

/// A fragment from a string `delta`, or `content` flagged with `delta: true`.
fn streamed_text(event: &GeminiStreamEvent) -> Option<&str> {
    let text = match event.delta.as_ref()? {
        Value::String(text) => Some(text.as_str()),
        Value::Bool(true) => event.content.as_ref().and_then(Value::as_str),
        _ => None,
    };
    text.filter(|text| !text.is_empty())
}

fn explicit_status(event: &GeminiStreamEvent) -> Option<&str> {
    non_blank(event.status.as_deref()).or(non_blank(event.message.as_deref()))
}

/// Map Gemini CLI tool names onto the shared tool vocabulary.
pub fn normalize_tool_name(gemini_name: &str) -> String {
    match gemini_name.to_lowercase().as_str() {
        "shell" | "run_shell_command" => "Bash".to_string(),
        "write_file" => "Write".to_string(),
        "edit_file" | "replace" => "Edit".to_string(),
        "read_file" | "read_many_files" => "Read".to_string(),
        "search" | "grep" | "search_file_content" => "Grep".to_string(),
        "glob" => "Glob".to_string(),
        "fetch" | "web_fetch" => "WebFetch".to_string(),
        "google_web_search" | "web_search" => "WebSearch".to_string(),
        "list_directory" | "ls" => "ListDir".to_string(),
        _ => {
            let mut chars = gemini_name.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
    }
}

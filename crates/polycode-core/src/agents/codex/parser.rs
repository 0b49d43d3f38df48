//! Codex notification classifier.
//!
//! Codex never streams tool arguments; every tool arrives fully formed in an
//! `item/completed` notification. That makes this classifier stateless:
//! each notification maps to a [`Classification`] on its own.
//!
//! ```json
//! {"method": "item/agentMessage/delta", "params": {"delta": "Hel"}}
//! {"method": "item/completed", "params": {"item": {"type": "agentMessage", "text": "Hello"}}}
//! {"method": "turn/completed", "params": {"turn": {"status": "completed"}}}
//! ```

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::agents::display::{
    display_command, format_duration_ms, non_blank, str_field, truncate_chars,
};
use crate::agents::event::{Classification, ParsedUpdate, TitleHint};
use crate::usage::ContextUsageSnapshot;

use super::types::{
    error_message, CodexItem, ErrorParams, FileChangeEntry, Hunk, ItemParams, JsonRpcMessage,
    ThreadNameParams, ThreadStartedParams, TokenUsageParams, TurnParams,
};

/// Characters of a command shown in the "Running ..." status.
const STATUS_COMMAND_CHARS: usize = 60;

/// Lines of an inline diff kept in a file-change entry.
const MAX_DIFF_LINES: usize = 40;

const THINKING: &str = "Thinking";
const WRITING: &str = "Writing response";

/// Classify one Codex JSON-RPC payload.
pub fn classify(payload: &Value) -> Classification {
    let message = match JsonRpcMessage::deserialize(payload) {
        Ok(message) => message,
        Err(_) => return Classification::empty(),
    };

    match message {
        // Replies to requests the adapter sent; nothing conversational.
        JsonRpcMessage::Response(_) => Classification::empty(),

        // Approval prompts are answered by the adapter.
        JsonRpcMessage::ServerRequest(request) => {
            log::debug!("codex: server request {} left to the adapter", request.method);
            Classification::empty()
        }

        JsonRpcMessage::Notification(notification) => {
            let params = notification.params.unwrap_or(Value::Null);
            classify_notification(&notification.method, &params)
        }
    }
}

fn classify_notification(method: &str, params: &Value) -> Classification {
    match method {
        "item/agentMessage/delta" => match delta(params) {
            Some(text) => Classification::status(WRITING).with_update(ParsedUpdate::text_delta(text)),
            None => Classification::status(WRITING),
        },

        "item/reasoning/summaryTextDelta" | "item/reasoning/textDelta" => match delta(params) {
            Some(text) => {
                Classification::status(THINKING).with_update(ParsedUpdate::reasoning_delta(text))
            }
            None => Classification::status(THINKING),
        },

        "item/completed" => match ItemParams::deserialize(params) {
            Ok(ItemParams { item }) => completed_item(&item),
            Err(_) => Classification::empty(),
        },

        "turn/started" => Classification::status(THINKING),

        "turn/completed" => {
            let turn: TurnParams = params_or_default(params);
            let failed = turn
                .turn
                .as_ref()
                .and_then(|t| t.status.as_deref())
                .is_some_and(|status| status == "failed");
            let ended = Classification::empty().end_turn();
            if failed {
                ended.with_update(ParsedUpdate::error(turn_error_text(&turn)))
            } else {
                ended
            }
        }

        "turn/failed" => {
            let turn: TurnParams = params_or_default(params);
            Classification::empty()
                .end_turn()
                .with_update(ParsedUpdate::error(turn_error_text(&turn)))
        }

        "error" => {
            let error: ErrorParams = params_or_default(params);
            let text = error
                .error
                .as_ref()
                .and_then(error_message)
                .or_else(|| non_blank(error.message.as_deref()).map(str::to_string))
                .unwrap_or_else(|| "unknown error".to_string());
            let update = ParsedUpdate::error(format!("Error: {text}"));
            if error.will_retry {
                Classification::status("Retrying").with_update(update)
            } else {
                Classification::empty().end_turn().with_update(update)
            }
        }

        "thread/tokenUsage/updated" => token_usage(params),

        "thread/started" => {
            let started: ThreadStartedParams = params_or_default(params);
            let thread_id = started
                .thread
                .and_then(|thread| thread.id)
                .or(started.thread_id)
                .filter(|id| !id.is_empty());
            Classification {
                native_session_id: thread_id,
                ..Classification::default()
            }
        }

        "thread/name/updated" => {
            let renamed: ThreadNameParams = params_or_default(params);
            Classification {
                title: non_blank(renamed.name.as_deref())
                    .map(|name| TitleHint::Rename(name.to_string())),
                ..Classification::default()
            }
        }

        m if m.starts_with("item/") => in_progress(m, params),

        _ => Classification::empty(),
    }
}

fn params_or_default<T: DeserializeOwned + Default>(params: &Value) -> T {
    T::deserialize(params).unwrap_or_default()
}

fn delta(params: &Value) -> Option<&str> {
    params
        .get("delta")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

fn turn_error_text(params: &TurnParams) -> String {
    let message = params
        .turn
        .as_ref()
        .and_then(|turn| turn.error.as_ref())
        .or(params.error.as_ref())
        .and_then(error_message)
        .unwrap_or_else(|| "turn failed".to_string());
    format!("Error: {message}")
}

// ============================================================================
// COMPLETED ITEMS
// ============================================================================

fn completed_item(item: &CodexItem) -> Classification {
    let classification = completed_item_entry(item);
    match item.error.as_ref().and_then(error_message) {
        Some(message) => classification.with_update(ParsedUpdate::error(format!("Error: {message}"))),
        None => classification,
    }
}

fn completed_item_entry(item: &CodexItem) -> Classification {
    match item.item_type.as_str() {
        "agentMessage" => match item.text.as_deref().filter(|text| !text.trim().is_empty()) {
            Some(text) => Classification::empty().with_update(ParsedUpdate::final_text(text)),
            None => Classification::empty(),
        },
        "commandExecution" => {
            Classification::status(THINKING).with_update(ParsedUpdate::tool(render_command(item)))
        }
        "fileChange" => {
            Classification::status(THINKING).with_update(ParsedUpdate::tool(render_file_change(item)))
        }
        "mcpToolCall" => {
            Classification::status(THINKING).with_update(ParsedUpdate::tool(render_mcp_call(item)))
        }
        _ => Classification::status(THINKING),
    }
}

fn render_command(item: &CodexItem) -> String {
    let command = item.command.as_ref().map(display_command).unwrap_or_default();

    let mut details = Vec::new();
    match (item.exit_code, non_blank(item.status.as_deref())) {
        (Some(code), _) => details.push(format!("exit {code}")),
        (None, Some(status)) => details.push(status.to_string()),
        (None, None) => {}
    }
    if let Some(ms) = item.duration_ms {
        details.push(format_duration_ms(ms));
    }

    let head = format!("[Bash] {command}").trim_end().to_string();
    if details.is_empty() {
        head
    } else {
        format!("{head} ({})", details.join(", "))
    }
}

/// `[Edit]` followed by per-file counts, an inline diff, or rendered hunks,
/// whichever is the richest thing the item carries.
fn render_file_change(item: &CodexItem) -> String {
    let changes = item.file_changes();

    let counted = !changes.is_empty()
        && changes
            .iter()
            .all(|change| change.added.is_some() || change.removed.is_some());
    if counted {
        let mut out = String::from("[Edit]");
        for change in &changes {
            out.push_str(&format!(
                "\n{} (+{} -{})",
                change.path,
                change.added.unwrap_or(0),
                change.removed.unwrap_or(0)
            ));
        }
        return out;
    }

    let mut paths: Vec<&str> = changes
        .iter()
        .map(|change| change.path.as_str())
        .filter(|path| !path.is_empty())
        .collect();
    if paths.is_empty() {
        paths.extend(item.file_path.as_deref());
    }
    let header = format!("[Edit] {}", paths.join(", ")).trim_end().to_string();

    if let Some(diff) = inline_diff(item, &changes) {
        return format!("{header}\n{}", cap_lines(&diff, MAX_DIFF_LINES));
    }

    let hunk_lines: Vec<String> = changes
        .iter()
        .flat_map(|change| change.hunks.iter())
        .flat_map(render_hunk)
        .collect();
    if hunk_lines.is_empty() {
        header
    } else {
        format!("{header}\n{}", cap_lines(&hunk_lines.join("\n"), MAX_DIFF_LINES))
    }
}

fn inline_diff(item: &CodexItem, changes: &[FileChangeEntry]) -> Option<String> {
    if let Some(diff) = non_blank(item.diff.as_deref()).or(non_blank(item.preview.as_deref())) {
        return Some(diff.to_string());
    }
    let diffs: Vec<&str> = changes
        .iter()
        .filter_map(|change| non_blank(change.diff.as_deref()))
        .collect();
    (!diffs.is_empty()).then(|| diffs.join("\n"))
}

fn render_hunk(hunk: &Hunk) -> Vec<String> {
    hunk.header
        .iter()
        .cloned()
        .chain(hunk.lines.iter().filter_map(render_hunk_line))
        .collect()
}

/// Prefix a hunk line with `+`, `-` or a space.
///
/// The sign comes from an explicit `sign` field, else a type tag, else the
/// line's own leading character.
fn render_hunk_line(line: &Value) -> Option<String> {
    match line {
        Value::String(text) => Some(shape_signed(text)),
        Value::Object(_) => {
            let text = str_field(line, &["content", "text", "line"]).unwrap_or("");
            let sign = str_field(line, &["sign", "prefix"])
                .and_then(|sign| sign.chars().next())
                .or_else(|| str_field(line, &["type", "kind", "op"]).and_then(sign_for_tag));
            match sign {
                Some(sign) => Some(format!("{sign}{text}")),
                None => Some(shape_signed(text)),
            }
        }
        _ => None,
    }
}

fn sign_for_tag(tag: &str) -> Option<char> {
    match tag.to_ascii_lowercase().as_str() {
        "add" | "added" | "addition" | "insert" | "inserted" => Some('+'),
        "del" | "delete" | "deleted" | "deletion" | "remove" | "removed" => Some('-'),
        "context" | "unchanged" | "equal" | "normal" => Some(' '),
        _ => None,
    }
}

fn shape_signed(text: &str) -> String {
    if text.starts_with(['+', '-', ' ']) {
        text.to_string()
    } else {
        format!(" {text}")
    }
}

fn cap_lines(text: &str, max: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max {
        return lines.join("\n");
    }
    format!(
        "{}\n… ({} more lines)",
        lines[..max].join("\n"),
        lines.len() - max
    )
}

fn render_mcp_call(item: &CodexItem) -> String {
    let target = match (non_blank(item.server.as_deref()), non_blank(item.tool.as_deref())) {
        (Some(server), Some(tool)) => format!("{server}/{tool}"),
        (None, Some(tool)) => tool.to_string(),
        (Some(server), None) => server.to_string(),
        (None, None) => "tool".to_string(),
    };
    match non_blank(item.status.as_deref()) {
        Some(status) => format!("[MCP] {target} ({status})"),
        None => format!("[MCP] {target}"),
    }
}

// ============================================================================
// IN-PROGRESS SIGNALS
// ============================================================================

/// Status for `item/started`, `item/updated` and other `item/*` progress
/// notifications.
fn in_progress(method: &str, params: &Value) -> Classification {
    if let Some(text) = explicit_status(method, params) {
        return Classification::status(text);
    }

    let item = params
        .get("item")
        .and_then(|item| CodexItem::deserialize(item).ok());
    let item_type = item
        .as_ref()
        .map(|item| item.item_type.as_str())
        .filter(|t| !t.is_empty())
        .or_else(|| method.split('/').nth(1))
        .unwrap_or("");

    let status = match item_type {
        "commandExecution" => {
            let command = item
                .as_ref()
                .and_then(|item| item.command.as_ref())
                .map(display_command)
                .filter(|command| !command.is_empty());
            match command {
                Some(command) => format!("Running {}", truncate_chars(&command, STATUS_COMMAND_CHARS)),
                None => "Running command".to_string(),
            }
        }
        "fileChange" => "Editing files".to_string(),
        "mcpToolCall" => {
            let server = item.as_ref().and_then(|item| non_blank(item.server.as_deref()));
            let tool = item.as_ref().and_then(|item| non_blank(item.tool.as_deref()));
            match (server, tool) {
                (Some(server), Some(tool)) => format!("Using {server}/{tool}"),
                (None, Some(tool)) => format!("Using {tool}"),
                _ => "Using tool".to_string(),
            }
        }
        "agentMessage" => WRITING.to_string(),
        _ => THINKING.to_string(),
    };
    Classification::status(status)
}

fn explicit_status<'a>(method: &str, params: &'a Value) -> Option<&'a str> {
    non_blank(str_field(params, &["statusText", "status_text"])).or_else(|| {
        method
            .ends_with("/progress")
            .then(|| non_blank(str_field(params, &["message"])))
            .flatten()
    })
}

fn token_usage(params: &Value) -> Classification {
    let usage = TokenUsageParams::deserialize(params)
        .ok()
        .and_then(|params| params.usage);
    let Some(usage) = usage else {
        return Classification::empty();
    };
    let Some(total) = usage.total else {
        return Classification::empty();
    };

    Classification {
        context_usage: Some(ContextUsageSnapshot::from_breakdowns(
            &total,
            usage.last.as_ref(),
            usage.model_context_window,
        )),
        ..Classification::default()
    }
}

//! Human summaries of tool invocations.
//!
//! Providers name tools differently; callers normalize the name first (see
//! `gemini::normalize_tool_name`), then [`render_tool`] picks a renderer by
//! [`ToolKind`].

use serde_json::Value;

use super::display::{compact_json, display_command, str_field, truncate_chars};

/// Lines shown per side of an edit before eliding the rest.
const MAX_EDIT_LINES: usize = 20;

/// Characters of compact JSON shown for tools without a bespoke renderer.
const MAX_FALLBACK_ARGS: usize = 200;

const PATH_KEYS: &[&str] = &["file_path", "path", "filePath", "absolute_path", "notebook_path"];

/// Broad families of tools that share a rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Read,
    Edit,
    Write,
    Shell,
    Search,
    Fetch,
    SubTask,
    Other,
}

impl ToolKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Read" | "NotebookRead" => ToolKind::Read,
            "Edit" | "MultiEdit" | "NotebookEdit" | "Replace" => ToolKind::Edit,
            "Write" => ToolKind::Write,
            "Bash" | "Shell" => ToolKind::Shell,
            "Grep" | "Glob" | "Search" | "ListDir" | "LS" => ToolKind::Search,
            "WebFetch" | "WebSearch" => ToolKind::Fetch,
            "Task" | "Agent" => ToolKind::SubTask,
            _ => ToolKind::Other,
        }
    }
}

/// Render `[Name] ...` for a tool call with parsed arguments.
pub fn render_tool(name: &str, input: &Value) -> String {
    match ToolKind::from_name(name) {
        ToolKind::Read => render_read(name, input),
        ToolKind::Edit => render_edit(name, input),
        ToolKind::Write => render_write(name, input),
        ToolKind::Shell => render_shell(name, input),
        ToolKind::Search => render_search(name, input),
        ToolKind::Fetch => render_fetch(name, input),
        ToolKind::SubTask => render_subtask(name, input),
        ToolKind::Other => render_other(name, input),
    }
}

fn render_read(name: &str, input: &Value) -> String {
    let Some(path) = str_field(input, PATH_KEYS) else {
        return render_other(name, input);
    };
    let offset = input.get("offset").and_then(Value::as_u64);
    let limit = input.get("limit").and_then(Value::as_u64);
    match (offset, limit) {
        (Some(start), Some(count)) => format!("[{name}] {path} (lines {start}-{})", start.saturating_add(count)),
        (None, Some(count)) => format!("[{name}] {path} (first {count} lines)"),
        _ => format!("[{name}] {path}"),
    }
}

fn render_edit(name: &str, input: &Value) -> String {
    let path = str_field(input, PATH_KEYS).unwrap_or("");
    let mut out = format!("[{name}] {path}").trim_end().to_string();

    let pairs: Vec<(&str, &str)> = match input.get("edits").and_then(Value::as_array) {
        Some(edits) => edits.iter().map(edit_pair).collect(),
        None => vec![edit_pair(input)],
    };

    for (old, new) in pairs {
        push_prefixed(&mut out, "- ", old);
        push_prefixed(&mut out, "+ ", new);
    }
    out
}

fn edit_pair(value: &Value) -> (&str, &str) {
    (
        str_field(value, &["old_string", "oldString", "old_str"]).unwrap_or(""),
        str_field(value, &["new_string", "newString", "new_str"]).unwrap_or(""),
    )
}

fn push_prefixed(out: &mut String, prefix: &str, text: &str) {
    if text.is_empty() {
        return;
    }
    let lines: Vec<&str> = text.lines().collect();
    for line in lines.iter().take(MAX_EDIT_LINES) {
        out.push('\n');
        out.push_str(prefix);
        out.push_str(line);
    }
    if lines.len() > MAX_EDIT_LINES {
        out.push_str(&format!(
            "\n{prefix}… ({} more lines)",
            lines.len() - MAX_EDIT_LINES
        ));
    }
}

fn render_write(name: &str, input: &Value) -> String {
    let Some(path) = str_field(input, PATH_KEYS) else {
        return render_other(name, input);
    };
    match str_field(input, &["content"]) {
        Some(content) => format!("[{name}] {path} ({} lines)", content.lines().count()),
        None => format!("[{name}] {path}"),
    }
}

fn render_shell(name: &str, input: &Value) -> String {
    match input.get("command") {
        Some(command) => {
            let command = display_command(command);
            format!("[{name}] {command}")
        }
        None => render_other(name, input),
    }
}

fn render_search(name: &str, input: &Value) -> String {
    let pattern = str_field(input, &["pattern", "query", "regex"]);
    let path = str_field(input, PATH_KEYS).or_else(|| str_field(input, &["dir_path", "directory"]));
    match (pattern, path) {
        (Some(pattern), Some(path)) => format!("[{name}] {pattern} in {path}"),
        (Some(pattern), None) => format!("[{name}] {pattern}"),
        (None, Some(path)) => format!("[{name}] {path}"),
        (None, None) => render_other(name, input),
    }
}

fn render_fetch(name: &str, input: &Value) -> String {
    match str_field(input, &["url", "query", "prompt"]) {
        Some(target) => format!("[{name}] {}", truncate_chars(target, 120)),
        None => render_other(name, input),
    }
}

fn render_subtask(name: &str, input: &Value) -> String {
    match str_field(input, &["description", "prompt"]) {
        Some(description) => format!("[{name}] {}", truncate_chars(description, 120)),
        None => render_other(name, input),
    }
}

fn render_other(name: &str, input: &Value) -> String {
    let empty = match input {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        format!("[{name}]")
    } else {
        format!("[{name}] {}", compact_json(input, MAX_FALLBACK_ARGS))
    }
}

//! Text helpers shared by the provider classifiers.
//!
//! Everything here produces short, human-facing strings: command lines with
//! shell wrappers peeled off, truncated status phrases, compact JSON.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Shells whose `-c` wrappers are unwrapped for display.
const WRAPPER_SHELLS: &[&str] = &["bash", "sh", "zsh", "dash"];

/// A shell flag cluster that ends in (or contains) `c`: `-c`, `-lc`, `-ic`.
static COMMAND_FLAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-[a-z]*c[a-z]*$").expect("valid regex"));

/// Truncate to at most `max` characters, appending `…` when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}…", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// First non-blank line, trimmed.
pub fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

/// Render a command that may be a string or an argv array.
///
/// `bash -lc '<inner>'` style wrappers are reduced to `<inner>`.
pub fn display_command(command: &Value) -> String {
    match command {
        Value::String(s) => unwrap_shell_wrapper(s),
        Value::Array(parts) => {
            let argv: Vec<&str> = parts.iter().filter_map(Value::as_str).collect();
            if let Some(inner) = wrapped_inner(&argv) {
                return inner.trim().to_string();
            }
            shlex::try_join(argv.iter().copied()).unwrap_or_else(|_| argv.join(" "))
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Peel a `<shell> -c '<inner>'` wrapper off a command line.
pub fn unwrap_shell_wrapper(command: &str) -> String {
    let trimmed = command.trim();
    let Some(argv) = shlex::split(trimmed) else {
        return trimmed.to_string();
    };
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    match wrapped_inner(&argv) {
        Some(inner) => inner.trim().to_string(),
        None => trimmed.to_string(),
    }
}

fn wrapped_inner<'a>(argv: &[&'a str]) -> Option<&'a str> {
    let [shell, flag, inner] = argv else {
        return None;
    };
    let basename = Path::new(shell).file_name()?.to_str()?;
    if WRAPPER_SHELLS.contains(&basename) && COMMAND_FLAG.is_match(flag) {
        Some(inner)
    } else {
        None
    }
}

/// Single-line JSON, truncated to `max` characters.
pub fn compact_json(value: &Value, max: usize) -> String {
    let rendered = serde_json::to_string(value).unwrap_or_default();
    truncate_chars(&rendered, max)
}

/// `1.2s` for durations of a second or more, `340ms` otherwise.
pub fn format_duration_ms(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{ms}ms")
    }
}

/// First string-valued field among `keys`.
pub fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
}

/// Non-blank trimmed string, or `None`.
pub fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|s| !s.is_empty())
}

//! Raw per-session event logs.
//!
//! When a log directory is configured, every provider payload and outbound
//! submission is appended to `{log_dir}/{session_id}.log` as
//! `[timestamp] DIRECTION: data`.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::Utc;

/// Shared handle to an append-only log file. `None` inside means logging is off.
pub type LogHandle = Arc<Mutex<Option<File>>>;

/// Provider payload received.
pub const INBOUND: &str = "IN";
/// Submission sent to the adapter.
pub const OUTBOUND: &str = "OUT";

/// Current UTC time as ISO 8601 with milliseconds (2026-02-04T10:15:30.123Z).
fn utc_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Append a timestamped line, if the handle holds a file.
pub fn log_line(handle: &LogHandle, direction: &str, data: &str) {
    if let Ok(mut guard) = handle.lock() {
        if let Some(ref mut file) = *guard {
            let _ = writeln!(file, "[{}] {}: {}", utc_timestamp(), direction, data);
            let _ = file.flush();
        }
    }
}

/// True if `name` can be used as a file stem inside a directory without
/// naming anything outside it.
pub(crate) fn is_safe_file_stem(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}

/// Open (or create) `{log_dir}/{session_id}.log`.
///
/// With no directory, an id that is not a plain file stem, or when the file
/// cannot be opened, the handle is empty and [`log_line`] does nothing.
pub fn open_log_file(log_dir: Option<&Path>, session_id: &str) -> LogHandle {
    let file = log_dir.and_then(|dir| {
        if !is_safe_file_stem(session_id) {
            log::warn!("Not logging session {:?}: id is not a plain file name", session_id);
            return None;
        }
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::warn!("Cannot create log dir {}: {}", dir.display(), e);
            return None;
        }
        let path = dir.join(format!("{}.log", session_id));
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                log::warn!("Cannot open log file {}: {}", path.display(), e);
                None
            }
        }
    });
    Arc::new(Mutex::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn utc_timestamp_format() {
        let ts = utc_timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), 24);
        assert_eq!(&ts[10..11], "T");
        assert_eq!(&ts[19..20], ".");
    }

    #[test]
    fn open_log_file_creates_nested_dir() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("logs");

        let handle = open_log_file(Some(&log_dir), "s1");
        assert!(handle.lock().unwrap().is_some());
        assert!(log_dir.join("s1.log").exists());
    }

    #[test]
    fn open_log_file_without_dir_is_disabled() {
        let handle = open_log_file(None, "s1");
        assert!(handle.lock().unwrap().is_none());
        log_line(&handle, INBOUND, "ignored");
    }

    #[test]
    fn unsafe_session_ids_are_not_logged() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("logs");

        for id in ["../escape", "a/b", "..\\up", "..", ""] {
            let handle = open_log_file(Some(&log_dir), id);
            assert!(handle.lock().unwrap().is_none(), "{id:?}");
            log_line(&handle, INBOUND, "ignored");
        }

        assert!(!dir.path().join("escape.log").exists());
        assert!(!log_dir.exists());
    }

    #[test]
    fn safe_file_stems() {
        assert!(is_safe_file_stem("s1"));
        assert!(is_safe_file_stem("thread-7f3a.v2"));
        assert!(!is_safe_file_stem("../x"));
        assert!(!is_safe_file_stem("/etc/passwd"));
        assert!(!is_safe_file_stem("a\\b"));
        assert!(!is_safe_file_stem("."));
    }

    #[test]
    fn log_line_appends() {
        let dir = tempdir().unwrap();
        let handle = open_log_file(Some(dir.path()), "s1");
        log_line(&handle, INBOUND, r#"{"delta":"Hi"}"#);
        log_line(&handle, OUTBOUND, "hello");

        let contents = std::fs::read_to_string(dir.path().join("s1.log")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with(r#"] IN: {"delta":"Hi"}"#));
        assert!(lines[1].ends_with("] OUT: hello"));
    }
}

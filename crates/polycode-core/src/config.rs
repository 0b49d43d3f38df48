//! Engine configuration.
//!
//! Read from a JSON file with camelCase keys. Every field has a default, so
//! `{}` and a missing file both give [`EngineConfig::default`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::conversation::DEFAULT_DEDUP_WINDOW;
use crate::event_bus;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Trailing messages checked for duplicate tool/error entries.
    pub dedup_window: usize,

    /// Status shown from submission until the provider reports its own.
    pub provisional_status: String,

    /// Directory for raw per-session event logs; off when unset.
    pub log_dir: Option<PathBuf>,

    pub event_bus_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dedup_window: DEFAULT_DEDUP_WINDOW,
            provisional_status: "Thinking".to_string(),
            log_dir: None,
            event_bus_capacity: event_bus::DEFAULT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Load from `path`. Returns defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.dedup_window, 8);
        assert_eq!(config.provisional_status, "Thinking");
        assert!(config.log_dir.is_none());
        assert_eq!(config.event_bus_capacity, 1024);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("polycode.json");
        fs::write(&path, r#"{"dedupWindow": 3, "logDir": "/tmp/logs"}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.dedup_window, 3);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.provisional_status, "Thinking");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("polycode.json");
        fs::write(&path, "{not json").unwrap();

        let err = EngineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}

//! Configuration types for daybook.
//!
//! This module defines the configuration schema (assistant model command,
//! calendar sync window, optional scroll tuning) and the on-disk layout of
//! the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::window::ScrollTuning;

/// Main configuration for daybook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Language model used by the assistant.
    #[serde(default)]
    pub assistant: ModelConfig,

    /// External calendar sync options.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Override for the timeline scroll thresholds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<ScrollTuning>,
}

/// Configuration for the assistant's model command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name (e.g., "claude").
    pub name: String,

    /// Command and arguments to invoke the model. The prompt is written to stdin.
    pub command_argv: Vec<String>,

    /// Timeout in seconds for model invocation.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::default_for("claude")
    }
}

impl ModelConfig {
    /// Create a default configuration for a known model CLI.
    pub fn default_for(name: &str) -> Self {
        let command_argv = match name {
            "claude" => vec![
                "claude".into(),
                "-p".into(),
                "--output-format".into(),
                "text".into(),
            ],
            "codex" => vec!["codex".into(), "exec".into(), "-".into()],
            "gemini" => vec!["gemini".into()],
            _ => vec![name.into()],
        };

        Self {
            name: name.into(),
            command_argv,
            timeout_seconds: default_timeout(),
        }
    }
}

/// External calendar sync options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Days of history fetched from the external calendar.
    #[serde(default = "default_days_back")]
    pub days_back: i64,

    /// Days of future events fetched from the external calendar.
    #[serde(default = "default_days_forward")]
    pub days_forward: i64,

    /// Environment variable holding the OAuth access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Sync automatically when the TUI starts and a calendar is connected.
    #[serde(default = "default_auto_sync")]
    pub auto_sync: bool,
}

fn default_days_back() -> i64 {
    30
}

fn default_days_forward() -> i64 {
    90
}

fn default_token_env() -> String {
    "DAYBOOK_GOOGLE_TOKEN".into()
}

fn default_auto_sync() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            days_back: default_days_back(),
            days_forward: default_days_forward(),
            token_env: default_token_env(),
            auto_sync: default_auto_sync(),
        }
    }
}

impl SyncConfig {
    /// Read the access token from the configured environment variable.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Load configuration, using defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        std::fs::write(path, content).map_err(ConfigError::Io)
    }
}

/// Files inside the daybook data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform data directory (`~/.local/share/daybook` on Linux).
    pub fn platform_default() -> Result<Self, ConfigError> {
        dirs::data_dir()
            .map(|dir| Self::new(dir.join("daybook")))
            .ok_or(ConfigError::NoDataDir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn settings(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn events(&self) -> PathBuf {
        self.root.join("events.json")
    }

    pub fn log(&self) -> PathBuf {
        self.root.join("daybook.log")
    }
}

/// Errors that can occur when working with configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading or writing config.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing config JSON.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Error serializing config to JSON.
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),

    /// No platform data directory could be determined.
    #[error("Could not determine a data directory; pass --data-dir")]
    NoDataDir,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.assistant.name, "claude");
        assert_eq!(config.sync.days_back, 30);
        assert_eq!(config.sync.days_forward, 90);
        assert!(config.sync.auto_sync);
        assert!(config.timeline.is_none());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.sync.token_env, "DAYBOOK_GOOGLE_TOKEN");
        assert_eq!(config.assistant.timeout_seconds, 120);
    }

    #[test]
    fn test_partial_tuning_override() {
        let config: Config = serde_json::from_str(r#"{"timeline": {"near_top": 5}}"#).unwrap();
        let tuning = config.timeline.unwrap();
        assert_eq!(tuning.near_top, 5);
        assert_eq!(tuning.near_bottom, ScrollTuning::pixels().near_bottom);
    }

    #[test]
    fn test_config_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.assistant = ModelConfig::default_for("gemini");
        config.sync.days_forward = 14;

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.assistant.command_argv, vec!["gemini".to_string()]);
        assert_eq!(loaded.sync.days_forward, 14);
    }

    #[test]
    fn test_load_or_default_missing() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_or_default(&temp.path().join("config.json")).unwrap();
        assert_eq!(config.assistant.name, "claude");
    }

    #[test]
    fn test_data_paths() {
        let paths = DataPaths::new("/tmp/daybook");
        assert_eq!(paths.events(), PathBuf::from("/tmp/daybook/events.json"));
        assert_eq!(paths.settings(), PathBuf::from("/tmp/daybook/settings.json"));
    }
}

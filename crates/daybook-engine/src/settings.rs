//! User settings flags persisted between sessions.
//!
//! Settings never fail to load: a missing or corrupt file yields the
//! defaults (dark theme, not connected, tour incomplete).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ConfigError;
use crate::store::atomic_write;

/// Color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

/// Persisted UI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub theme: ThemeMode,

    /// Whether an external calendar is connected.
    #[serde(default)]
    pub calendar_connected: bool,

    /// Whether the first-run tour has been dismissed.
    #[serde(default)]
    pub tour_completed: bool,
}

impl Settings {
    /// Load settings, falling back to defaults on any problem.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)
            .and_then(|content| serde_json::from_str(&content).map_err(ConfigError::Parse));

        match parsed {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        atomic_write(path, content.as_bytes())?;
        Ok(())
    }
}

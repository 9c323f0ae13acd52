//! Event store with file persistence.
//!
//! The store is a flat list of events. It is persisted as a single
//! schema-versioned JSON document written atomically.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::event::CalendarEvent;

/// Current schema version for the events file.
const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Error type for store persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid events file: {0}")]
    InvalidData(String),

    #[error("Unsupported schema version: {0} (max supported: {1})")]
    UnsupportedSchema(u32, u32),
}

/// On-disk format with schema versioning.
#[derive(Debug, Serialize, Deserialize)]
struct EventsFile {
    schema_version: u32,
    events: Vec<CalendarEvent>,
}

/// Flat, in-memory list of events.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Vec<CalendarEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing events, normalizing each.
    pub fn from_events(events: Vec<CalendarEvent>) -> Self {
        let mut store = Self::new();
        for event in events {
            store.add(event);
        }
        store
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CalendarEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Add an event. Empty ids are replaced with a fresh UUID.
    ///
    /// Returns the id of the stored event.
    pub fn add(&mut self, mut event: CalendarEvent) -> String {
        if event.id.is_empty() {
            event.id = uuid::Uuid::new_v4().to_string();
        }
        if event.normalize() {
            debug!(event_id = %event.id, "Corrected event ending before its start");
        }
        let id = event.id.clone();
        self.events.push(event);
        id
    }

    /// Replace the event with the same id in place.
    ///
    /// Returns `false` if no such event exists.
    pub fn update(&mut self, mut event: CalendarEvent) -> bool {
        event.normalize();
        match self.events.iter_mut().find(|e| e.id == event.id) {
            Some(slot) => {
                *slot = event;
                true
            }
            None => false,
        }
    }

    /// Remove an event by id. Returns the removed event.
    pub fn remove(&mut self, id: &str) -> Option<CalendarEvent> {
        let idx = self.events.iter().position(|e| e.id == id)?;
        Some(self.events.remove(idx))
    }

    /// Remove every event mirrored from `source`. Returns how many were removed.
    pub fn remove_by_source(&mut self, source: &str) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.source.as_deref() != Some(source));
        before - self.events.len()
    }

    /// Append externally fetched events whose ids are not already present.
    ///
    /// Returns the number of events appended.
    pub fn merge_external(&mut self, incoming: Vec<CalendarEvent>) -> usize {
        let mut added = 0;
        for event in incoming {
            if self.get(&event.id).is_some() {
                continue;
            }
            self.add(event);
            added += 1;
        }
        added
    }

    /// Load a store from `path`. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;

        let raw: serde_json::Value = serde_json::from_str(&content)?;
        let version_u64 = raw
            .get("schema_version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| StoreError::InvalidData("missing schema_version".to_string()))?;
        let version = u32::try_from(version_u64)
            .map_err(|_| StoreError::InvalidData("schema_version too large".to_string()))?;

        if version > CURRENT_SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema(version, CURRENT_SCHEMA_VERSION));
        }

        let file: EventsFile = serde_json::from_value(raw)?;
        Ok(Self::from_events(file.events))
    }

    /// Load a store, falling back to an empty one if the file is unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(store) => store,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable events file");
                Self::new()
            }
        }
    }

    /// Save the store to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = EventsFile {
            schema_version: CURRENT_SCHEMA_VERSION,
            events: self.events.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        atomic_write(path, json.as_bytes())?;
        Ok(())
    }
}

/// Write content atomically using temp file + fsync + rename.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let pid = std::process::id();

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let tmp_path = path.with_file_name(format!("{file_name}.{timestamp}.{pid}.tmp"));

    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    fn at(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, h, 0, 0).unwrap()
    }

    fn event(id: &str, day: u32) -> CalendarEvent {
        let mut e = CalendarEvent::new(format!("Event {id}"), at(day, 9), at(day, 10));
        e.id = id.to_string();
        e
    }

    #[test]
    fn test_add_assigns_missing_id_and_normalizes() {
        let mut store = EventStore::new();
        let mut e = event("", 1);
        e.end = e.start;
        let id = store.add(e);

        assert!(!id.is_empty());
        let stored = store.get(&id).unwrap();
        assert!(stored.end > stored.start);
    }

    #[test]
    fn test_update_and_remove() {
        let mut store = EventStore::from_events(vec![event("a", 1), event("b", 2)]);

        let mut changed = event("a", 3);
        changed.title = "Moved".into();
        assert!(store.update(changed));
        assert_eq!(store.get("a").unwrap().title, "Moved");
        assert!(!store.update(event("missing", 1)));

        assert!(store.remove("b").is_some());
        assert!(store.remove("b").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_by_source_only_touches_that_source() {
        let mut store = EventStore::from_events(vec![
            event("local", 1),
            event("g1", 1).with_source("google"),
            event("g2", 2).with_source("google"),
            event("o1", 2).with_source("outlook"),
        ]);

        assert_eq!(store.remove_by_source("google"), 2);
        let ids: Vec<_> = store.events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["local", "o1"]);
    }

    #[test]
    fn test_merge_external_skips_known_ids() {
        let mut store = EventStore::from_events(vec![event("google:1", 1).with_source("google")]);
        let added = store.merge_external(vec![
            event("google:1", 1).with_source("google"),
            event("google:2", 2).with_source("google"),
        ]);
        assert_eq!(added, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("events.json");
        let store = EventStore::from_events(vec![event("a", 1), event("b", 2).with_source("google")]);

        store.save(&path).unwrap();
        let loaded = EventStore::load(&path).unwrap();
        assert_eq!(loaded.events(), store.events());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = EventStore::load(&temp.path().join("nope.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_rejects_newer_schema() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("events.json");
        fs::write(&path, r#"{"schema_version": 99, "events": []}"#).unwrap();

        let err = EventStore::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedSchema(99, 1)));
    }

    #[test]
    fn test_load_or_default_recovers_from_corruption() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("events.json");
        fs::write(&path, "{not json").unwrap();

        assert!(EventStore::load(&path).is_err());
        assert!(EventStore::load_or_default(&path).is_empty());
    }
}

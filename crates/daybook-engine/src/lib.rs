//! daybook-engine: Headless core for the daybook calendar
//!
//! This crate provides everything below the terminal UI, including:
//! - The event model, day bucketing and the persisted event store
//! - The timeline window controller (bidirectional day loading with
//!   scroll-anchor preservation and rapid-scroll suppression)
//! - Month grid layout
//! - The language-model assistant client
//! - External calendar sync
//! - Configuration and persisted settings

pub mod assistant;
pub mod bucket;
pub mod config;
pub mod days;
pub mod event;
pub mod grid;
pub mod settings;
pub mod store;
pub mod sync;
pub mod timer;
pub mod visible;
pub mod window;

// Re-export commonly used types
pub use assistant::{
    assistant_available, build_prompt, parse_reply, Assistant, AssistantError, AssistantReply, AssistantRequest,
    CommandModel, LanguageModel, SlotSuggestion, FALLBACK_MESSAGE,
};
pub use bucket::{count_on_day_in, events_on_day, events_on_day_in};
pub use config::{Config, ConfigError, DataPaths, ModelConfig, SyncConfig};
pub use days::DayWindow;
pub use event::{CalendarEvent, EventCategory};
pub use grid::{upcoming_days, MonthGrid, WEEKDAY_LABELS};
pub use settings::{Settings, ThemeMode};
pub use store::{EventStore, StoreError};
pub use sync::{
    disconnect_source, push_event, sync_all, CalendarSource, GoogleCalendarClient,
    RemoteCalendar, SyncError, SyncRange, SyncReport, GOOGLE_SOURCE,
};
pub use timer::Debouncer;
pub use visible::{visible_day, DayBlock, MonthReporter, YearMonth};
pub use window::{ScrollAnchor, ScrollTuning, TimelineController};

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_version() {
        let version = engine_version();
        assert!(!version.is_empty());
        assert!(version.starts_with("0."));
    }
}

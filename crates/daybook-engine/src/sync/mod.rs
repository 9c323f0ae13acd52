//! External calendar sync.
//!
//! Sync is best-effort and one-way into the local store: every calendar of
//! a [`CalendarSource`] is fetched for a bounded date range, each result is
//! mapped to a [`CalendarEvent`] tagged with the source, and failures of a
//! single calendar are skipped rather than failing the whole run.

pub mod google;

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::event::CalendarEvent;
use crate::store::EventStore;

pub use google::{GoogleCalendarClient, GOOGLE_SOURCE};

/// Time range fetched from the remote calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl SyncRange {
    /// `days_back` before `now` up to `days_forward` after it.
    pub fn around(now: DateTime<Utc>, days_back: i64, days_forward: i64) -> Self {
        Self {
            from: now - Duration::days(days_back),
            to: now + Duration::days(days_forward),
        }
    }
}

/// A calendar exposed by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCalendar {
    pub id: String,
    pub name: String,
    pub primary: bool,
}

/// Something that can list and accept calendar events.
pub trait CalendarSource {
    /// Source tag stamped on mapped events (e.g. `"google"`).
    fn source_name(&self) -> &str;

    fn list_calendars(&self) -> impl Future<Output = Result<Vec<RemoteCalendar>, SyncError>> + Send;

    /// Events of `calendar` overlapping `range`, already mapped.
    fn list_events(
        &self,
        calendar: &RemoteCalendar,
        range: SyncRange,
    ) -> impl Future<Output = Result<Vec<CalendarEvent>, SyncError>> + Send;

    /// Create `event` remotely, returning the mapped remote copy.
    fn insert_event(
        &self,
        calendar: &RemoteCalendar,
        event: &CalendarEvent,
    ) -> impl Future<Output = Result<CalendarEvent, SyncError>> + Send;
}

/// Outcome of [`sync_all`].
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub events: Vec<CalendarEvent>,
    /// Names of calendars that could not be fetched.
    pub failed_calendars: Vec<String>,
}

impl SyncReport {
    pub fn is_partial(&self) -> bool {
        !self.failed_calendars.is_empty()
    }

    /// Merge the fetched events into `store`, returning how many were new.
    pub fn apply(self, store: &mut EventStore) -> usize {
        store.merge_external(self.events)
    }
}

/// Fetch every calendar of `source` within `range`.
///
/// Only a failure to list calendars is returned as an error.
pub async fn sync_all<S: CalendarSource>(source: &S, range: SyncRange) -> Result<SyncReport, SyncError> {
    let calendars = source.list_calendars().await?;
    debug!(source = source.source_name(), calendars = calendars.len(), "Listing calendar events");

    let mut report = SyncReport::default();
    for calendar in &calendars {
        match source.list_events(calendar, range).await {
            Ok(mut events) => {
                debug!(calendar = %calendar.name, events = events.len(), "Fetched calendar");
                report.events.append(&mut events);
            }
            Err(e) => {
                warn!(calendar = %calendar.name, error = %e, "Skipping calendar");
                report.failed_calendars.push(calendar.name.clone());
            }
        }
    }

    // Events shared between calendars appear once.
    let mut seen = std::collections::HashSet::new();
    report.events.retain(|e| seen.insert(e.id.clone()));

    info!(
        source = source.source_name(),
        events = report.events.len(),
        failed = report.failed_calendars.len(),
        "Calendar sync finished"
    );
    Ok(report)
}

/// Create `event` in the source's primary calendar.
pub async fn push_event<S: CalendarSource>(source: &S, event: &CalendarEvent) -> Result<CalendarEvent, SyncError> {
    let calendars = source.list_calendars().await?;
    let primary = calendars
        .iter()
        .find(|c| c.primary)
        .or_else(|| calendars.first())
        .ok_or(SyncError::NoCalendars)?;
    source.insert_event(primary, event).await
}

/// Remove everything mirrored from `source` out of the store.
pub fn disconnect_source(store: &mut EventStore, source: &str) -> usize {
    let removed = store.remove_by_source(source);
    info!(source, removed, "Disconnected calendar source");
    removed
}

/// Errors talking to an external calendar.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Calendar API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No access token; set {0}")]
    MissingToken(String),

    #[error("No calendars available")]
    NoCalendars,

    #[error("Unexpected calendar data: {0}")]
    InvalidData(String),
}

//! Google Calendar v3 over REST.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CalendarSource, RemoteCalendar, SyncError, SyncRange};
use crate::event::CalendarEvent;

/// Source tag for events mirrored from Google.
pub const GOOGLE_SOURCE: &str = "google";

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: &str = "250";

/// Authenticated Google Calendar handle.
///
/// Obtained from [`GoogleCalendarClient::connect`] and released with
/// [`GoogleCalendarClient::disconnect`].
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http: Client,
    token: String,
    base: Url,
}

impl GoogleCalendarClient {
    /// Build a client for an OAuth access token.
    pub fn connect(token: impl Into<String>) -> Result<Self, SyncError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SyncError::MissingToken("access token".into()));
        }

        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base = Url::parse(API_BASE).map_err(|e| SyncError::InvalidData(e.to_string()))?;
        debug!("Connected Google Calendar client");
        Ok(Self { http, token, base })
    }

    /// Drop the client and its token.
    pub fn disconnect(self) {
        info!("Disconnected Google Calendar client");
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| SyncError::InvalidData("API base cannot hold a path".into()))?
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SyncError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Follow `nextPageToken` until every page of `url` is read.
    async fn get_all<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> Result<Vec<T>, SyncError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(url.clone()).query(query).query(&[("maxResults", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: Page<T> = self.send(request).await?;
            items.extend(page.items);
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => return Ok(items),
            }
        }
    }
}

impl CalendarSource for GoogleCalendarClient {
    fn source_name(&self) -> &str {
        GOOGLE_SOURCE
    }

    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>, SyncError> {
        let url = self.url(&["users", "me", "calendarList"])?;
        let entries: Vec<CalendarListEntry> = self.get_all(url, &[]).await?;
        Ok(entries.into_iter().map(RemoteCalendar::from).collect())
    }

    async fn list_events(&self, calendar: &RemoteCalendar, range: SyncRange) -> Result<Vec<CalendarEvent>, SyncError> {
        let url = self.url(&["calendars", &calendar.id, "events"])?;
        let query = [
            ("timeMin", range.from.to_rfc3339()),
            ("timeMax", range.to.to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        let events: Vec<GoogleEvent> = self.get_all(url, &query).await?;
        Ok(events.into_iter().filter_map(|e| map_event_in(e, &Local)).collect())
    }

    async fn insert_event(&self, calendar: &RemoteCalendar, event: &CalendarEvent) -> Result<CalendarEvent, SyncError> {
        let url = self.url(&["calendars", &calendar.id, "events"])?;
        let body = GoogleEvent::from(event);
        let created: GoogleEvent = self.send(self.http.post(url).json(&body)).await?;

        let mut mapped = map_event_in(created, &Local)
            .ok_or_else(|| SyncError::InvalidData("created event has no usable times".into()))?;
        mapped.category = event.category;
        Ok(mapped)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListEntry {
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    summary_override: Option<String>,
    #[serde(default)]
    primary: bool,
}

impl From<CalendarListEntry> for RemoteCalendar {
    fn from(entry: CalendarListEntry) -> Self {
        let name = entry
            .summary_override
            .filter(|s| !s.is_empty())
            .unwrap_or(if entry.summary.is_empty() {
                entry.id.clone()
            } else {
                entry.summary
            });
        Self {
            id: entry.id,
            name,
            primary: entry.primary,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    status: String,
    #[serde(default)]
    summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    start: Option<GoogleTime>,
    #[serde(default)]
    end: Option<GoogleTime>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
}

impl GoogleTime {
    /// Timed instants as-is; all-day dates at local midnight.
    fn resolve<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Utc>> {
        if let Some(dt) = self.date_time {
            return Some(dt.with_timezone(&Utc));
        }
        let midnight = self.date?.and_time(NaiveTime::MIN);
        tz.from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl From<&CalendarEvent> for GoogleEvent {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            summary: event.title.clone(),
            description: event.description.clone(),
            start: Some(GoogleTime {
                date_time: Some(event.start.fixed_offset()),
                date: None,
            }),
            end: Some(GoogleTime {
                date_time: Some(event.end.fixed_offset()),
                date: None,
            }),
            ..Self::default()
        }
    }
}

/// Map a Google event into the store's shape.
///
/// Cancelled events and events without a start are dropped. All-day
/// events span local midnight to midnight.
fn map_event_in<Tz: TimeZone>(event: GoogleEvent, tz: &Tz) -> Option<CalendarEvent> {
    if event.status == "cancelled" || event.id.is_empty() {
        return None;
    }

    let start = event.start.as_ref()?.resolve(tz)?;
    let end = event
        .end
        .as_ref()
        .and_then(|t| t.resolve(tz))
        .unwrap_or(start);

    let title = if event.summary.trim().is_empty() {
        "(No title)".to_string()
    } else {
        event.summary
    };

    let mut mapped = CalendarEvent::new(title, start, end).with_source(GOOGLE_SOURCE);
    mapped.id = format!("{GOOGLE_SOURCE}:{}", event.id);
    mapped.description = event.description.filter(|d| !d.trim().is_empty());
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn parse(json: &str) -> GoogleEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_map_timed_event() {
        let event = parse(
            r#"{
                "id": "abc123",
                "status": "confirmed",
                "summary": "Design review",
                "description": "Room 4",
                "start": {"dateTime": "2026-10-20T10:00:00-07:00"},
                "end": {"dateTime": "2026-10-20T11:30:00-07:00"}
            }"#,
        );
        let mapped = map_event_in(event, &Utc).unwrap();

        assert_eq!(mapped.id, "google:abc123");
        assert_eq!(mapped.source.as_deref(), Some(GOOGLE_SOURCE));
        assert_eq!(mapped.title, "Design review");
        assert_eq!(mapped.description.as_deref(), Some("Room 4"));
        assert_eq!(mapped.start, Utc.with_ymd_and_hms(2026, 10, 20, 17, 0, 0).unwrap());
        assert_eq!(mapped.duration(), ChronoDuration::minutes(90));
    }

    #[test]
    fn test_map_all_day_event() {
        let event = parse(
            r#"{"id": "holiday", "summary": "Holiday",
                "start": {"date": "2026-11-26"}, "end": {"date": "2026-11-27"}}"#,
        );
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let mapped = map_event_in(event, &tz).unwrap();

        assert_eq!(mapped.start.with_timezone(&tz).date_naive(), NaiveDate::from_ymd_opt(2026, 11, 26).unwrap());
        assert_eq!(mapped.start.with_timezone(&tz).time(), NaiveTime::MIN);
        assert_eq!(mapped.duration(), ChronoDuration::hours(24));
    }

    #[test]
    fn test_cancelled_and_timeless_events_are_dropped() {
        let cancelled = parse(
            r#"{"id": "x", "status": "cancelled",
                "start": {"dateTime": "2026-10-20T10:00:00Z"}, "end": {"dateTime": "2026-10-20T11:00:00Z"}}"#,
        );
        assert!(map_event_in(cancelled, &Utc).is_none());

        let timeless = parse(r#"{"id": "y", "summary": "?"}"#);
        assert!(map_event_in(timeless, &Utc).is_none());
    }

    #[test]
    fn test_untitled_and_inverted_event() {
        let event = parse(
            r#"{"id": "z", "summary": "",
                "start": {"dateTime": "2026-10-20T10:00:00Z"}, "end": {"dateTime": "2026-10-20T09:00:00Z"}}"#,
        );
        let mapped = map_event_in(event, &Utc).unwrap();
        assert_eq!(mapped.title, "(No title)");
        assert_eq!(mapped.duration(), ChronoDuration::hours(1));
    }

    #[test]
    fn test_calendar_list_page() {
        let page: Page<CalendarListEntry> = serde_json::from_str(
            r#"{"items": [
                {"id": "me@example.com", "summary": "Me", "primary": true},
                {"id": "team@group.calendar.google.com", "summary": "Team", "summaryOverride": "Work"}
            ], "nextPageToken": "p2"}"#,
        )
        .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("p2"));

        let calendars: Vec<RemoteCalendar> = page.items.into_iter().map(RemoteCalendar::from).collect();
        assert!(calendars[0].primary);
        assert_eq!(calendars[0].name, "Me");
        assert_eq!(calendars[1].name, "Work");
    }

    #[test]
    fn test_insert_body_uses_timed_fields() {
        let start = Utc.with_ymd_and_hms(2026, 10, 21, 15, 0, 0).unwrap();
        let event = CalendarEvent::new("Dentist", start, start + ChronoDuration::minutes(30));
        let body = serde_json::to_value(GoogleEvent::from(&event)).unwrap();

        assert_eq!(body["summary"], "Dentist");
        assert!(body.get("id").is_none());
        assert_eq!(body["start"]["dateTime"], "2026-10-21T15:00:00+00:00");
        assert!(body["start"].get("date").is_none());
    }

    #[test]
    fn test_connect_requires_token() {
        assert!(matches!(GoogleCalendarClient::connect("  "), Err(SyncError::MissingToken(_))));

        let client = GoogleCalendarClient::connect("token").unwrap();
        let url = client.url(&["calendars", "en.usa#holiday@group.v.calendar.google.com", "events"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/en.usa%23holiday@group.v.calendar.google.com/events"
        );
        client.disconnect();
    }
}

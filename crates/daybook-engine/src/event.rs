//! Calendar event model.
//!
//! A [`CalendarEvent`] is a titled time span with a category tag. Events
//! mirrored from an external calendar carry a `source` identifier so they
//! can be removed together when that source is disconnected.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category tag for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Work,
    Personal,
    Health,
    Social,
    Travel,
    #[default]
    Other,
}

impl EventCategory {
    /// All categories, in display order.
    pub const ALL: [EventCategory; 6] = [
        Self::Work,
        Self::Personal,
        Self::Health,
        Self::Social,
        Self::Travel,
        Self::Other,
    ];

    /// Lowercase name used in storage and assistant replies.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Health => "health",
            Self::Social => "social",
            Self::Travel => "travel",
            Self::Other => "other",
        }
    }

    /// Default `#rrggbb` color for the category.
    pub fn default_color(self) -> &'static str {
        match self {
            Self::Work => "#89b4fa",
            Self::Personal => "#cba6f7",
            Self::Health => "#a6e3a1",
            Self::Social => "#fab387",
            Self::Travel => "#94e2d5",
            Self::Other => "#9399b2",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// A single calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Identifier, unique within the store.
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub category: EventCategory,
    /// Color override (`#rrggbb`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// External-origin identifier (e.g. `"google"`) for mirrored events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CalendarEvent {
    /// Create a local event with a fresh id.
    ///
    /// The span is normalized: an end at or before the start becomes
    /// `start + 1h`.
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let mut event = Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            start,
            end,
            category: EventCategory::default(),
            color: None,
            source: None,
        };
        event.normalize();
        event
    }

    #[must_use]
    pub fn with_category(mut self, category: EventCategory) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Enforce `end > start` by advancing `end` to one hour after `start`.
    ///
    /// Returns `true` if the event was changed.
    pub fn normalize(&mut self) -> bool {
        if self.end <= self.start {
            self.end = self.start + Duration::hours(1);
            true
        } else {
            false
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether `now` falls inside `[start, end)`.
    pub fn is_happening(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now < self.end
    }

    /// Whether this event mirrors an external calendar.
    pub fn is_external(&self) -> bool {
        self.source.is_some()
    }

    /// The color to draw this event with.
    pub fn display_color(&self) -> &str {
        self.color
            .as_deref()
            .unwrap_or_else(|| self.category.default_color())
    }
}

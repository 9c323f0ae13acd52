//! Day bucketing: which events start on a given calendar day.
//!
//! Recomputed on every render. Personal-scale event lists are small enough
//! that no index is kept.

use chrono::{Local, NaiveDate, TimeZone};

use crate::event::CalendarEvent;

/// Events starting on `day` in local time, sorted by start.
pub fn events_on_day(events: &[CalendarEvent], day: NaiveDate) -> Vec<&CalendarEvent> {
    events_on_day_in(events, day, &Local)
}

/// Events whose start falls on `day` in `tz`, sorted by start.
///
/// Matching is on the calendar date only; time of day is ignored.
pub fn events_on_day_in<'a, Tz: TimeZone>(
    events: &'a [CalendarEvent],
    day: NaiveDate,
    tz: &Tz,
) -> Vec<&'a CalendarEvent> {
    let mut matches: Vec<&CalendarEvent> = events
        .iter()
        .filter(|e| e.start.with_timezone(tz).date_naive() == day)
        .collect();
    matches.sort_by_key(|e| e.start);
    matches
}

/// Number of events starting on `day` in `tz`.
pub fn count_on_day_in<Tz: TimeZone>(events: &[CalendarEvent], day: NaiveDate, tz: &Tz) -> usize {
    events
        .iter()
        .filter(|e| e.start.with_timezone(tz).date_naive() == day)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn event(title: &str, day: u32, h: u32) -> CalendarEvent {
        let start = Utc.with_ymd_and_hms(2026, 6, day, h, 0, 0).unwrap();
        CalendarEvent::new(title, start, start + chrono::Duration::hours(1))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    #[test]
    fn test_only_same_day_sorted_by_start() {
        let events = vec![
            event("afternoon", 1, 14),
            event("next day late", 2, 23),
            event("morning", 1, 9),
        ];

        let titles: Vec<_> = events_on_day_in(&events, day(1), &Utc)
            .into_iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(titles, vec!["morning", "afternoon"]);

        let next: Vec<_> = events_on_day_in(&events, day(2), &Utc)
            .into_iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(next, vec!["next day late"]);
    }

    #[test]
    fn test_day_boundary_follows_timezone() {
        // 23:00 UTC on the 2nd is 01:00 on the 3rd at UTC+2.
        let events = vec![event("late", 2, 23)];
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();

        assert!(events_on_day_in(&events, day(2), &plus_two).is_empty());
        assert_eq!(events_on_day_in(&events, day(3), &plus_two).len(), 1);
        assert_eq!(count_on_day_in(&events, day(3), &plus_two), 1);
    }

    #[test]
    fn test_empty_day() {
        let events = vec![event("x", 1, 9)];
        assert!(events_on_day_in(&events, day(5), &Utc).is_empty());
        assert_eq!(count_on_day_in(&events, day(5), &Utc), 0);
    }
}

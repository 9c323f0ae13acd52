//! Month grid layout (Monday-first weeks).

use chrono::{Datelike, Duration, NaiveDate, TimeZone};

use crate::bucket::events_on_day_in;
use crate::event::CalendarEvent;
use crate::visible::YearMonth;

/// Days of a month arranged into Monday-first week rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub month: YearMonth,
    /// Blank cells before the 1st: `(firstWeekday - 1) mod 7`, Monday = 0.
    pub leading_blanks: usize,
    pub days: Vec<NaiveDate>,
}

impl MonthGrid {
    /// Grid for `month`. Returns `None` for an invalid month.
    pub fn new(month: YearMonth) -> Option<Self> {
        let first = month.first_day()?;
        let next_first = month.next().first_day()?;
        let len = (next_first - first).num_days();
        let days = (0..len).map(|i| first + Duration::days(i)).collect();

        Some(Self {
            month,
            leading_blanks: first.weekday().num_days_from_monday() as usize,
            days,
        })
    }

    /// Week rows; `None` cells pad the first and last week.
    pub fn weeks(&self) -> Vec<[Option<NaiveDate>; 7]> {
        let mut cells: Vec<Option<NaiveDate>> = vec![None; self.leading_blanks];
        cells.extend(self.days.iter().copied().map(Some));
        while cells.len() % 7 != 0 {
            cells.push(None);
        }

        cells
            .chunks(7)
            .map(|chunk| {
                let mut week = [None; 7];
                week.copy_from_slice(chunk);
                week
            })
            .collect()
    }
}

/// Days on or after `from` within `from`'s month that have events.
///
/// Each day carries its bucketed events. At most `limit` days are returned.
pub fn upcoming_days<'a, Tz: TimeZone>(
    events: &'a [CalendarEvent],
    from: NaiveDate,
    limit: usize,
    tz: &Tz,
) -> Vec<(NaiveDate, Vec<&'a CalendarEvent>)> {
    let Some(grid) = MonthGrid::new(from.into()) else {
        return Vec::new();
    };

    grid.days
        .into_iter()
        .filter(|day| *day >= from)
        .map(|day| (day, events_on_day_in(events, day, tz)))
        .filter(|(_, events)| !events.is_empty())
        .take(limit)
        .collect()
}

/// Short weekday headers, Monday first.
pub const WEEKDAY_LABELS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

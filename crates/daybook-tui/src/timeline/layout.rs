//! Row layout for day blocks.
//!
//! A day block is a header row, one row per event (or a single
//! "No events" row), and a blank gap row.

use chrono::NaiveDate;
use daybook_engine::{events_on_day, CalendarEvent, DayBlock};

/// One rendered row of a day block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DayRow<'a> {
    Header(NaiveDate),
    Event(&'a CalendarEvent),
    Empty,
    Gap,
}

/// Rows in a block holding `event_count` events.
pub fn block_height(event_count: usize) -> i64 {
    let body = i64::try_from(event_count.max(1)).unwrap_or(i64::MAX - 2);
    body + 2
}

/// Rows of `day`, top to bottom.
pub fn day_rows<'a>(day: NaiveDate, events: &[&'a CalendarEvent]) -> Vec<DayRow<'a>> {
    let mut rows = Vec::with_capacity(events.len() + 2);
    rows.push(DayRow::Header(day));
    if events.is_empty() {
        rows.push(DayRow::Empty);
    } else {
        rows.extend(events.iter().copied().map(DayRow::Event));
    }
    rows.push(DayRow::Gap);
    rows
}

/// Stack the blocks of `days` from offset zero.
pub fn layout_days(days: &[NaiveDate], events: &[CalendarEvent]) -> Vec<DayBlock> {
    let mut top = 0;
    days.iter()
        .map(|&day| {
            let height = block_height(events_on_day(events, day).len());
            let block = DayBlock::new(day, top, height);
            top += height;
            block
        })
        .collect()
}

//! Visible-range reporting for header sync.
//!
//! The renderer describes where each day landed as a [`DayBlock`]. The
//! visible day is the first block whose bottom edge passes the read line,
//! and [`MonthReporter`] turns a stream of visible days into month/year
//! change notifications.

use chrono::{Datelike, NaiveDate};

/// Where a rendered day sits inside the scroll content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBlock {
    pub day: NaiveDate,
    /// Offset of the block's top edge from the top of the content.
    pub top: i64,
    pub height: i64,
}

impl DayBlock {
    pub fn new(day: NaiveDate, top: i64, height: i64) -> Self {
        Self { day, top, height }
    }

    pub fn bottom(&self) -> i64 {
        self.top + self.height
    }
}

/// First block, in document order, whose bottom lies below
/// `viewport_top + read_line`.
pub fn visible_day(blocks: &[DayBlock], viewport_top: i64, read_line: i64) -> Option<NaiveDate> {
    let line = viewport_top + read_line;
    blocks.iter().find(|b| b.bottom() > line).map(|b| b.day)
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// First day of the month, if the month is valid.
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    #[must_use]
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    #[must_use]
    pub fn prev(self) -> Self {
        if self.month == 1 {
            Self::new(self.year - 1, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }
}

/// Deduplicates visible-day reports down to month/year changes.
#[derive(Debug, Clone, Default)]
pub struct MonthReporter {
    last: Option<YearMonth>,
}

impl MonthReporter {
    /// Reporter that treats `date`'s month as already displayed.
    pub fn starting_at(date: NaiveDate) -> Self {
        Self {
            last: Some(date.into()),
        }
    }

    /// Month currently shown in the header.
    pub fn displayed(&self) -> Option<YearMonth> {
        self.last
    }

    /// Record that the header now shows `date`'s month without reporting.
    pub fn reset(&mut self, date: NaiveDate) {
        self.last = Some(date.into());
    }

    /// Returns `Some(day)` only when `day`'s month differs from the last one.
    pub fn report(&mut self, day: NaiveDate) -> Option<NaiveDate> {
        let month = YearMonth::from(day);
        if self.last == Some(month) {
            return None;
        }
        self.last = Some(month);
        Some(day)
    }
}

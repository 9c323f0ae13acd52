//! Day sequences for the timeline.
//!
//! [`day_range`] produces contiguous runs of calendar days around a center
//! date, and [`DayWindow`] is the materialized run the timeline renders. The
//! window only ever grows by whole [`EXTENSION_DAYS`] blocks spliced onto
//! either edge, so it stays contiguous and strictly increasing.

use chrono::{Duration, NaiveDate};

/// Days before the center in the initial window.
pub const INITIAL_DAYS_BEFORE: i64 = 14;

/// Days after the center in the initial window.
pub const INITIAL_DAYS_AFTER: i64 = 21;

/// Radius of the window produced by "jump to today".
pub const JUMP_RADIUS_DAYS: i64 = 14;

/// Size of each block spliced onto a window edge.
pub const EXTENSION_DAYS: i64 = 10;

/// Days `center + lo ..= center + hi`, in order.
///
/// Returns an empty sequence when `hi < lo`. Days that fall outside the
/// representable calendar are dropped.
pub fn day_range(center: NaiveDate, lo: i64, hi: i64) -> Vec<NaiveDate> {
    (lo..=hi)
        .filter_map(|offset| center.checked_add_signed(Duration::days(offset)))
        .collect()
}

/// The [`EXTENSION_DAYS`] days immediately preceding `first`.
pub fn block_before(first: NaiveDate) -> Vec<NaiveDate> {
    day_range(first, -EXTENSION_DAYS, -1)
}

/// The [`EXTENSION_DAYS`] days immediately following `last`.
pub fn block_after(last: NaiveDate) -> Vec<NaiveDate> {
    day_range(last, 1, EXTENSION_DAYS)
}

/// Contiguous, strictly increasing run of days currently materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayWindow {
    days: Vec<NaiveDate>,
}

impl DayWindow {
    /// Initial window: two weeks back, three weeks forward.
    pub fn initial(center: NaiveDate) -> Self {
        Self::spanning(center, -INITIAL_DAYS_BEFORE, INITIAL_DAYS_AFTER)
    }

    /// Symmetric window used when jumping back to a date.
    pub fn around(center: NaiveDate) -> Self {
        Self::spanning(center, -JUMP_RADIUS_DAYS, JUMP_RADIUS_DAYS)
    }

    /// Window covering `center + lo ..= center + hi`.
    pub fn spanning(center: NaiveDate, lo: i64, hi: i64) -> Self {
        Self {
            days: day_range(center, lo, hi),
        }
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.position(day).is_some()
    }

    /// Index of `day` within the window.
    pub fn position(&self, day: NaiveDate) -> Option<usize> {
        self.days.binary_search(&day).ok()
    }

    /// Splice a block onto the start. Returns the number of days added.
    pub fn prepend_block(&mut self) -> usize {
        let Some(first) = self.first() else {
            return 0;
        };
        let block = block_before(first);
        let added = block.len();
        self.days.splice(0..0, block);
        added
    }

    /// Splice a block onto the end. Returns the number of days added.
    pub fn append_block(&mut self) -> usize {
        let Some(last) = self.last() else {
            return 0;
        };
        let block = block_after(last);
        let added = block.len();
        self.days.extend(block);
        added
    }
}

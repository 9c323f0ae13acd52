//! Timeline window controller.
//!
//! Owns the materialized [`DayWindow`] and the scroll position of the
//! container rendering it. Scrolling near the top schedules a prepend, near
//! the bottom appends immediately. Because days have variable heights,
//! inserting content above the viewport would shift everything down; the
//! controller records a [`ScrollAnchor`] before the prepend and corrects the
//! scroll offset once the renderer reports the new layout.
//!
//! The controller never touches a clock or a renderer directly. Callers feed
//! it scroll events and timestamps, call [`TimelineController::tick`] from
//! their timer loop, and report each layout pass through
//! [`TimelineController::on_layout`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::days::DayWindow;
use crate::timer::Debouncer;
use crate::visible::{visible_day, DayBlock, MonthReporter, YearMonth};

/// Thresholds and delays for the controller, in layout units and milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollTuning {
    /// Offset below which a prepend is triggered.
    pub near_top: i64,
    /// Remaining content below the viewport under which an append is triggered.
    pub near_bottom: i64,
    /// Distance from the viewport top used to pick the visible day.
    pub read_line: i64,
    /// Displacement that counts as a fling within `rapid_window_ms`.
    pub rapid_distance: i64,
    /// Span of recent scroll samples the fling displacement is measured over.
    pub rapid_window_ms: u64,
    /// How long rapid mode persists after the last fast sample.
    pub rapid_cooldown_ms: u64,
    /// Delay before a scheduled prepend is applied.
    pub settle_delay_ms: u64,
    /// Trailing debounce for the visible-day check.
    pub visible_debounce_ms: u64,
    /// Sticky header height subtracted when aligning a day to the top.
    pub header_offset: i64,
}

impl ScrollTuning {
    /// Thresholds for a pixel-based scroll container.
    pub fn pixels() -> Self {
        Self {
            near_top: 800,
            near_bottom: 400,
            read_line: 80,
            rapid_distance: 80,
            rapid_window_ms: 120,
            rapid_cooldown_ms: 200,
            settle_delay_ms: 100,
            visible_debounce_ms: 200,
            header_offset: 48,
        }
    }

    /// Thresholds for a terminal, where one unit is one row.
    pub fn rows() -> Self {
        Self {
            near_top: 20,
            near_bottom: 10,
            read_line: 2,
            rapid_distance: 12,
            rapid_window_ms: 120,
            rapid_cooldown_ms: 200,
            settle_delay_ms: 100,
            visible_debounce_ms: 200,
            header_offset: 1,
        }
    }

    fn rapid_window(&self) -> Duration {
        Duration::from_millis(self.rapid_window_ms)
    }

    fn rapid_cooldown(&self) -> Duration {
        Duration::from_millis(self.rapid_cooldown_ms)
    }
}

impl Default for ScrollTuning {
    fn default() -> Self {
        Self::pixels()
    }
}

/// A day and its content offset, captured just before a prepend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollAnchor {
    pub day: NaiveDate,
    pub offset: i64,
}

/// Classifies scrolling as a fling, with hysteresis.
#[derive(Debug, Clone, Default)]
struct VelocityTracker {
    samples: VecDeque<(Instant, i64)>,
    last_fast: Option<Instant>,
}

impl VelocityTracker {
    /// Record a sample and return whether scrolling is currently rapid.
    fn record(&mut self, now: Instant, offset: i64, tuning: &ScrollTuning) -> bool {
        let window = tuning.rapid_window();
        while let Some(&(t, _)) = self.samples.front() {
            if now.saturating_duration_since(t) > window {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        let fast = self
            .samples
            .front()
            .is_some_and(|&(_, oldest)| (offset - oldest).abs() > tuning.rapid_distance);
        if fast {
            self.last_fast = Some(now);
        }

        self.samples.push_back((now, offset));
        self.is_rapid(now, tuning)
    }

    fn is_rapid(&self, now: Instant, tuning: &ScrollTuning) -> bool {
        self.last_fast
            .is_some_and(|t| now.saturating_duration_since(t) < tuning.rapid_cooldown())
    }

    /// Rebase recorded offsets after a programmatic scroll adjustment.
    fn shift(&mut self, delta: i64) {
        for (_, offset) in &mut self.samples {
            *offset += delta;
        }
    }

    fn clear(&mut self) {
        self.samples.clear();
        self.last_fast = None;
    }
}

/// Controller for the infinite-scroll day timeline.
#[derive(Debug, Clone)]
pub struct TimelineController {
    window: DayWindow,
    tuning: ScrollTuning,
    scroll_offset: i64,
    viewport_height: i64,
    content_height: i64,
    /// Set while a prepend is scheduled or awaiting its layout pass.
    extending: bool,
    /// Set once the prepend is applied, until the layout pass that shows it.
    prepended: bool,
    anchor: Option<ScrollAnchor>,
    settle: Debouncer,
    velocity: VelocityTracker,
    visible_check: Debouncer,
    reporter: MonthReporter,
    /// Day to align to the viewport top after the next layout.
    pending_align: Option<NaiveDate>,
    blocks: Vec<DayBlock>,
    generation: u64,
    laid_out_generation: u64,
}

impl TimelineController {
    /// Initialize around `center` and align it to the top after the first layout.
    pub fn new(center: NaiveDate, tuning: ScrollTuning) -> Self {
        Self {
            window: DayWindow::initial(center),
            tuning,
            scroll_offset: 0,
            viewport_height: 0,
            content_height: 0,
            extending: false,
            prepended: false,
            anchor: None,
            settle: Debouncer::new(Duration::from_millis(tuning.settle_delay_ms)),
            velocity: VelocityTracker::default(),
            visible_check: Debouncer::new(Duration::from_millis(tuning.visible_debounce_ms)),
            reporter: MonthReporter::starting_at(center),
            pending_align: Some(center),
            blocks: Vec::new(),
            generation: 0,
            laid_out_generation: 0,
        }
    }

    pub fn window(&self) -> &DayWindow {
        &self.window
    }

    pub fn days(&self) -> &[NaiveDate] {
        self.window.days()
    }

    pub fn tuning(&self) -> &ScrollTuning {
        &self.tuning
    }

    pub fn scroll_offset(&self) -> i64 {
        self.scroll_offset
    }

    pub fn viewport_height(&self) -> i64 {
        self.viewport_height
    }

    pub fn content_height(&self) -> i64 {
        self.content_height
    }

    /// Blocks from the most recent layout pass.
    pub fn blocks(&self) -> &[DayBlock] {
        &self.blocks
    }

    pub fn is_extending(&self) -> bool {
        self.extending
    }

    pub fn anchor(&self) -> Option<ScrollAnchor> {
        self.anchor
    }

    pub fn is_rapid(&self, now: Instant) -> bool {
        self.velocity.is_rapid(now, &self.tuning)
    }

    /// Month currently shown in the header.
    pub fn displayed_month(&self) -> Option<YearMonth> {
        self.reporter.displayed()
    }

    /// Whether a layout pass is needed to reflect window changes.
    pub fn needs_layout(&self) -> bool {
        self.generation != self.laid_out_generation || self.pending_align.is_some()
    }

    /// Handle a scroll position reported by the container.
    pub fn on_scroll(&mut self, offset: i64, viewport_height: i64, content_height: i64, now: Instant) {
        self.scroll_offset = offset;
        self.viewport_height = viewport_height;
        self.content_height = content_height;

        let rapid = self.velocity.record(now, offset, &self.tuning);

        if offset < self.tuning.near_top && !self.extending {
            self.extending = true;
            self.anchor = if rapid {
                None
            } else {
                self.blocks.first().map(|b| ScrollAnchor {
                    day: b.day,
                    offset: b.top,
                })
            };
            self.settle.schedule(now);
            debug!(offset, rapid, anchored = self.anchor.is_some(), "Scheduling timeline prepend");
        } else if content_height - offset - viewport_height < self.tuning.near_bottom
            && !self.extending
        {
            let added = self.window.append_block();
            if added > 0 {
                self.generation += 1;
                debug!(added, days = self.window.len(), "Appended days to timeline");
            }
        }

        self.visible_check.schedule(now);
    }

    /// Scroll by `delta` units from the current position, clamped to the content.
    pub fn scroll_by(&mut self, delta: i64, now: Instant) {
        let max = (self.content_height - self.viewport_height).max(0);
        let offset = (self.scroll_offset + delta).clamp(0, max);
        self.on_scroll(offset, self.viewport_height, self.content_height, now);
    }

    /// Advance timers. Returns a day when the header month should change.
    pub fn tick(&mut self, now: Instant) -> Option<NaiveDate> {
        if self.settle.fire(now) && self.extending {
            let added = self.window.prepend_block();
            if added > 0 {
                self.generation += 1;
                self.prepended = true;
                debug!(added, days = self.window.len(), "Prepended days to timeline");
            } else {
                self.finish_extension();
            }
        }

        if self.visible_check.fire(now) {
            let day = visible_day(&self.blocks, self.scroll_offset, self.tuning.read_line)?;
            return self.reporter.report(day);
        }

        None
    }

    /// Accept the blocks produced by a layout pass.
    ///
    /// Applies anchor correction if a prepend landed since the last pass,
    /// then any pending alignment, then clamps the scroll offset.
    pub fn on_layout(&mut self, blocks: Vec<DayBlock>, viewport_height: i64) {
        self.content_height = blocks.last().map_or(0, DayBlock::bottom);
        self.viewport_height = viewport_height;
        self.blocks = blocks;
        self.laid_out_generation = self.generation;

        // Appends also bump the generation; only a prepend ends the extension.
        if self.prepended {
            self.on_window_changed();
        }

        if !self.blocks.is_empty() {
            if let Some(day) = self.pending_align.take() {
                if let Some(block) = self.block(day) {
                    self.scroll_offset = block.top - self.tuning.header_offset;
                    self.velocity.clear();
                }
            }
        }

        let max = (self.content_height - self.viewport_height).max(0);
        self.scroll_offset = self.scroll_offset.clamp(0, max);
    }

    /// Discard the window for a fresh one around `now` and align to it.
    ///
    /// Returns the date the parent should now display.
    pub fn jump_to_today(&mut self, now: NaiveDate) -> NaiveDate {
        self.window = DayWindow::around(now);
        self.generation += 1;
        self.finish_extension();
        self.velocity.clear();
        self.visible_check.cancel();
        self.reporter.reset(now);
        self.pending_align = Some(now);
        debug!(%now, "Timeline recentered");
        now
    }

    /// Align `day` to the top, recentering the window if it is not loaded.
    pub fn focus_day(&mut self, day: NaiveDate) -> NaiveDate {
        if self.window.contains(day) {
            self.reporter.reset(day);
            self.pending_align = Some(day);
            day
        } else {
            self.jump_to_today(day)
        }
    }

    fn on_window_changed(&mut self) {
        if let Some(anchor) = self.anchor {
            match self.block(anchor.day) {
                Some(block) => {
                    let delta = block.top - anchor.offset;
                    self.scroll_offset += delta;
                    self.velocity.shift(delta);
                }
                None => debug!(day = %anchor.day, "Scroll anchor not rendered; skipping correction"),
            }
        }

        self.finish_extension();
    }

    fn finish_extension(&mut self) {
        self.extending = false;
        self.prepended = false;
        self.anchor = None;
        self.settle.cancel();
    }

    fn block(&self, day: NaiveDate) -> Option<DayBlock> {
        self.blocks.iter().find(|b| b.day == day).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as Days;

    const MS: Duration = Duration::from_millis(1);
    const DAY_HEIGHT: i64 = 100;
    const VIEWPORT: i64 = 600;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Lay out days with a taller block every third day.
    fn layout(days: &[NaiveDate]) -> Vec<DayBlock> {
        let mut top = 0;
        days.iter()
            .enumerate()
            .map(|(i, &day)| {
                let height = if i % 3 == 0 { DAY_HEIGHT * 2 } else { DAY_HEIGHT };
                let block = DayBlock::new(day, top, height);
                top += height;
                block
            })
            .collect()
    }

    fn render(ctl: &mut TimelineController) {
        let blocks = layout(ctl.days());
        ctl.on_layout(blocks, VIEWPORT);
    }

    fn offset_of(ctl: &TimelineController, day: NaiveDate) -> i64 {
        ctl.blocks().iter().find(|b| b.day == day).unwrap().top
    }

    fn controller() -> (TimelineController, Instant) {
        let mut ctl = TimelineController::new(date(2026, 10, 19), ScrollTuning::pixels());
        render(&mut ctl);
        (ctl, Instant::now())
    }

    #[test]
    fn test_initialize_aligns_center_under_header() {
        let (ctl, _) = controller();
        assert_eq!(ctl.days().len(), 36);
        let top = offset_of(&ctl, date(2026, 10, 19));
        assert_eq!(ctl.scroll_offset(), top - 48);
        assert_eq!(ctl.displayed_month(), Some(YearMonth::new(2026, 10)));
    }

    #[test]
    fn test_scroll_near_top_prepends_after_settle_and_keeps_position() {
        let (mut ctl, t0) = controller();
        let first = ctl.days()[0];

        ctl.on_scroll(300, VIEWPORT, ctl.content_height(), t0);
        assert!(ctl.is_extending());
        assert_eq!(ctl.anchor(), Some(ScrollAnchor { day: first, offset: 0 }));

        // Nothing happens before the settle delay.
        ctl.tick(t0 + 50 * MS);
        assert_eq!(ctl.days()[0], first);

        ctl.tick(t0 + 100 * MS);
        assert_eq!(ctl.days().len(), 46);
        assert_eq!(ctl.days()[10], first);

        let before = 0 - 300;
        render(&mut ctl);
        let after = offset_of(&ctl, first) - ctl.scroll_offset();
        assert_eq!(before, after);
        assert!(!ctl.is_extending());
        assert!(ctl.anchor().is_none());
    }

    #[test]
    fn test_layout_after_append_keeps_scheduled_prepend() {
        let (mut ctl, t0) = controller();
        let content = ctl.content_height();
        let first = ctl.days()[0];

        ctl.on_scroll(content - VIEWPORT - 100, VIEWPORT, content, t0);
        assert_eq!(ctl.days().len(), 46);

        // Near the top before the appended days were laid out.
        ctl.on_scroll(300, VIEWPORT, content, t0 + 500 * MS);
        assert!(ctl.is_extending());
        render(&mut ctl);
        assert!(ctl.is_extending());
        assert_eq!(ctl.anchor(), Some(ScrollAnchor { day: first, offset: 0 }));

        ctl.tick(t0 + 600 * MS);
        assert_eq!(ctl.days().len(), 56);
        assert_eq!(ctl.days()[10], first);

        render(&mut ctl);
        assert_eq!(offset_of(&ctl, first) - ctl.scroll_offset(), -300);
        assert!(!ctl.is_extending());
    }

    #[test]
    fn test_second_prepend_waits_for_first_to_finish() {
        let (mut ctl, t0) = controller();
        ctl.on_scroll(300, VIEWPORT, ctl.content_height(), t0);
        ctl.on_scroll(250, VIEWPORT, ctl.content_height(), t0 + 10 * MS);
        ctl.tick(t0 + 200 * MS);
        assert_eq!(ctl.days().len(), 46);

        render(&mut ctl);
        ctl.tick(t0 + 400 * MS);
        assert_eq!(ctl.days().len(), 46);
    }

    #[test]
    fn test_rapid_scroll_skips_anchor_and_correction() {
        let (mut ctl, t0) = controller();
        let content = ctl.content_height();

        ctl.on_scroll(1500, VIEWPORT, content, t0);
        ctl.on_scroll(1000, VIEWPORT, content, t0 + 40 * MS);
        assert!(ctl.is_rapid(t0 + 40 * MS));
        ctl.on_scroll(700, VIEWPORT, content, t0 + 80 * MS);
        assert!(ctl.is_extending());
        assert!(ctl.anchor().is_none());

        ctl.tick(t0 + 180 * MS);
        assert_eq!(ctl.days().len(), 46);
        render(&mut ctl);
        assert_eq!(ctl.scroll_offset(), 700);
        assert!(!ctl.is_extending());
    }

    #[test]
    fn test_rapid_mode_has_hysteresis() {
        let (mut ctl, t0) = controller();
        let content = ctl.content_height();
        ctl.on_scroll(2000, VIEWPORT, content, t0);
        ctl.on_scroll(1900, VIEWPORT, content, t0 + 50 * MS);
        assert!(ctl.is_rapid(t0 + 50 * MS));

        // Slow movement keeps the flag until the cooldown elapses.
        ctl.on_scroll(1895, VIEWPORT, content, t0 + 150 * MS);
        assert!(ctl.is_rapid(t0 + 150 * MS));
        ctl.on_scroll(1890, VIEWPORT, content, t0 + 260 * MS);
        assert!(!ctl.is_rapid(t0 + 260 * MS));
    }

    #[test]
    fn test_slow_scroll_is_not_rapid() {
        let (mut ctl, t0) = controller();
        let content = ctl.content_height();
        for i in 0..10 {
            ctl.on_scroll(2000 - i * 10, VIEWPORT, content, t0 + Duration::from_millis(i as u64 * 20));
        }
        assert!(!ctl.is_rapid(t0 + 200 * MS));
    }

    #[test]
    fn test_missing_anchor_fails_open() {
        let (mut ctl, t0) = controller();
        ctl.on_scroll(300, VIEWPORT, ctl.content_height(), t0);
        ctl.tick(t0 + 100 * MS);

        // Layout that no longer contains the anchored day.
        let anchor_day = ctl.anchor().unwrap().day;
        let days: Vec<_> = ctl.days().iter().copied().filter(|d| *d != anchor_day).collect();
        ctl.on_layout(layout(&days), VIEWPORT);

        assert_eq!(ctl.scroll_offset(), 300);
        assert!(!ctl.is_extending());
        assert!(ctl.anchor().is_none());
    }

    #[test]
    fn test_scroll_near_bottom_appends_immediately() {
        let (mut ctl, t0) = controller();
        let content = ctl.content_height();
        let last = *ctl.days().last().unwrap();

        ctl.on_scroll(content - VIEWPORT - 100, VIEWPORT, content, t0);
        assert_eq!(ctl.days().len(), 46);
        assert_eq!(ctl.days()[36], last + Days::days(1));
        assert!(!ctl.is_extending());
    }

    #[test]
    fn test_middle_scroll_does_not_extend() {
        let (mut ctl, t0) = controller();
        ctl.on_scroll(2000, VIEWPORT, ctl.content_height(), t0);
        ctl.tick(t0 + 500 * MS);
        assert_eq!(ctl.days().len(), 36);
    }

    #[test]
    fn test_jump_to_today_discards_window_and_pending_extension() {
        let (mut ctl, t0) = controller();
        ctl.on_scroll(300, VIEWPORT, ctl.content_height(), t0);
        assert!(ctl.is_extending());

        let today = date(2027, 3, 14);
        assert_eq!(ctl.jump_to_today(today), today);
        assert!(!ctl.is_extending());
        assert_eq!(ctl.days().len(), 29);
        assert_eq!(ctl.days()[14], today);
        assert_eq!(ctl.days()[0], today - Days::days(14));

        // The cancelled prepend never fires.
        ctl.tick(t0 + 500 * MS);
        assert_eq!(ctl.days().len(), 29);

        render(&mut ctl);
        assert_eq!(ctl.scroll_offset(), offset_of(&ctl, today) - 48);
        assert_eq!(ctl.displayed_month(), Some(YearMonth::new(2027, 3)));
    }

    #[test]
    fn test_visible_day_debounced_and_month_only() {
        let (mut ctl, t0) = controller();
        let content = ctl.content_height();
        let nov_top = offset_of(&ctl, date(2026, 11, 1));

        ctl.on_scroll(nov_top - 80, VIEWPORT, content, t0);
        ctl.on_scroll(nov_top - 40, VIEWPORT, content, t0 + 100 * MS);
        // Debounce restarted by the second event.
        assert_eq!(ctl.tick(t0 + 250 * MS), None);
        assert_eq!(ctl.tick(t0 + 300 * MS), Some(date(2026, 11, 1)));

        // Still November: no repeated notification.
        ctl.on_scroll(nov_top, VIEWPORT, content, t0 + 400 * MS);
        assert_eq!(ctl.tick(t0 + 700 * MS), None);
    }

    #[test]
    fn test_scroll_by_clamps_and_still_extends_at_top() {
        let (mut ctl, t0) = controller();
        ctl.scroll_by(-100_000, t0);
        assert_eq!(ctl.scroll_offset(), 0);
        assert!(ctl.is_extending());
    }

    #[test]
    fn test_focus_day_inside_window_keeps_days() {
        let (mut ctl, _) = controller();
        let target = date(2026, 10, 30);
        ctl.focus_day(target);
        assert_eq!(ctl.days().len(), 36);
        render(&mut ctl);
        assert_eq!(ctl.scroll_offset(), offset_of(&ctl, target) - 48);

        let far = date(2027, 6, 1);
        ctl.focus_day(far);
        assert_eq!(ctl.days()[14], far);
    }
}

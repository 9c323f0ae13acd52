//! Timeline widget: draws the day rows intersecting the viewport.

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc, Weekday};
use daybook_engine::{events_on_day, CalendarEvent, DayBlock};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use super::layout::{day_rows, DayRow};
use crate::text::truncate_to_width;
use crate::theme::Theme;

/// Timeline pane widget.
pub struct TimelineWidget<'a> {
    blocks: &'a [DayBlock],
    scroll_offset: i64,
    events: &'a [CalendarEvent],
    today: NaiveDate,
    now: DateTime<Utc>,
    theme: &'a Theme,
}

impl<'a> TimelineWidget<'a> {
    pub fn new(
        blocks: &'a [DayBlock],
        scroll_offset: i64,
        events: &'a [CalendarEvent],
        now: DateTime<Utc>,
        theme: &'a Theme,
    ) -> Self {
        Self {
            blocks,
            scroll_offset,
            events,
            today: now.with_timezone(&Local).date_naive(),
            now,
            theme,
        }
    }

    fn header_line(&self, day: NaiveDate) -> Line<'static> {
        let label = day.format("%a %d %b").to_string();
        if day == self.today {
            let style = Style::default().fg(self.theme.today).add_modifier(Modifier::BOLD);
            return Line::from(vec![Span::styled(label, style), Span::styled("  Today", style)]);
        }

        let color = if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            self.theme.subtext
        } else {
            self.theme.text
        };
        Line::from(Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)))
    }

    fn event_line(&self, event: &CalendarEvent, width: usize) -> Line<'static> {
        let start = event.start.with_timezone(&Local).format("%H:%M");
        let end = event.end.with_timezone(&Local).format("%H:%M");
        let times = format!("{start}-{end}");
        let happening = event.is_happening(self.now);

        let mut spans = vec![
            Span::raw("  "),
            Span::styled("●", Style::default().fg(self.theme.event_color(event.display_color()))),
            Span::raw(" "),
            Span::styled(times, Style::default().fg(self.theme.muted)),
            Span::raw("  "),
        ];

        let suffix = if happening { "  now" } else { "" };
        let used: usize = spans.iter().map(|s| s.content.width()).sum();
        let title = truncate_to_width(&event.title, width.saturating_sub(used + suffix.width()));
        spans.push(Span::styled(title, Style::default().fg(self.theme.text)));
        if happening {
            spans.push(Span::styled(
                suffix,
                Style::default().fg(self.theme.success).add_modifier(Modifier::BOLD),
            ));
        }
        Line::from(spans)
    }

    fn row_line(&self, row: DayRow<'_>, width: usize) -> Line<'static> {
        match row {
            DayRow::Header(day) => self.header_line(day),
            DayRow::Event(event) => self.event_line(event, width),
            DayRow::Empty => Line::from(Span::styled(
                "  No events",
                Style::default().fg(self.theme.muted),
            )),
            DayRow::Gap => Line::default(),
        }
    }
}

impl Widget for TimelineWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        buf.set_style(area, Style::default().bg(self.theme.base));

        let top = self.scroll_offset;
        let bottom = top + i64::from(area.height);
        let width = usize::from(area.width);

        for block in self.blocks.iter().filter(|b| b.bottom() > top && b.top < bottom) {
            let events = events_on_day(self.events, block.day);
            for (row_top, row) in (block.top..).zip(day_rows(block.day, &events)) {
                let Ok(y) = u16::try_from(row_top - top) else {
                    continue;
                };
                if y >= area.height {
                    break;
                }
                Paragraph::new(self.row_line(row, width))
                    .render(Rect::new(area.x, area.y + y, area.width, 1), buf);
            }
        }
    }
}

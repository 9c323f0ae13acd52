//! Month screen: a calendar grid with per-day markers and the days ahead.

use chrono::{Datelike, Local, NaiveDate};
use daybook_engine::{count_on_day_in, upcoming_days, CalendarEvent, MonthGrid, YearMonth, WEEKDAY_LABELS};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use super::{month_label, render_header, Screen};
use crate::app::App;
use crate::text::truncate_to_width;
use crate::theme::Theme;
use crate::ui::{main_layout, KeyHint, StatusBar};

/// Days listed in the upcoming panel.
const UPCOMING_LIMIT: usize = 8;

/// Width of one grid cell: a right-aligned day number, a marker and a gap.
const CELL_WIDTH: u16 = 5;

const HINTS: [KeyHint; 4] = [
    KeyHint::new("h/l", "month"),
    KeyHint::new("t", "this month"),
    KeyHint::new("Enter", "open"),
    KeyHint::new("?", "help"),
];

/// Bordered month grid. Days with events carry their count as a superscript.
pub struct MonthGridWidget<'a> {
    month: YearMonth,
    events: &'a [CalendarEvent],
    today: NaiveDate,
    theme: &'a Theme,
}

impl<'a> MonthGridWidget<'a> {
    pub fn new(month: YearMonth, events: &'a [CalendarEvent], today: NaiveDate, theme: &'a Theme) -> Self {
        Self {
            month,
            events,
            today,
            theme,
        }
    }

    /// Outer width of the widget.
    pub const fn width() -> u16 {
        CELL_WIDTH * 7 + 2
    }

    fn cell(&self, day: Option<NaiveDate>) -> Span<'static> {
        let Some(day) = day else {
            return Span::raw("     ");
        };
        let count = count_on_day_in(self.events, day, &Local);
        let text = format!("{:>3}{} ", day.day(), count_marker(count));

        let style = if day == self.today {
            Style::default()
                .fg(self.theme.today)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else if count > 0 {
            Style::default().fg(self.theme.secondary)
        } else {
            Style::default().fg(self.theme.text)
        };
        Span::styled(text, style)
    }
}

impl Widget for MonthGridWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" {} ", month_label(self.month)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border))
            .style(Style::default().bg(self.theme.base));
        let inner = block.inner(area);
        block.render(area, buf);

        let Some(grid) = MonthGrid::new(self.month) else {
            return;
        };

        let mut lines = vec![Line::from(
            WEEKDAY_LABELS
                .iter()
                .map(|label| Span::styled(format!("{label:>3}  "), Style::default().fg(self.theme.muted)))
                .collect::<Vec<_>>(),
        )];
        for week in grid.weeks() {
            lines.push(Line::from(week.iter().map(|day| self.cell(*day)).collect::<Vec<_>>()));
        }

        Paragraph::new(lines).render(inner, buf);
    }
}

/// Superscript event count; blank for none, `⁺` past nine.
fn count_marker(count: usize) -> char {
    const DIGITS: [char; 10] = [' ', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];
    DIGITS.get(count).copied().unwrap_or('⁺')
}

/// Month screen.
pub struct MonthScreen;

impl MonthScreen {
    fn render_upcoming(app: &App, area: Rect, buf: &mut Buffer) {
        let theme = &app.theme;
        let block = Block::default()
            .title(" Upcoming ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border))
            .style(Style::default().bg(theme.base));
        let inner = block.inner(area);
        block.render(area, buf);

        let today = app.today();
        let from = if YearMonth::from(today) == app.month {
            Some(today)
        } else {
            app.month.first_day()
        };
        let days = from.map(|from| upcoming_days(app.store.events(), from, UPCOMING_LIMIT, &Local)).unwrap_or_default();

        if days.is_empty() {
            Paragraph::new(Line::styled(" Nothing planned", Style::default().fg(theme.muted))).render(inner, buf);
            return;
        }

        let width = usize::from(inner.width);
        let mut lines = Vec::new();
        for (day, events) in days {
            lines.push(Line::styled(
                format!(" {}", day.format("%a %d %b")),
                Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
            ));
            for event in events {
                let time = event.start.with_timezone(&Local).format("%H:%M").to_string();
                let title = truncate_to_width(&event.title, width.saturating_sub(10));
                lines.push(Line::from(vec![
                    Span::styled(format!("   {time}  "), Style::default().fg(theme.muted)),
                    Span::styled(title, Style::default().fg(theme.event_color(event.display_color()))),
                ]));
            }
        }
        Paragraph::new(lines).render(inner, buf);
    }
}

impl Screen for MonthScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let (header, body, status) = main_layout(area);
        render_header(app, &month_label(app.month), header, buf);

        let weeks = MonthGrid::new(app.month).map_or(6, |grid| grid.weeks().len());
        // Weekday row and borders around the weeks.
        let grid_height = u16::try_from(weeks).unwrap_or(6) + 3;
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(grid_height), Constraint::Min(3)])
            .split(body);

        let grid_area = Rect {
            width: MonthGridWidget::width().min(rows[0].width),
            ..rows[0]
        };
        MonthGridWidget::new(app.month, app.store.events(), app.today(), &app.theme).render(grid_area, buf);
        Self::render_upcoming(app, rows[1], buf);

        StatusBar::new(app.screen.title(), &app.theme)
            .hints(&HINTS)
            .right(app.notification.as_deref())
            .render(status, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Screen as AppScreen;
    use crate::event::Action;
    use crate::test_utils::{buffer_to_string, create_test_app_at_screen, render_screen_to_string, sample_events};
    use insta::assert_snapshot;

    #[test]
    fn test_month_grid() {
        let theme = Theme::mocha();
        let events = sample_events();
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let mut buf = Buffer::empty(Rect::new(0, 0, MonthGridWidget::width(), 8));

        MonthGridWidget::new(YearMonth::new(2026, 10), &events, today, &theme).render(buf.area, &mut buf);

        assert_snapshot!(buffer_to_string(&buf), @r"
        ┌ October 2026 ─────────────────────┐
        │ Mo   Tu   We   Th   Fr   Sa   Su  │
        │                 1    2    3    4  │
        │  5    6    7    8    9   10   11  │
        │ 12   13   14   15   16   17   18  │
        │ 19²  20   21¹  22   23   24   25  │
        │ 26   27   28   29   30   31       │
        └───────────────────────────────────┘
        ");
    }

    #[test]
    fn test_count_marker() {
        assert_eq!(count_marker(0), ' ');
        assert_eq!(count_marker(3), '³');
        assert_eq!(count_marker(12), '⁺');
    }

    #[test]
    fn test_month_screen_lists_upcoming_days() {
        let mut app = create_test_app_at_screen(AppScreen::Month);
        let out = render_screen_to_string(&MonthScreen, &mut app);

        assert!(out.lines().next().unwrap().starts_with(" daybook · October 2026"));
        assert!(out.contains("Upcoming"));
        assert!(out.contains(" Mon 19 Oct"));
        assert!(out.contains("   10:00  Standup"));
        assert!(out.contains(" Wed 21 Oct"));
    }

    #[test]
    fn test_month_screen_without_events() {
        let mut app = create_test_app_at_screen(AppScreen::Month);
        app.handle_action(Action::NextMonth);
        let out = render_screen_to_string(&MonthScreen, &mut app);

        assert!(out.contains("November 2026"));
        assert!(out.contains("Nothing planned"));
    }
}

//! Screen definitions for the daybook TUI.

pub mod chat;
pub mod month;
pub mod timeline;

use chrono::{Local, NaiveDate};
use daybook_engine::YearMonth;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::ui::centered_fixed;

/// Trait for screens that can be rendered.
pub trait Screen {
    /// Render the screen to the buffer.
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);
}

/// "October 2026".
pub fn month_label(month: YearMonth) -> String {
    month
        .first_day()
        .map_or_else(|| format!("{}-{:02}", month.year, month.month), |d: NaiveDate| d.format("%B %Y").to_string())
}

/// Top row shared by all screens: app name, a label and the clock.
pub fn render_header(app: &App, label: &str, area: Rect, buf: &mut Buffer) {
    let theme = &app.theme;
    let row = Rect::new(area.x, area.y, area.width, 1);
    buf.set_style(row, Style::default().bg(theme.base));

    let left = Line::from(vec![
        Span::styled(" daybook", Style::default().fg(theme.primary).add_modifier(Modifier::BOLD)),
        Span::styled(" · ", Style::default().fg(theme.muted)),
        Span::styled(label.to_string(), Style::default().fg(theme.text).add_modifier(Modifier::BOLD)),
    ]);
    buf.set_line(row.x, row.y, &left, row.width);

    let mut right = app.now.with_timezone(&Local).format("%a %d %b %H:%M").to_string();
    if app.sync_in_progress {
        right = format!("syncing · {right}");
    }
    let width = u16::try_from(right.width()).unwrap_or(u16::MAX);
    let left_width = u16::try_from(left.width()).unwrap_or(u16::MAX);
    if left_width.saturating_add(width).saturating_add(2) <= row.width {
        let x = row.x + row.width - width - 1;
        buf.set_string(x, row.y, &right, Style::default().fg(theme.subtext));
    }
}

/// Render the help overlay.
pub fn render_help_overlay(app: &App, area: Rect, buf: &mut Buffer) {
    let theme = &app.theme;
    let help_text = r"
  Timeline
    j/k or Up/Down    Scroll a row
    PgUp/PgDn         Scroll a page
    h/l               Previous/next month
    t                 Jump to today

  Month
    h/l               Previous/next month
    Enter             Open in timeline

  Anywhere
    1/2/3, Tab        Switch screen
    S / D             Sync / disconnect calendar
    T                 Toggle light/dark theme
    q                 Quit
    ?                 Toggle this help
";

    let width = 52.min(area.width.saturating_sub(4));
    let height = 22.min(area.height.saturating_sub(2));
    let overlay_area = centered_fixed(width, height, area);

    Clear.render(overlay_area, buf);

    let block = Block::default()
        .title(" Help ")
        .title_style(Style::default().fg(theme.primary).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused))
        .style(Style::default().fg(theme.text).bg(theme.base));

    Paragraph::new(help_text).block(block).render(overlay_area, buf);
}

/// Render the first-run tour.
pub fn render_tour_overlay(app: &App, area: Rect, buf: &mut Buffer) {
    let theme = &app.theme;
    let text = vec![
        Line::from(""),
        Line::from(" Your days scroll as one continuous timeline."),
        Line::from(" Earlier and later days load as you reach the edges."),
        Line::from(""),
        Line::from(" Press 2 for the month view and 3 to ask the"),
        Line::from(" assistant to add events or find free time."),
        Line::from(""),
        Line::from(vec![
            Span::styled(" Enter", Style::default().fg(theme.secondary)),
            Span::raw(" to start, "),
            Span::styled("?", Style::default().fg(theme.secondary)),
            Span::raw(" for keys"),
        ]),
    ];

    let overlay_area = centered_fixed(56.min(area.width), 11.min(area.height), area);
    Clear.render(overlay_area, buf);

    let block = Block::default()
        .title(" Welcome to daybook ")
        .title_style(Style::default().fg(theme.primary).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused))
        .style(Style::default().fg(theme.text).bg(theme.base));

    Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .render(overlay_area, buf);
}

//! Assistant screen: transcript and prompt.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use super::{render_header, Screen};
use crate::app::{App, ChatMessage, Role};
use crate::text::wrap_text;
use crate::theme::Theme;
use crate::ui::{main_layout, KeyHint, StatusBar};

const HINTS: [KeyHint; 4] = [
    KeyHint::new("Enter", "ask"),
    KeyHint::new("^N", "add event"),
    KeyHint::new("^S", "find time"),
    KeyHint::new("Esc", "back"),
];

const INTRO: [&str; 3] = [
    "Ask about your schedule, or describe an event to add it.",
    "  \"Lunch with Sam next Tuesday at 12:30\" then Ctrl+N",
    "  \"An hour for deep work this week\" then Ctrl+S",
];

/// Assistant screen.
pub struct ChatScreen;

impl ChatScreen {
    fn message_lines(message: &ChatMessage, width: usize, theme: &Theme) -> Vec<Line<'static>> {
        let (label, label_style, body_style) = match message.role {
            Role::User => (
                "You",
                Style::default().fg(theme.primary).add_modifier(Modifier::BOLD),
                Style::default().fg(theme.text),
            ),
            Role::Assistant => (
                "daybook",
                Style::default().fg(theme.secondary).add_modifier(Modifier::BOLD),
                Style::default().fg(theme.text),
            ),
            Role::Notice => (
                "·",
                Style::default().fg(theme.muted),
                Style::default().fg(theme.subtext).add_modifier(Modifier::ITALIC),
            ),
        };

        let mut lines = vec![Line::from(Span::styled(format!(" {label}"), label_style))];
        lines.extend(
            wrap_text(&message.content, width.saturating_sub(3).max(1))
                .into_iter()
                .map(|line| Line::from(Span::styled(format!("   {line}"), body_style))),
        );
        lines.push(Line::default());
        lines
    }

    /// All transcript lines, oldest first.
    fn transcript(app: &App, width: usize) -> Vec<Line<'static>> {
        let theme = &app.theme;
        if app.messages.is_empty() {
            return INTRO
                .iter()
                .map(|line| Line::from(Span::styled(format!(" {line}"), Style::default().fg(theme.muted))))
                .collect();
        }

        let mut lines: Vec<Line<'static>> = app
            .messages
            .iter()
            .flat_map(|m| Self::message_lines(m, width, theme))
            .collect();
        if app.chat_in_progress {
            lines.push(Line::from(Span::styled(
                "   Thinking...",
                Style::default().fg(theme.muted).add_modifier(Modifier::ITALIC),
            )));
        }
        lines
    }
}

impl Screen for ChatScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let (header, body, status) = main_layout(area);
        render_header(app, "Assistant", header, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(3)])
            .split(body);

        buf.set_style(chunks[0], Style::default().bg(app.theme.base));
        let lines = Self::transcript(app, usize::from(chunks[0].width));
        let height = usize::from(chunks[0].height);
        // Pin to the bottom, minus however far the user scrolled up.
        let max_scroll = lines.len().saturating_sub(height);
        let skip = max_scroll.saturating_sub(app.chat_scroll.min(max_scroll));
        Paragraph::new(lines.into_iter().skip(skip).take(height).collect::<Vec<_>>()).render(chunks[0], buf);

        let border = if app.chat_in_progress {
            app.theme.border
        } else {
            app.theme.border_focused
        };
        app.input
            .widget(&app.theme)
            .focused(!app.chat_in_progress)
            .placeholder(" Ask, or describe an event")
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(border)))
            .render(chunks[1], buf);

        StatusBar::new(app.screen.title(), &app.theme)
            .hints(&HINTS)
            .right(app.notification.as_deref())
            .render(status, buf);
    }
}

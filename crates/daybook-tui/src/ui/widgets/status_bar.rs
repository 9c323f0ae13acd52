//! Bottom status bar: screen label, key hints, and a right-aligned message.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::theme::Theme;

/// A key hint for the status bar.
#[derive(Debug, Clone, Copy)]
pub struct KeyHint {
    pub key: &'static str,
    pub label: &'static str,
}

impl KeyHint {
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

/// Status bar widget displayed at the bottom of the screen.
pub struct StatusBar<'a> {
    mode: &'a str,
    hints: &'a [KeyHint],
    right_text: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> StatusBar<'a> {
    pub fn new(mode: &'a str, theme: &'a Theme) -> Self {
        Self {
            mode,
            hints: &[],
            right_text: None,
            theme,
        }
    }

    #[must_use]
    pub fn hints(mut self, hints: &'a [KeyHint]) -> Self {
        self.hints = hints;
        self
    }

    /// Right-aligned text, e.g. a notification.
    #[must_use]
    pub fn right(mut self, text: Option<&'a str>) -> Self {
        self.right_text = text;
        self
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 {
            return;
        }

        let bar = Style::default().fg(self.theme.subtext).bg(self.theme.surface);
        buf.set_style(Rect::new(area.x, area.y, area.width, 1), bar);

        let mut spans = vec![
            Span::styled(
                format!(" {} ", self.mode),
                Style::default().fg(self.theme.base).bg(self.theme.primary),
            ),
            Span::styled(" ", bar),
        ];
        for hint in self.hints {
            spans.push(Span::styled(hint.key, bar.fg(self.theme.secondary)));
            spans.push(Span::styled(format!(" {}  ", hint.label), bar));
        }
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);

        if let Some(text) = self.right_text {
            let width = u16::try_from(text.width()).unwrap_or(u16::MAX);
            if width < area.width {
                let x = area.x + area.width - width - 1;
                buf.set_string(x, area.y, text, bar.fg(self.theme.warning));
            }
        }
    }
}

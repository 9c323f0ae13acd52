//! Single-line text input for the chat prompt.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::theme::Theme;

/// State for a text input: content, cursor and submitted history.
///
/// The cursor is a character index, not a byte offset.
#[derive(Debug, Clone, Default)]
pub struct TextInputState {
    content: String,
    cursor: usize,
    history: Vec<String>,
    /// Position while browsing history; `None` means editing fresh input.
    history_index: Option<usize>,
    saved_input: String,
}

impl TextInputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map_or(self.content.len(), |(i, _)| i)
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Insert a character at the cursor. Newlines are ignored.
    pub fn insert(&mut self, ch: char) {
        if ch == '\n' || ch == '\r' {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.content.insert(at, ch);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for ch in s.chars() {
            self.insert(ch);
        }
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.content.remove(at);
        }
    }

    /// Delete the character at the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index(self.cursor);
            self.content.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Take the trimmed content, recording it in history.
    pub fn submit(&mut self) -> String {
        let content = std::mem::take(&mut self.content).trim().to_string();
        self.cursor = 0;
        if !content.is_empty() {
            self.history.push(content.clone());
        }
        self.history_index = None;
        self.saved_input.clear();
        content
    }

    /// Step back through submitted inputs.
    pub fn history_prev(&mut self) {
        let next = match self.history_index {
            None if self.history.is_empty() => return,
            None => {
                self.saved_input = self.content.clone();
                0
            }
            Some(i) if i + 1 < self.history.len() => i + 1,
            Some(_) => return,
        };
        self.history_index = Some(next);
        self.content = self.history[self.history.len() - 1 - next].clone();
        self.move_end();
    }

    /// Step forward through history, restoring the unsent input at the end.
    pub fn history_next(&mut self) {
        match self.history_index {
            None => return,
            Some(0) => {
                self.history_index = None;
                self.content = std::mem::take(&mut self.saved_input);
            }
            Some(i) => {
                self.history_index = Some(i - 1);
                self.content = self.history[self.history.len() - i].clone();
            }
        }
        self.move_end();
    }

    /// Create a widget from this state.
    pub fn widget<'a>(&'a self, theme: &'a Theme) -> TextInput<'a> {
        TextInput {
            state: self,
            theme,
            block: None,
            focused: true,
            placeholder: None,
            prompt: "> ",
        }
    }
}

/// Renders a [`TextInputState`], scrolling horizontally to keep the cursor visible.
pub struct TextInput<'a> {
    state: &'a TextInputState,
    theme: &'a Theme,
    block: Option<Block<'a>>,
    focused: bool,
    placeholder: Option<&'a str>,
    prompt: &'a str,
}

impl<'a> TextInput<'a> {
    #[must_use]
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    #[must_use]
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }
}

impl Widget for TextInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };
        if inner.height < 1 || inner.width < 1 {
            return;
        }

        let text_style = Style::default().fg(self.theme.text);
        let cursor_style = Style::default().fg(self.theme.primary);
        let mut spans = vec![Span::styled(self.prompt, cursor_style)];

        if self.state.is_empty() {
            if self.focused {
                spans.push(Span::styled("_", cursor_style));
            }
            if let Some(placeholder) = self.placeholder {
                spans.push(Span::styled(placeholder, Style::default().fg(self.theme.muted)));
            }
        } else {
            let chars: Vec<char> = self.state.content.chars().collect();
            let cursor = self.state.cursor.min(chars.len());
            let budget = usize::from(inner.width).saturating_sub(self.prompt.width() + 1);
            // Keep the cursor on screen.
            let start = cursor.saturating_sub(budget);

            let before: String = chars[start..cursor].iter().collect();
            let after: String = chars[cursor..].iter().collect();
            spans.push(Span::styled(before, text_style));
            if self.focused {
                spans.push(Span::styled(if after.is_empty() { "_" } else { "|" }, cursor_style));
            }
            spans.push(Span::styled(after, text_style));
        }

        Paragraph::new(Line::from(spans)).render(inner, buf);
    }
}

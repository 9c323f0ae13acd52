//! Event handling for the daybook TUI.

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use std::time::Duration;
use tokio::sync::mpsc;

/// Events that can occur in the TUI.
#[derive(Debug, Clone)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// A mouse event occurred.
    Mouse(MouseEvent),
    /// A tick event for timers and UI updates.
    Tick,
    /// Terminal was resized.
    Resize(u16, u16),
}

/// Event handler that polls the terminal on a background thread.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    _tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new event handler with the specified tick rate.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let tx_clone = tx.clone();

        // crossterm polling blocks, so it gets its own thread
        std::thread::spawn(move || {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            loop {
                let event = if event::poll(tick_rate).unwrap_or(false) {
                    match event::read() {
                        Ok(CrosstermEvent::Key(key)) => Some(Event::Key(key)),
                        Ok(CrosstermEvent::Mouse(mouse)) => Some(Event::Mouse(mouse)),
                        Ok(CrosstermEvent::Resize(w, h)) => Some(Event::Resize(w, h)),
                        _ => None,
                    }
                } else {
                    Some(Event::Tick)
                };

                if let Some(e) = event {
                    if tx_clone.send(e).is_err() {
                        break;
                    }
                }
            }
        });

        Self { rx, _tx: tx }
    }

    /// Get the next event, waiting until one is available.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Key action that can be performed in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Help,
    Back,
    Select,
    Up,
    Down,
    PageUp,
    PageDown,
    /// Recenter the timeline (or month view) on today.
    Today,
    PrevMonth,
    NextMonth,
    NextScreen,
    PrevScreen,
    Screen(usize),
    ToggleTheme,
    Sync,
    Disconnect,
    None,
}

/// Convert a key event to an action.
pub fn key_to_action(key: KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('?') => Action::Help,
        KeyCode::Esc => Action::Back,
        KeyCode::Enter => Action::Select,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown | KeyCode::Char(' ') => Action::PageDown,
        KeyCode::Char('t') => Action::Today,
        KeyCode::Left | KeyCode::Char('h') => Action::PrevMonth,
        KeyCode::Right | KeyCode::Char('l') => Action::NextMonth,
        KeyCode::Char('T') => Action::ToggleTheme,
        KeyCode::Char('S') => Action::Sync,
        KeyCode::Char('D') => Action::Disconnect,
        KeyCode::Tab => Action::NextScreen,
        KeyCode::BackTab => Action::PrevScreen,
        KeyCode::Char('1') => Action::Screen(0),
        KeyCode::Char('2') => Action::Screen(1),
        KeyCode::Char('3') => Action::Screen(2),
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_navigation_keys() {
        assert_eq!(key_to_action(key(KeyCode::Char('j'))), Action::Down);
        assert_eq!(key_to_action(key(KeyCode::Up)), Action::Up);
        assert_eq!(key_to_action(key(KeyCode::Char('t'))), Action::Today);
        assert_eq!(key_to_action(key(KeyCode::Char('h'))), Action::PrevMonth);
        assert_eq!(key_to_action(key(KeyCode::BackTab)), Action::PrevScreen);
    }

    #[test]
    fn test_shifted_letters_are_distinct() {
        assert_eq!(key_to_action(key(KeyCode::Char('T'))), Action::ToggleTheme);
        assert_eq!(key_to_action(key(KeyCode::Char('S'))), Action::Sync);
        assert_eq!(key_to_action(key(KeyCode::Char('s'))), Action::None);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
    }
}

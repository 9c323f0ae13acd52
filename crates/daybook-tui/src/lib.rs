//! daybook-tui: Terminal UI for the daybook calendar
//!
//! This crate provides the TUI layer for daybook, including:
//! - The infinite-scroll timeline, month grid and assistant screens
//! - Key, mouse and tick event handling
//! - Background assistant requests and calendar sync

mod app;
mod event;
mod screens;
#[cfg(test)]
pub mod test_utils;
mod text;
mod theme;
mod timeline;
mod ui;

use screens::Screen as ScreenTrait;

pub use app::{App, Screen};
pub use daybook_engine;
pub use event::{Action, Event, EventHandler};

use std::io::{self, stdout};
use std::sync::Arc;
use std::time::Instant;

use crossterm::{
    cursor::Show as ShowCursor,
    event::{DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use daybook_engine::{
    assistant_available, sync_all, Assistant, AssistantReply, AssistantRequest, CommandModel, Config,
    DataPaths, GoogleCalendarClient, SyncError, SyncReport,
};
use ratatui::{backend::CrosstermBackend, buffer::Buffer, layout::Rect, Terminal};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use app::SyncJob;

type AssistantTask = JoinHandle<AssistantReply>;
type SyncTask = JoinHandle<(Result<SyncReport, SyncError>, bool)>;

/// RAII guard for terminal state restoration.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), DisableMouseCapture, LeaveAlternateScreen, ShowCursor);
    }
}

/// Run the TUI application.
///
/// Sets up the terminal, runs the event loop, and restores the terminal on exit.
pub async fn run_tui(paths: DataPaths, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if !assistant_available(&config.assistant) {
        warn!(model = %config.assistant.name, "Assistant command not found on PATH");
    }
    let assistant = Arc::new(Assistant::new(CommandModel::new(config.assistant.clone())));
    let mut app = App::new(paths, config);

    enable_raw_mode()?;
    let _guard = TerminalGuard;

    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 4 Hz tick rate
    let mut events = EventHandler::new(250);

    let result = run_loop(&mut terminal, &mut app, &mut events, &assistant).await;

    terminal.show_cursor()?;
    info!("TUI closed");
    result
}

/// Draw the current screen and any overlay.
fn render_app(app: &App, area: Rect, buf: &mut Buffer) {
    match app.screen {
        Screen::Timeline => screens::timeline::TimelineScreen.render(app, area, buf),
        Screen::Month => screens::month::MonthScreen.render(app, area, buf),
        Screen::Chat => screens::chat::ChatScreen.render(app, area, buf),
    }

    if app.show_tour {
        screens::render_tour_overlay(app, area, buf);
    } else if app.show_help {
        screens::render_help_overlay(app, area, buf);
    }
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
    assistant: &Arc<Assistant<CommandModel>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut assistant_handles: Vec<AssistantTask> = Vec::new();
    let mut sync_handles: Vec<SyncTask> = Vec::new();

    loop {
        terminal.draw(|frame| {
            let area = frame.area();
            app.prepare_frame(area);
            render_app(app, area, frame.buffer_mut());
        })?;

        if let Some(job) = app.take_sync_job() {
            sync_handles.push(tokio::spawn(run_sync(job)));
        }

        if let Some(event) = events.next().await {
            match event {
                Event::Key(key) => {
                    let outcome = if app.screen == Screen::Chat && !app.show_help && !app.show_tour {
                        handle_chat_key(app, key)
                    } else {
                        ChatKey::Ignored
                    };
                    match outcome {
                        ChatKey::Handled => {}
                        ChatKey::Submit(request) => {
                            assistant_handles.push(spawn_assistant(assistant, request, app));
                        }
                        ChatKey::Ignored => app.handle_action(event::key_to_action(key)),
                    }
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp if app.screen == Screen::Timeline => {
                        app.scroll_timeline(-app::WHEEL_ROWS, Instant::now());
                    }
                    MouseEventKind::ScrollDown if app.screen == Screen::Timeline => {
                        app.scroll_timeline(app::WHEEL_ROWS, Instant::now());
                    }
                    MouseEventKind::ScrollUp => app.handle_action(Action::Up),
                    MouseEventKind::ScrollDown => app.handle_action(Action::Down),
                    _ => {}
                },
                Event::Tick => app.tick(Instant::now()),
                // The next draw picks up the new size.
                Event::Resize(_, _) => {}
            }
        }

        for reply in collect_finished(&mut assistant_handles).await {
            app.apply_assistant_reply(reply);
        }
        for (result, explicit) in collect_finished(&mut sync_handles).await {
            app.apply_sync_result(result, explicit);
        }

        if app.should_quit {
            for handle in assistant_handles {
                handle.abort();
            }
            for handle in sync_handles {
                handle.abort();
            }
            break;
        }
    }

    Ok(())
}

/// Remove and await the handles that have finished. Panicked tasks are logged and dropped.
async fn collect_finished<T>(handles: &mut Vec<JoinHandle<T>>) -> Vec<T> {
    let mut results = Vec::new();
    let mut i = 0;
    while i < handles.len() {
        if handles[i].is_finished() {
            match handles.remove(i).await {
                Ok(value) => results.push(value),
                Err(e) => warn!(error = %e, "Background task failed"),
            }
        } else {
            i += 1;
        }
    }
    results
}

fn spawn_assistant(assistant: &Arc<Assistant<CommandModel>>, request: AssistantRequest, app: &App) -> AssistantTask {
    let assistant = Arc::clone(assistant);
    let events = app.store.events().to_vec();
    let now = app.now;
    tokio::spawn(async move { assistant.respond(&request, &events, now).await })
}

async fn run_sync(job: SyncJob) -> (Result<SyncReport, SyncError>, bool) {
    let SyncJob { token, range, explicit } = job;
    let result = match GoogleCalendarClient::connect(token) {
        Ok(client) => {
            let report = sync_all(&client, range).await;
            client.disconnect();
            report
        }
        Err(e) => Err(e),
    };
    (result, explicit)
}

/// What the chat screen did with a key.
#[derive(Debug, PartialEq, Eq)]
enum ChatKey {
    /// Not a text-editing key; treat it as a normal action.
    Ignored,
    Handled,
    Submit(AssistantRequest),
}

/// Route a key to the chat input.
///
/// `Enter` asks, `Ctrl+N` extracts an event and `Ctrl+S` asks for free slots.
fn handle_chat_key(app: &mut App, key: KeyEvent) -> ChatKey {
    fn submit(app: &mut App, make: fn(String) -> AssistantRequest) -> ChatKey {
        app.submit_chat(make).map_or(ChatKey::Handled, ChatKey::Submit)
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('n') => submit(app, AssistantRequest::ExtractEvent),
            KeyCode::Char('s') => submit(app, AssistantRequest::SuggestSlots),
            _ => ChatKey::Ignored,
        };
    }

    match key.code {
        KeyCode::Enter => submit(app, AssistantRequest::Ask),
        KeyCode::Char(c) => {
            app.input.insert(c);
            ChatKey::Handled
        }
        KeyCode::Backspace => {
            app.input.backspace();
            ChatKey::Handled
        }
        KeyCode::Delete => {
            app.input.delete();
            ChatKey::Handled
        }
        KeyCode::Left => {
            app.input.move_left();
            ChatKey::Handled
        }
        KeyCode::Right => {
            app.input.move_right();
            ChatKey::Handled
        }
        KeyCode::Home => {
            app.input.move_home();
            ChatKey::Handled
        }
        KeyCode::End => {
            app.input.move_end();
            ChatKey::Handled
        }
        KeyCode::Up => {
            app.input.history_prev();
            ChatKey::Handled
        }
        KeyCode::Down => {
            app.input.history_next();
            ChatKey::Handled
        }
        // Esc, Tab and paging fall through to actions.
        _ => ChatKey::Ignored,
    }
}

/// Get the TUI version.
pub fn tui_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tui_version() {
        let version = tui_version();
        assert!(!version.is_empty());
        assert!(version.starts_with("0."));
    }

    #[tokio::test]
    async fn test_collect_finished_keeps_running_tasks() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut handles = vec![
            tokio::spawn(async { 1 }),
            tokio::spawn(async move {
                let _ = rx.await;
                2
            }),
        ];
        while !handles[0].is_finished() {
            tokio::task::yield_now().await;
        }

        assert_eq!(collect_finished(&mut handles).await, vec![1]);
        assert_eq!(handles.len(), 1);

        tx.send(()).unwrap();
        while !handles[0].is_finished() {
            tokio::task::yield_now().await;
        }
        assert_eq!(collect_finished(&mut handles).await, vec![2]);
        assert!(handles.is_empty());
    }

    #[tokio::test]
    async fn test_sync_without_token_reports_error() {
        let job = SyncJob {
            token: "  ".into(),
            range: daybook_engine::SyncRange::around(chrono::Utc::now(), 1, 1),
            explicit: true,
        };
        let (result, explicit) = run_sync(job).await;
        assert!(matches!(result, Err(SyncError::MissingToken(_))));
        assert!(explicit);
    }
}

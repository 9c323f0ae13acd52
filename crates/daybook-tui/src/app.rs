//! Application state and update logic for the daybook TUI.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, NaiveDate, Utc};
use daybook_engine::{
    disconnect_source, AssistantReply, AssistantRequest, CalendarEvent, Config, DataPaths,
    EventStore, ScrollTuning, Settings, SlotSuggestion, SyncError, SyncRange, SyncReport,
    TimelineController, YearMonth, GOOGLE_SOURCE,
};
use ratatui::layout::Rect;
use tracing::{info, warn};

use crate::event::Action;
use crate::theme::Theme;
use crate::timeline::layout_days;
use crate::ui::layout::main_layout;
use crate::ui::widgets::TextInputState;

/// How often the wall clock is re-read.
const CLOCK_REFRESH: Duration = Duration::from_secs(60);

/// Ticks a notification stays visible (at 4 Hz).
const NOTIFICATION_TICKS: usize = 16;

/// Rows scrolled per mouse wheel notch.
pub const WHEEL_ROWS: i64 = 3;

/// The current screen being displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Timeline,
    Month,
    Chat,
}

impl Screen {
    pub const ALL: [Screen; 3] = [Screen::Timeline, Screen::Month, Screen::Chat];

    pub fn title(self) -> &'static str {
        match self {
            Self::Timeline => "Timeline",
            Self::Month => "Month",
            Self::Chat => "Assistant",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    /// Status lines such as "Added ..." or the fallback message.
    Notice,
}

/// A message in the assistant transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// A sync the run loop should start.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub token: String,
    pub range: SyncRange,
    /// Started by the user, so failures are reported rather than only logged.
    pub explicit: bool,
}

/// Application state.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug)]
pub struct App {
    /// Whether the app should quit.
    pub should_quit: bool,

    /// Whether the help overlay is visible.
    pub show_help: bool,

    /// Whether the first-run tour is visible.
    pub show_tour: bool,

    /// Current screen.
    pub screen: Screen,

    pub store: EventStore,
    pub settings: Settings,
    pub config: Config,
    pub theme: Theme,

    /// Day window and scroll state of the timeline.
    pub timeline: TimelineController,

    /// Month shown in the timeline header, following the visible day.
    pub header_month: YearMonth,

    /// Month shown on the month screen.
    pub month: YearMonth,

    /// Wall clock, refreshed every minute.
    pub now: DateTime<Utc>,

    // === Assistant state ===
    pub messages: Vec<ChatMessage>,
    pub input: TextInputState,
    pub chat_in_progress: bool,
    /// Transcript rows scrolled up from the bottom.
    pub chat_scroll: usize,

    pub sync_in_progress: bool,
    pending_sync: Option<SyncJob>,
    /// The in-flight sync was started before a disconnect.
    discard_sync: bool,

    /// Notification message (cleared after some ticks).
    pub notification: Option<String>,
    notification_ttl: usize,

    paths: Option<DataPaths>,
    clock_read_at: Instant,
}

impl App {
    /// Load state from the data directory.
    ///
    /// Queues an automatic sync when a calendar is connected.
    pub fn new(paths: DataPaths, config: Config) -> Self {
        let store = EventStore::load_or_default(&paths.events());
        let settings = Settings::load(&paths.settings());
        info!(events = store.len(), connected = settings.calendar_connected, "Loaded calendar");

        let mut app = Self::with_state(store, settings, config, Utc::now());
        app.paths = Some(paths);

        if app.settings.calendar_connected && app.config.sync.auto_sync {
            app.queue_sync(false);
        }
        app
    }

    /// Build an app around existing state without touching the disk.
    pub fn with_state(store: EventStore, settings: Settings, config: Config, now: DateTime<Utc>) -> Self {
        let today = now.with_timezone(&Local).date_naive();
        let tuning = config.timeline.unwrap_or_else(ScrollTuning::rows);

        Self {
            should_quit: false,
            show_help: false,
            show_tour: !settings.tour_completed,
            screen: Screen::default(),
            store,
            theme: Theme::for_mode(settings.theme),
            settings,
            config,
            timeline: TimelineController::new(today, tuning),
            header_month: today.into(),
            month: today.into(),
            now,
            messages: Vec::new(),
            input: TextInputState::new(),
            chat_in_progress: false,
            chat_scroll: 0,
            sync_in_progress: false,
            pending_sync: None,
            discard_sync: false,
            notification: None,
            notification_ttl: 0,
            paths: None,
            clock_read_at: Instant::now(),
        }
    }

    /// Today's date in local time.
    pub fn today(&self) -> NaiveDate {
        self.now.with_timezone(&Local).date_naive()
    }

    /// Show a temporary notification in the status bar.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notification = Some(message.into());
        self.notification_ttl = NOTIFICATION_TICKS;
    }

    /// Re-read the wall clock.
    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    /// Advance timers.
    pub fn tick(&mut self, instant: Instant) {
        if let Some(day) = self.timeline.tick(instant) {
            self.header_month = day.into();
        }

        if instant.saturating_duration_since(self.clock_read_at) >= CLOCK_REFRESH {
            self.clock_read_at = instant;
            self.set_now(Utc::now());
        }

        if self.notification_ttl > 0 {
            self.notification_ttl -= 1;
            if self.notification_ttl == 0 {
                self.notification = None;
            }
        }
    }

    /// Lay out the timeline for a viewport of `rows` rows.
    pub fn layout_timeline(&mut self, rows: u16) {
        let blocks = layout_days(self.timeline.days(), self.store.events());
        self.timeline.on_layout(blocks, i64::from(rows));
    }

    /// Bring derived layout up to date before drawing into `area`.
    pub fn prepare_frame(&mut self, area: Rect) {
        let (_, body, _) = main_layout(area);
        self.layout_timeline(body.height);
    }

    /// Handle an action.
    pub fn handle_action(&mut self, action: Action) {
        self.handle_action_at(action, Instant::now());
    }

    /// Handle an action at `instant`.
    pub fn handle_action_at(&mut self, action: Action, instant: Instant) {
        if self.show_tour {
            if matches!(action, Action::Select | Action::Back | Action::Quit) {
                self.dismiss_tour();
            }
            return;
        }

        if self.show_help {
            if matches!(action, Action::Help | Action::Back | Action::Quit | Action::Select) {
                self.show_help = false;
            }
            return;
        }

        match action {
            Action::Quit => self.should_quit = true,
            Action::Help => self.show_help = true,
            Action::Back => {
                if self.screen != Screen::Timeline {
                    self.screen = Screen::Timeline;
                }
            }
            Action::NextScreen => self.screen = self.screen.next(),
            Action::PrevScreen => self.screen = self.screen.prev(),
            Action::Screen(i) => {
                if let Some(screen) = Screen::ALL.get(i) {
                    self.screen = *screen;
                }
            }
            Action::ToggleTheme => self.toggle_theme(),
            Action::Sync => self.queue_sync(true),
            Action::Disconnect => self.disconnect(),
            _ => match self.screen {
                Screen::Timeline => self.handle_timeline_action(action, instant),
                Screen::Month => self.handle_month_action(action),
                Screen::Chat => self.handle_chat_action(action),
            },
        }
    }

    fn handle_timeline_action(&mut self, action: Action, instant: Instant) {
        let page = (self.timeline.viewport_height() - 2).max(1);
        match action {
            Action::Up => self.scroll_timeline(-1, instant),
            Action::Down => self.scroll_timeline(1, instant),
            Action::PageUp => self.scroll_timeline(-page, instant),
            Action::PageDown => self.scroll_timeline(page, instant),
            Action::Today => self.jump_to_today(),
            Action::PrevMonth => self.focus_month(self.header_month.prev()),
            Action::NextMonth => self.focus_month(self.header_month.next()),
            _ => {}
        }
    }

    fn handle_month_action(&mut self, action: Action) {
        match action {
            Action::PrevMonth | Action::Up => self.month = self.month.prev(),
            Action::NextMonth | Action::Down => self.month = self.month.next(),
            Action::Today => self.month = self.today().into(),
            Action::Select => {
                self.focus_month(self.month);
                self.screen = Screen::Timeline;
            }
            _ => {}
        }
    }

    fn handle_chat_action(&mut self, action: Action) {
        match action {
            Action::Up => self.chat_scroll = self.chat_scroll.saturating_add(1),
            Action::Down => self.chat_scroll = self.chat_scroll.saturating_sub(1),
            Action::PageUp => self.chat_scroll = self.chat_scroll.saturating_add(10),
            Action::PageDown => self.chat_scroll = self.chat_scroll.saturating_sub(10),
            _ => {}
        }
    }

    /// Scroll the timeline by `delta` rows.
    pub fn scroll_timeline(&mut self, delta: i64, instant: Instant) {
        self.timeline.scroll_by(delta, instant);
    }

    /// Recenter the timeline on today.
    pub fn jump_to_today(&mut self) {
        let day = self.timeline.jump_to_today(self.today());
        self.header_month = day.into();
        self.month = day.into();
    }

    /// Align the timeline to `month`: today within the current month, else its first day.
    fn focus_month(&mut self, month: YearMonth) {
        let today = self.today();
        let target = if YearMonth::from(today) == month {
            Some(today)
        } else {
            month.first_day()
        };
        if let Some(day) = target {
            self.header_month = self.timeline.focus_day(day).into();
        }
    }

    fn toggle_theme(&mut self) {
        self.settings.theme = self.settings.theme.toggled();
        self.theme = Theme::for_mode(self.settings.theme);
        self.save_settings();
    }

    fn dismiss_tour(&mut self) {
        self.show_tour = false;
        self.settings.tour_completed = true;
        self.save_settings();
    }

    // === Assistant ===

    /// Take the chat input as a request, recording it in the transcript.
    ///
    /// Returns `None` for empty input or while a request is in flight.
    pub fn submit_chat(&mut self, make: fn(String) -> AssistantRequest) -> Option<AssistantRequest> {
        if self.chat_in_progress || self.input.content().trim().is_empty() {
            return None;
        }
        let text = self.input.submit();
        self.messages.push(ChatMessage {
            role: Role::User,
            content: text.clone(),
        });
        self.chat_in_progress = true;
        self.chat_scroll = 0;
        Some(make(text))
    }

    /// Apply a finished assistant request.
    pub fn apply_assistant_reply(&mut self, reply: AssistantReply) {
        self.chat_in_progress = false;
        self.chat_scroll = 0;

        let (role, content) = match reply {
            AssistantReply::Event(event) => (Role::Notice, self.add_event(event)),
            AssistantReply::Slots(slots) => (Role::Assistant, format_slots(&slots)),
            AssistantReply::Answer(text) => (Role::Assistant, text),
            AssistantReply::Fallback(text) => (Role::Notice, text),
        };
        self.messages.push(ChatMessage { role, content });
    }

    /// Store a new event and bring its day into view.
    fn add_event(&mut self, event: CalendarEvent) -> String {
        let local_start = event.start.with_timezone(&Local);
        let summary = format!("Added \"{}\" on {}", event.title, local_start.format("%a %d %b %H:%M"));
        self.store.add(event);
        self.save_store();
        self.timeline.focus_day(local_start.date_naive());
        self.header_month = local_start.date_naive().into();
        summary
    }

    // === Sync ===

    /// Queue a sync for the run loop to start.
    pub fn queue_sync(&mut self, explicit: bool) {
        if self.sync_in_progress || self.pending_sync.is_some() {
            return;
        }
        let Some(token) = self.config.sync.token() else {
            if explicit {
                self.notify(format!("Set {} to sync Google Calendar", self.config.sync.token_env));
            } else {
                warn!(env = %self.config.sync.token_env, "Calendar connected but no token; skipping auto-sync");
            }
            return;
        };

        let range = SyncRange::around(self.now, self.config.sync.days_back, self.config.sync.days_forward);
        self.pending_sync = Some(SyncJob { token, range, explicit });
        if explicit {
            self.notify("Syncing...");
        }
    }

    /// Hand the queued sync to the run loop.
    pub fn take_sync_job(&mut self) -> Option<SyncJob> {
        let job = self.pending_sync.take()?;
        self.sync_in_progress = true;
        Some(job)
    }

    /// Apply a finished sync.
    pub fn apply_sync_result(&mut self, result: Result<SyncReport, SyncError>, explicit: bool) {
        self.sync_in_progress = false;
        if std::mem::take(&mut self.discard_sync) {
            info!("Dropping calendar sync that finished after disconnect");
            return;
        }
        match result {
            Ok(report) => {
                let failed = report.failed_calendars.len();
                let added = report.apply(&mut self.store);
                self.save_store();
                info!(added, failed, "Applied calendar sync");

                if explicit {
                    if !self.settings.calendar_connected {
                        self.settings.calendar_connected = true;
                        self.save_settings();
                    }
                    let mut message = format!("Synced {added} new events");
                    if failed > 0 {
                        let _ = write!(message, " ({failed} calendars failed)");
                    }
                    self.notify(message);
                }
            }
            Err(e) => {
                warn!(error = %e, explicit, "Calendar sync failed");
                if explicit {
                    self.notify(format!("Sync failed: {e}"));
                }
            }
        }
    }

    /// Remove synced events and forget the connection.
    pub fn disconnect(&mut self) {
        let removed = disconnect_source(&mut self.store, GOOGLE_SOURCE);
        self.settings.calendar_connected = false;
        self.pending_sync = None;
        self.discard_sync = self.sync_in_progress;
        self.save_store();
        self.save_settings();
        self.notify(format!("Disconnected; removed {removed} synced events"));
    }

    // === Persistence ===

    fn save_store(&mut self) {
        let Some(path) = self.paths.as_ref().map(DataPaths::events) else {
            return;
        };
        if let Err(e) = self.store.save(&path) {
            warn!(path = %path.display(), error = %e, "Failed to save events");
            self.notify(format!("Could not save events: {e}"));
        }
    }

    fn save_settings(&mut self) {
        let Some(path) = self.paths.as_ref().map(DataPaths::settings) else {
            return;
        };
        if let Err(e) = self.settings.save(&path) {
            warn!(path = %path.display(), error = %e, "Failed to save settings");
        }
    }
}

fn format_slots(slots: &[SlotSuggestion]) -> String {
    if slots.is_empty() {
        return "No free slots found.".to_string();
    }
    let mut out = String::from("Suggested times:");
    for (i, slot) in slots.iter().enumerate() {
        let start = slot.start.with_timezone(&Local);
        let end = slot.end.with_timezone(&Local);
        let _ = write!(out, "\n{}. {} {}-{}", i + 1, start.format("%a %d %b"), start.format("%H:%M"), end.format("%H:%M"));
        if !slot.reason.is_empty() {
            let _ = write!(out, "  {}", slot.reason);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_app, test_now};
    use chrono::{Duration as Days, TimeZone};
    use tempfile::TempDir;

    #[test]
    fn test_screen_cycle() {
        assert_eq!(Screen::Timeline.next(), Screen::Month);
        assert_eq!(Screen::Timeline.prev(), Screen::Chat);
        assert_eq!(Screen::Chat.next(), Screen::Timeline);
    }

    #[test]
    fn test_initial_state() {
        let app = create_test_app();
        assert_eq!(app.screen, Screen::Timeline);
        assert_eq!(app.header_month, YearMonth::new(2026, 10));
        assert_eq!(app.today(), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert!(!app.show_tour);
    }

    #[test]
    fn test_tour_shown_until_dismissed() {
        let mut app = App::with_state(EventStore::new(), Settings::default(), Config::default(), test_now());
        assert!(app.show_tour);

        app.handle_action(Action::Down);
        assert!(app.show_tour);

        app.handle_action(Action::Select);
        assert!(!app.show_tour);
        assert!(app.settings.tour_completed);
    }

    #[test]
    fn test_layout_aligns_today() {
        let mut app = create_test_app();
        app.layout_timeline(20);
        let today = app.today();
        let block = app.timeline.blocks().iter().find(|b| b.day == today).copied().unwrap();
        assert_eq!(app.timeline.scroll_offset(), block.top - 1);
    }

    #[test]
    fn test_scroll_and_jump_to_today() {
        let mut app = create_test_app();
        app.layout_timeline(20);
        let aligned = app.timeline.scroll_offset();

        app.handle_action(Action::Down);
        app.handle_action(Action::Down);
        assert_eq!(app.timeline.scroll_offset(), aligned + 2);

        app.handle_action(Action::Today);
        app.layout_timeline(20);
        assert_eq!(app.timeline.scroll_offset(), aligned);
    }

    #[test]
    fn test_month_navigation() {
        let mut app = create_test_app();
        app.handle_action(Action::Screen(1));
        assert_eq!(app.screen, Screen::Month);

        app.handle_action(Action::NextMonth);
        app.handle_action(Action::NextMonth);
        assert_eq!(app.month, YearMonth::new(2026, 12));
        app.handle_action(Action::NextMonth);
        assert_eq!(app.month, YearMonth::new(2027, 1));

        app.handle_action(Action::Today);
        assert_eq!(app.month, YearMonth::new(2026, 10));

        app.handle_action(Action::PrevMonth);
        app.handle_action(Action::Select);
        assert_eq!(app.screen, Screen::Timeline);
        assert_eq!(app.header_month, YearMonth::new(2026, 9));
    }

    #[test]
    fn test_theme_toggle() {
        let mut app = create_test_app();
        app.handle_action(Action::ToggleTheme);
        assert_eq!(app.settings.theme, daybook_engine::ThemeMode::Light);
        assert!(matches!(app.theme.base, ratatui::style::Color::Rgb(239, 241, 245)));
    }

    #[test]
    fn test_submit_chat_records_message() {
        let mut app = create_test_app();
        assert!(app.submit_chat(AssistantRequest::Ask).is_none());

        app.input.insert_str("What is on friday?");
        let request = app.submit_chat(AssistantRequest::Ask);
        assert_eq!(request, Some(AssistantRequest::Ask("What is on friday?".into())));
        assert!(app.chat_in_progress);
        assert_eq!(app.messages.len(), 1);

        // A second request waits for the first.
        app.input.insert_str("again");
        assert!(app.submit_chat(AssistantRequest::Ask).is_none());
    }

    #[test]
    fn test_extracted_event_is_added() {
        let mut app = create_test_app();
        let before = app.store.len();
        let start = Local.with_ymd_and_hms(2026, 11, 3, 15, 0, 0).unwrap().with_timezone(&Utc);
        let event = CalendarEvent::new("Dentist", start, start + Days::minutes(30));

        app.chat_in_progress = true;
        app.apply_assistant_reply(AssistantReply::Event(event));

        assert_eq!(app.store.len(), before + 1);
        assert!(!app.chat_in_progress);
        assert_eq!(app.header_month, YearMonth::new(2026, 11));
        let last = app.messages.last().unwrap();
        assert_eq!(last.role, Role::Notice);
        assert!(last.content.starts_with("Added \"Dentist\" on Tue 03 Nov"));
    }

    #[test]
    fn test_fallback_reply_is_a_notice() {
        let mut app = create_test_app();
        app.apply_assistant_reply(AssistantReply::Fallback(daybook_engine::FALLBACK_MESSAGE.into()));
        assert_eq!(app.messages[0].role, Role::Notice);
    }

    #[test]
    fn test_slots_are_listed() {
        let start = Local.with_ymd_and_hms(2026, 10, 20, 10, 0, 0).unwrap().with_timezone(&Utc);
        let text = format_slots(&[SlotSuggestion {
            start,
            end: start + Days::hours(1),
            reason: "quiet morning".into(),
        }]);
        assert_eq!(text, "Suggested times:\n1. Tue 20 Oct 10:00-11:00  quiet morning");
        assert_eq!(format_slots(&[]), "No free slots found.");
    }

    #[test]
    fn test_sync_results() {
        let mut app = create_test_app();
        let start = Utc.with_ymd_and_hms(2026, 10, 21, 9, 0, 0).unwrap();
        let mut remote = CalendarEvent::new("Remote", start, start + Days::hours(1)).with_source(GOOGLE_SOURCE);
        remote.id = "google:1".into();

        let report = SyncReport {
            events: vec![remote],
            failed_calendars: vec!["Team".into()],
        };
        app.sync_in_progress = true;
        app.apply_sync_result(Ok(report), true);
        assert!(!app.sync_in_progress);
        assert!(app.settings.calendar_connected);
        assert_eq!(app.notification.as_deref(), Some("Synced 1 new events (1 calendars failed)"));

        app.notification = None;
        app.apply_sync_result(Err(SyncError::NoCalendars), false);
        assert!(app.notification.is_none());

        app.disconnect();
        assert!(!app.settings.calendar_connected);
        assert!(app.store.events().iter().all(|e| !e.is_external()));
    }

    #[test]
    fn test_sync_landing_after_disconnect_is_dropped() {
        let mut app = create_test_app();
        app.settings.calendar_connected = true;
        app.sync_in_progress = true;
        app.disconnect();

        let start = Utc.with_ymd_and_hms(2026, 10, 22, 9, 0, 0).unwrap();
        let mut remote = CalendarEvent::new("Remote", start, start + Days::hours(1)).with_source(GOOGLE_SOURCE);
        remote.id = "google:1".into();
        app.apply_sync_result(
            Ok(SyncReport {
                events: vec![remote.clone()],
                failed_calendars: Vec::new(),
            }),
            false,
        );
        assert!(!app.sync_in_progress);
        assert!(!app.settings.calendar_connected);
        assert!(app.store.events().iter().all(|e| !e.is_external()));

        // Later syncs apply again.
        app.sync_in_progress = true;
        app.apply_sync_result(
            Ok(SyncReport {
                events: vec![remote],
                failed_calendars: Vec::new(),
            }),
            true,
        );
        assert!(app.settings.calendar_connected);
        assert_eq!(app.store.events().iter().filter(|e| e.is_external()).count(), 1);
    }

    #[test]
    fn test_state_persists_in_data_dir() {
        let temp = TempDir::new().unwrap();
        let mut app = App::new(DataPaths::new(temp.path()), Config::default());
        assert!(app.show_tour);
        assert!(app.store.is_empty());

        app.handle_action(Action::Select);
        let start = Utc.with_ymd_and_hms(2026, 11, 3, 15, 0, 0).unwrap();
        app.apply_assistant_reply(AssistantReply::Event(CalendarEvent::new(
            "Dentist",
            start,
            start + Days::minutes(30),
        )));

        let reloaded = App::new(DataPaths::new(temp.path()), Config::default());
        assert!(!reloaded.show_tour);
        assert_eq!(reloaded.store.len(), 1);
        assert_eq!(reloaded.store.events()[0].title, "Dentist");
        assert!(!reloaded.sync_in_progress);
    }

    #[test]
    fn test_notification_expires() {
        let mut app = create_test_app();
        app.notify("Hello");
        let start = Instant::now();
        for _ in 0..NOTIFICATION_TICKS {
            app.tick(start);
        }
        assert!(app.notification.is_none());
    }

    #[test]
    fn test_help_overlay_swallows_actions() {
        let mut app = create_test_app();
        app.handle_action(Action::Help);
        assert!(app.show_help);

        app.handle_action(Action::Screen(2));
        assert_eq!(app.screen, Screen::Timeline);

        app.handle_action(Action::Quit);
        assert!(!app.show_help);
        assert!(!app.should_quit);
    }
}

//! Test utilities for daybook-tui rendering tests.
//!
//! Helpers for building apps with a fixed clock, rendering screens and
//! converting buffers to strings.

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use daybook_engine::{CalendarEvent, Config, EventCategory, EventStore, Settings};
use ratatui::{backend::TestBackend, buffer::Buffer, layout::Rect, Terminal};

use crate::app::{App, Screen};
use crate::screens::Screen as ScreenTrait;

/// Default terminal width for tests.
pub const TEST_WIDTH: u16 = 80;

/// Default terminal height for tests.
pub const TEST_HEIGHT: u16 = 24;

/// Create a test terminal with the default dimensions (80x24).
pub fn create_test_terminal() -> Terminal<TestBackend> {
    Terminal::new(TestBackend::new(TEST_WIDTH, TEST_HEIGHT)).expect("Failed to create test terminal")
}

/// A local wall-clock time in October 2026.
pub fn local_time(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(2026, 10, day, hour, minute, 0)
        .single()
        .expect("unambiguous local time")
        .with_timezone(&Utc)
}

/// The fixed "now" used by tests: Monday 19 October 2026, 10:30 local.
pub fn test_now() -> DateTime<Utc> {
    local_time(19, 10, 30)
}

/// A handful of events around the test clock.
pub fn sample_events() -> Vec<CalendarEvent> {
    vec![
        CalendarEvent::new("Standup", local_time(19, 10, 0), local_time(19, 10, 15))
            .with_category(EventCategory::Work),
        CalendarEvent::new("Lunch with Sam", local_time(19, 12, 30), local_time(19, 13, 30))
            .with_category(EventCategory::Social),
        CalendarEvent::new("Dentist", local_time(21, 15, 0), local_time(21, 15, 0) + Duration::minutes(45))
            .with_category(EventCategory::Health),
    ]
}

/// Create a test app with sample events, the tour already completed and no persistence.
pub fn create_test_app() -> App {
    let settings = Settings {
        tour_completed: true,
        ..Settings::default()
    };
    App::with_state(
        EventStore::from_events(sample_events()),
        settings,
        Config::default(),
        test_now(),
    )
}

/// Create a test app positioned at a specific screen.
pub fn create_test_app_at_screen(screen: Screen) -> App {
    let mut app = create_test_app();
    app.screen = screen;
    app
}

/// Convert a buffer to a string, trimming trailing spaces per line.
pub fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut lines = Vec::with_capacity(usize::from(area.height));
    for y in area.y..area.y + area.height {
        let mut line = String::new();
        for x in area.x..area.x + area.width {
            line.push_str(buffer[(x, y)].symbol());
        }
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

/// Render a screen into an 80x24 buffer and return its text.
pub fn render_screen_to_string<S: ScreenTrait>(screen: &S, app: &mut App) -> String {
    let area = Rect::new(0, 0, TEST_WIDTH, TEST_HEIGHT);
    app.prepare_frame(area);
    let mut buf = Buffer::empty(area);
    screen.render(app, area, &mut buf);
    buffer_to_string(&buf)
}

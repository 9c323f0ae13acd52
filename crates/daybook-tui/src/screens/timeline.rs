//! Timeline screen: the continuously scrolling day list.

use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

use super::{month_label, render_header, Screen};
use crate::app::App;
use crate::timeline::TimelineWidget;
use crate::ui::{main_layout, KeyHint, StatusBar};

const HINTS: [KeyHint; 5] = [
    KeyHint::new("j/k", "scroll"),
    KeyHint::new("t", "today"),
    KeyHint::new("h/l", "month"),
    KeyHint::new("Tab", "screens"),
    KeyHint::new("?", "help"),
];

/// Timeline screen.
pub struct TimelineScreen;

impl Screen for TimelineScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let (header, body, status) = main_layout(area);

        render_header(app, &month_label(app.header_month), header, buf);

        TimelineWidget::new(
            app.timeline.blocks(),
            app.timeline.scroll_offset(),
            app.store.events(),
            app.now,
            &app.theme,
        )
        .render(body, buf);

        StatusBar::new(app.screen.title(), &app.theme)
            .hints(&HINTS)
            .right(app.notification.as_deref())
            .render(status, buf);
    }
}

//! Day timeline rendering.
//!
//! This module provides:
//! - [`layout_days`] - Row layout of the day window, fed back to the controller
//! - [`TimelineWidget`] - Draws the rows that intersect the viewport

mod layout;
mod widget;

pub use layout::layout_days;
pub use widget::TimelineWidget;

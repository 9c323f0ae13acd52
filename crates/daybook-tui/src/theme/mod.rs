//! Theme components for the TUI.
//!
//! This module provides [`Theme`], the Catppuccin Mocha/Latte palettes
//! selected by the persisted [`daybook_engine::ThemeMode`].

mod colors;

pub use colors::Theme;

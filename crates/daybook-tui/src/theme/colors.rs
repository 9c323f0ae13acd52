//! Catppuccin color palettes for the TUI.

use daybook_engine::ThemeMode;
use ratatui::style::Color;

/// Theme color palette.
#[derive(Debug, Clone)]
pub struct Theme {
    // Backgrounds
    pub base: Color,
    pub surface: Color,
    pub overlay: Color,

    // Foregrounds
    pub text: Color,
    pub subtext: Color,
    pub muted: Color,

    // Accents
    pub primary: Color,
    pub secondary: Color,
    /// Today's header and the month grid's current day.
    pub today: Color,

    // Semantic
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,

    // Borders
    pub border: Color,
    pub border_focused: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::mocha()
    }
}

impl Theme {
    /// Palette for a persisted theme mode.
    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self::mocha(),
            ThemeMode::Light => Self::latte(),
        }
    }

    /// Catppuccin Mocha theme (dark).
    pub fn mocha() -> Self {
        Self {
            base: Color::Rgb(30, 30, 46),       // #1e1e2e
            surface: Color::Rgb(49, 50, 68),    // #313244
            overlay: Color::Rgb(69, 71, 90),    // #45475a

            text: Color::Rgb(205, 214, 244),    // #cdd6f4
            subtext: Color::Rgb(166, 173, 200), // #a6adc8
            muted: Color::Rgb(108, 112, 134),   // #6c7086

            primary: Color::Rgb(180, 190, 254),   // #b4befe (lavender)
            secondary: Color::Rgb(148, 226, 213), // #94e2d5 (teal)
            today: Color::Rgb(250, 179, 135),     // #fab387 (peach)

            success: Color::Rgb(166, 227, 161), // #a6e3a1 (green)
            warning: Color::Rgb(249, 226, 175), // #f9e2af (yellow)
            error: Color::Rgb(243, 139, 168),   // #f38ba8 (red)
            info: Color::Rgb(137, 180, 250),    // #89b4fa (blue)

            border: Color::Rgb(69, 71, 90),            // #45475a
            border_focused: Color::Rgb(180, 190, 254), // #b4befe
        }
    }

    /// Catppuccin Latte theme (light).
    pub fn latte() -> Self {
        Self {
            base: Color::Rgb(239, 241, 245),    // #eff1f5
            surface: Color::Rgb(230, 233, 239), // #e6e9ef
            overlay: Color::Rgb(220, 224, 232), // #dce0e8

            text: Color::Rgb(76, 79, 105),    // #4c4f69
            subtext: Color::Rgb(92, 95, 119), // #5c5f77
            muted: Color::Rgb(140, 143, 161), // #8c8fa1

            primary: Color::Rgb(114, 135, 253),  // #7287fd (lavender)
            secondary: Color::Rgb(23, 146, 153), // #179299 (teal)
            today: Color::Rgb(254, 100, 11),     // #fe640b (peach)

            success: Color::Rgb(64, 160, 43), // #40a02b (green)
            warning: Color::Rgb(223, 142, 29), // #df8e1d (yellow)
            error: Color::Rgb(210, 15, 57),   // #d20f39 (red)
            info: Color::Rgb(30, 102, 245),   // #1e66f5 (blue)

            border: Color::Rgb(188, 192, 204),         // #bcc0cc
            border_focused: Color::Rgb(114, 135, 253), // #7287fd
        }
    }

    /// Color for an event's `#rrggbb` display color, or the info accent.
    pub fn event_color(&self, hex: &str) -> Color {
        parse_hex(hex).unwrap_or(self.info)
    }
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selects_palette() {
        assert!(matches!(Theme::for_mode(ThemeMode::Dark).base, Color::Rgb(30, 30, 46)));
        assert!(matches!(Theme::for_mode(ThemeMode::Light).base, Color::Rgb(239, 241, 245)));
    }

    #[test]
    fn test_default_is_mocha() {
        assert!(matches!(Theme::default().base, Color::Rgb(30, 30, 46)));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#3b82f6"), Some(Color::Rgb(59, 130, 246)));
        assert_eq!(parse_hex("ffffff"), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(parse_hex("#fff"), None);
        assert_eq!(parse_hex("#gg0000"), None);
    }

    #[test]
    fn test_event_color_falls_back() {
        let theme = Theme::mocha();
        assert_eq!(theme.event_color("nope"), theme.info);
    }
}

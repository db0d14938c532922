//! Color themes.

use ratatui::style::Color;

use promptbench_storage::ThemePreference;

/// Palette used by all widgets.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub dim: Color,
    pub accent: Color,
    pub error: Color,
    pub success: Color,
    pub highlight_bg: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::Gray,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            error: Color::Red,
            success: Color::Green,
            highlight_bg: Color::Rgb(40, 44, 52),
        }
    }

    pub fn light() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::Black,
            dim: Color::Gray,
            accent: Color::Blue,
            error: Color::LightRed,
            success: Color::Green,
            highlight_bg: Color::Rgb(220, 224, 232),
        }
    }

    pub fn from_preference(preference: ThemePreference) -> Self {
        match preference {
            ThemePreference::Dark => Self::dark(),
            ThemePreference::Light => Self::light(),
        }
    }
}

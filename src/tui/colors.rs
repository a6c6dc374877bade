//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::Priority;
use crate::view::DueState;

/// Header and status bar background.
pub const ACCENT: Color = Color::Rgb(0, 80, 0);
/// High priority.
pub const DARK_RED: Color = Color::Rgb(170, 30, 30);
/// Medium priority.
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Low priority.
pub const SLATE: Color = Color::Rgb(110, 130, 160);

pub fn priority_color(p: Priority) -> Color {
    match p {
        Priority::High => DARK_RED,
        Priority::Medium => GOLD,
        Priority::Low => SLATE,
    }
}

/// Foreground for a row whose task is overdue or due soon.
pub fn due_color(state: Option<DueState>) -> Option<Color> {
    match state {
        Some(DueState::Overdue) => Some(Color::LightRed),
        Some(DueState::DueSoon) => Some(Color::Yellow),
        None => None,
    }
}

//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::{Priority, Status};

/// Used for In Progress
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Used for Done
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// Used for high-priority cards
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Used for Review
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);

/// Accent colour of a board column.
pub fn status_color(status: Status) -> Color {
    match status {
        Status::ToDo => Color::Blue,
        Status::InProgress => GOLD,
        Status::Review => DARK_PURPLE,
        Status::Done => DARK_GREEN,
    }
}

/// Background of an unselected card.
pub fn card_background(priority: Priority) -> Color {
    match priority {
        Priority::High => DARK_RED,
        _ => Color::DarkGray,
    }
}

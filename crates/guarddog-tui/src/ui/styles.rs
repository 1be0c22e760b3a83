use ratatui::style::{Color, Modifier, Style};

use guarddog_core::classroom::GradeTier;
use guarddog_core::models::EnrollmentStatus;
use guarddog_core::NotificationKind;

// Color palette
pub const PRIMARY: Color = Color::Rgb(64, 128, 192);
pub const SECONDARY: Color = Color::Rgb(96, 160, 96);
pub const ACCENT: Color = Color::Rgb(192, 160, 64);
pub const ERROR: Color = Color::Rgb(192, 64, 64);
pub const MUTED: Color = Color::Rgb(128, 128, 128);
pub const HIGHLIGHT: Color = Color::Rgb(48, 48, 64);

// Styles
pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default()
        .bg(HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn highlight_style() -> Style {
    Style::default().fg(ACCENT)
}

pub fn success_style() -> Style {
    Style::default().fg(SECONDARY)
}

pub fn error_style() -> Style {
    Style::default().fg(ERROR)
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(PRIMARY)
    } else {
        Style::default().fg(MUTED)
    }
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::Rgb(32, 32, 40)).fg(Color::White)
}

pub fn help_key_style() -> Style {
    Style::default()
        .fg(ACCENT)
        .add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    Style::default().fg(Color::White)
}

/// Input field style, highlighted when focused
pub fn field_style(focused: bool) -> Style {
    if focused {
        selected_style()
    } else {
        list_item_style()
    }
}

pub fn toast_style(kind: NotificationKind) -> Style {
    match kind {
        NotificationKind::Success => success_style(),
        NotificationKind::Error => error_style(),
        NotificationKind::Info => Style::default().fg(PRIMARY),
    }
}

pub fn status_style(status: EnrollmentStatus) -> Style {
    match status {
        EnrollmentStatus::Excellent => success_style().add_modifier(Modifier::BOLD),
        EnrollmentStatus::Good | EnrollmentStatus::Active => success_style(),
        EnrollmentStatus::NeedsAttention => highlight_style(),
        EnrollmentStatus::Inactive | EnrollmentStatus::Unknown => muted_style(),
    }
}

pub fn grade_style(tier: GradeTier) -> Style {
    match tier {
        GradeTier::Excellent => success_style().add_modifier(Modifier::BOLD),
        GradeTier::Good => success_style(),
        GradeTier::Passing => highlight_style(),
        GradeTier::Failing => error_style(),
    }
}

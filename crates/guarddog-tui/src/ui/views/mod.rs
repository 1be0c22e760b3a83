//! Route content, one module per screen.

pub mod home;
pub mod login;
pub mod register;
pub mod student;
pub mod teacher;

use ratatui::text::{Line, Span};

use super::styles;

/// Width of the value area of a form field.
const FIELD_WIDTH: usize = 24;

/// One labelled input field: `Label: [value▌]`.
pub(crate) fn field_line(label: &str, value: &str, focused: bool, masked: bool) -> Line<'static> {
    let shown: String = if masked {
        "*".repeat(value.chars().count().min(FIELD_WIDTH))
    } else {
        // Keep the tail visible while typing past the field width
        let len = value.chars().count();
        value.chars().skip(len.saturating_sub(FIELD_WIDTH)).collect()
    };
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::styled(format!("  {:>16}: [", label), styles::muted_style()),
        Span::styled(
            format!("{:<width$}{}", shown, cursor, width = FIELD_WIDTH),
            styles::field_style(focused),
        ),
        Span::styled("]", styles::muted_style()),
    ])
}

/// A selectable value cycled with the arrow keys: `Label: < value >`.
pub(crate) fn choice_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:>16}: ", label), styles::muted_style()),
        Span::styled(format!("◀ {} ▶", value), styles::field_style(focused)),
    ])
}

pub(crate) fn button_line(label: &str, focused: bool) -> Line<'static> {
    let text = if focused {
        format!(" ▶ {} ◀ ", label)
    } else {
        format!("   {}   ", label)
    };
    Line::from(vec![
        Span::raw("["),
        Span::styled(text, styles::field_style(focused)),
        Span::raw("]"),
    ])
    .centered()
}

pub(crate) fn error_line(error: &Option<String>) -> Option<Line<'static>> {
    error
        .as_ref()
        .map(|e| Line::from(Span::styled(format!(" {}", e), styles::error_style())))
}

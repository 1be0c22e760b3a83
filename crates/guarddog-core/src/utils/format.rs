use chrono::{DateTime, Local, Utc};

/// Truncate a string to a maximum number of characters, adding an ellipsis
/// if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp as a local calendar date, e.g. "Sep 03, 2024"
pub fn format_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%b %d, %Y").to_string()
}

/// Text progress bar `width` cells wide for a 0-100 percentage
pub fn progress_bar(progress: f64, width: usize) -> String {
    let clamped = if progress.is_finite() { progress.clamp(0.0, 100.0) } else { 0.0 };
    let filled = ((clamped / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

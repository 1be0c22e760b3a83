//! Utility functions for string formatting.

pub mod format;

pub use format::{format_date, progress_bar, truncate_string};

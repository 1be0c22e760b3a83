use chrono::{DateTime, Local, Utc};

use crate::models::Enrollment;

/// Letter grade for a progress percentage.
pub fn letter_grade(progress: f64) -> &'static str {
    match progress {
        p if p >= 97.0 => "A+",
        p if p >= 93.0 => "A",
        p if p >= 90.0 => "A-",
        p if p >= 87.0 => "B+",
        p if p >= 83.0 => "B",
        p if p >= 80.0 => "B-",
        p if p >= 77.0 => "C+",
        p if p >= 73.0 => "C",
        p if p >= 70.0 => "C-",
        p if p >= 60.0 => "D",
        _ => "F",
    }
}

/// Coarse band used to color a grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeTier {
    Excellent,
    Good,
    Passing,
    Failing,
}

pub fn grade_tier(progress: f64) -> GradeTier {
    match progress {
        p if p >= 90.0 => GradeTier::Excellent,
        p if p >= 80.0 => GradeTier::Good,
        p if p >= 60.0 => GradeTier::Passing,
        _ => GradeTier::Failing,
    }
}

/// Mean progress over `enrollments`, rounded to a whole percent.
/// Missing progress counts as zero; no enrollments averages to zero.
pub fn average_progress<'a, I>(enrollments: I) -> u32
where
    I: IntoIterator<Item = &'a Enrollment>,
{
    let (sum, count) = enrollments
        .into_iter()
        .fold((0.0, 0u32), |(sum, count), e| (sum + e.progress_or_zero(), count + 1));
    if count == 0 {
        0
    } else {
        (sum / count as f64).round().max(0.0) as u32
    }
}

/// Relative description of the last activity time.
pub fn format_last_activity(last_activity: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = last_activity else {
        return "No activity".to_string();
    };

    let hours = (now - at).num_hours();
    if hours < 1 {
        return "Less than an hour ago".to_string();
    }
    if hours < 24 {
        return format!("{} hour{} ago", hours, if hours > 1 { "s" } else { "" });
    }
    let days = hours / 24;
    format!("{} day{} ago", days, if days > 1 { "s" } else { "" })
}

/// Summary line for a class's enrollments on the teacher dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassStats {
    pub total_students: usize,
    pub average_progress: u32,
    /// Enrollments with activity on the current local calendar day.
    pub active_today: usize,
}

pub fn class_stats(enrollments: &[Enrollment], now: DateTime<Utc>) -> ClassStats {
    let today = now.with_timezone(&Local).date_naive();
    let active_today = enrollments
        .iter()
        .filter_map(|e| e.last_activity)
        .filter(|at| at.with_timezone(&Local).date_naive() == today)
        .count();

    ClassStats {
        total_students: enrollments.len(),
        average_progress: average_progress(enrollments),
        active_today,
    }
}

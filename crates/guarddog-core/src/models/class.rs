//! Rows of the `classes` and `student_enrollments` tables, plus the narrow
//! profile projections the dashboards join against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `classes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub teacher_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Progress status a teacher assigns to an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrollmentStatus {
    Active,
    Excellent,
    Good,
    NeedsAttention,
    Inactive,
    /// Anything the table holds that this client does not know about.
    #[serde(other)]
    Unknown,
}

impl EnrollmentStatus {
    /// Statuses offered by the progress-entry form, in display order.
    pub const SELECTABLE: [EnrollmentStatus; 5] = [
        EnrollmentStatus::Active,
        EnrollmentStatus::Excellent,
        EnrollmentStatus::Good,
        EnrollmentStatus::NeedsAttention,
        EnrollmentStatus::Inactive,
    ];

    pub fn next(&self) -> Self {
        match self {
            EnrollmentStatus::Active => EnrollmentStatus::Excellent,
            EnrollmentStatus::Excellent => EnrollmentStatus::Good,
            EnrollmentStatus::Good => EnrollmentStatus::NeedsAttention,
            EnrollmentStatus::NeedsAttention => EnrollmentStatus::Inactive,
            EnrollmentStatus::Inactive | EnrollmentStatus::Unknown => EnrollmentStatus::Active,
        }
    }
}

impl Default for EnrollmentStatus {
    fn default() -> Self {
        EnrollmentStatus::Active
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentStatus::Active => write!(f, "Active"),
            EnrollmentStatus::Excellent => write!(f, "Excellent"),
            EnrollmentStatus::Good => write!(f, "Good"),
            EnrollmentStatus::NeedsAttention => write!(f, "Needs Attention"),
            EnrollmentStatus::Inactive => write!(f, "Inactive"),
            EnrollmentStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A row of the `student_enrollments` table.
///
/// `student_id` and `class_id` reference `profiles.user_id` and `classes.id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub status: Option<EnrollmentStatus>,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub enrolled_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// Progress percentage, treating a null column as zero.
    pub fn progress_or_zero(&self) -> f64 {
        self.progress.unwrap_or(0.0)
    }

    pub fn status_or_default(&self) -> EnrollmentStatus {
        self.status.unwrap_or_default()
    }
}

/// Body for updating an existing enrollment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentUpdate {
    pub progress: f64,
    pub status: EnrollmentStatus,
    pub last_activity: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for creating (or merging into) an enrollment for a student and class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentUpsert {
    pub student_id: String,
    pub class_id: String,
    pub progress: f64,
    pub status: EnrollmentStatus,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `profiles` projection used to put names on enrollments and classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonName {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
}

impl PersonName {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// `profiles` projection listing students a teacher can enroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
}

impl StudentSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

//! Class and enrollment data for the dashboards.
//!
//! `ClassroomStore` is the table seam (implemented over HTTP in `backend`).
//! `ClassroomService` joins its rows into what the student portal and the
//! teacher dashboard show, and saves progress entries. The grading helpers
//! are pure and shared by both views.

mod grading;
mod service;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use thiserror::Error;

use crate::backend::BackendError;
use crate::models::{Class, Enrollment, EnrollmentUpdate, EnrollmentUpsert, PersonName, StudentSummary};

pub use grading::{
    average_progress, class_stats, format_last_activity, grade_tier, letter_grade, ClassStats,
    GradeTier,
};
pub use service::{
    parse_progress, ClassEnrollmentView, ClassroomService, ProgressEntry, SaveOutcome,
    StudentEnrollmentView,
};

#[derive(Error, Debug)]
pub enum ClassroomError {
    #[error("Progress must be a number between 0 and 100 (got {0:?})")]
    InvalidProgress(String),

    #[error("Class ID is required")]
    MissingClass,

    #[error("Select a student to enroll")]
    MissingStudent,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ClassroomError {
    pub fn user_message(&self) -> String {
        match self {
            ClassroomError::Backend(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// The `classes`, `student_enrollments` and `profiles` tables as the
/// dashboards read them. Row-level security decides what each caller sees.
#[async_trait]
pub trait ClassroomStore: Send + Sync {
    /// Newest enrollment first.
    async fn enrollments_for_student(&self, student_id: &str) -> Result<Vec<Enrollment>, BackendError>;

    /// Newest enrollment first.
    async fn enrollments_for_class(&self, class_id: &str) -> Result<Vec<Enrollment>, BackendError>;

    /// Newest class first.
    async fn classes(&self) -> Result<Vec<Class>, BackendError>;

    async fn classes_by_ids(&self, ids: &[String]) -> Result<Vec<Class>, BackendError>;

    async fn names_by_user_ids(&self, user_ids: &[String]) -> Result<Vec<PersonName>, BackendError>;

    /// Profiles with the student role.
    async fn students(&self) -> Result<Vec<StudentSummary>, BackendError>;

    async fn update_enrollment(&self, enrollment_id: &str, update: &EnrollmentUpdate) -> Result<(), BackendError>;

    /// Insert, or merge into the row for the same student and class.
    async fn upsert_enrollment(&self, row: &EnrollmentUpsert) -> Result<(), BackendError>;
}

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use super::{ClassroomError, ClassroomStore};
use crate::models::{
    Class, Enrollment, EnrollmentStatus, EnrollmentUpdate, EnrollmentUpsert, PersonName,
    StudentSummary,
};
use crate::notify::Notifier;

const UNKNOWN_CLASS: &str = "Unknown Class";
const UNKNOWN_TEACHER: &str = "Unknown Teacher";
const UNKNOWN_STUDENT: &str = "Unknown Student";

/// An enrollment on the student portal, with its class and teacher.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentEnrollmentView {
    pub enrollment: Enrollment,
    pub class_name: String,
    pub class_description: String,
    pub teacher_name: String,
}

/// An enrollment on the teacher dashboard, with the student's name.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEnrollmentView {
    pub enrollment: Enrollment,
    pub student_name: String,
}

/// A submitted progress-entry form.
///
/// With `enrollment_id` set the existing enrollment is updated; otherwise a
/// new enrollment is written for `student_id` in `class_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEntry {
    pub enrollment_id: Option<String>,
    pub class_id: Option<String>,
    pub student_id: Option<String>,
    pub progress: f64,
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Updated,
    Created,
}

/// Parse the progress field of the entry form.
pub fn parse_progress(input: &str) -> Result<f64, ClassroomError> {
    let trimmed = input.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && (0.0..=100.0).contains(&value) => Ok(value),
        _ => Err(ClassroomError::InvalidProgress(trimmed.to_string())),
    }
}

fn unique_ids<'a, I: IntoIterator<Item = &'a str>>(ids: I) -> Vec<String> {
    ids.into_iter()
        .filter(|id| !id.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Reads and writes behind the dashboards. Failures are reported through
/// the notifier as well as returned.
#[derive(Clone)]
pub struct ClassroomService {
    store: Arc<dyn ClassroomStore>,
    notifier: Notifier,
}

impl ClassroomService {
    pub fn new(store: Arc<dyn ClassroomStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    fn report(&self, description: &str, err: ClassroomError) -> ClassroomError {
        error!(error = %err, "{}", description);
        self.notifier.error("Error", description);
        err
    }

    /// Enrollments of `student_id` joined with their class and teacher.
    pub async fn student_enrollments(
        &self,
        student_id: &str,
    ) -> Result<Vec<StudentEnrollmentView>, ClassroomError> {
        self.load_student_enrollments(student_id)
            .await
            .map_err(|e| self.report("Failed to fetch your enrollments", e))
    }

    async fn load_student_enrollments(
        &self,
        student_id: &str,
    ) -> Result<Vec<StudentEnrollmentView>, ClassroomError> {
        let enrollments = self.store.enrollments_for_student(student_id).await?;
        if enrollments.is_empty() {
            return Ok(Vec::new());
        }

        let class_ids = unique_ids(enrollments.iter().map(|e| e.class_id.as_str()));
        let classes: HashMap<String, Class> = self
            .store
            .classes_by_ids(&class_ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let teacher_ids = unique_ids(classes.values().map(|c| c.teacher_id.as_str()));
        let teachers: HashMap<String, PersonName> = if teacher_ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .names_by_user_ids(&teacher_ids)
                .await?
                .into_iter()
                .map(|p| (p.user_id.clone(), p))
                .collect()
        };

        debug!(
            student_id = %student_id,
            enrollments = enrollments.len(),
            classes = classes.len(),
            teachers = teachers.len(),
            "Joined student enrollments"
        );

        Ok(enrollments
            .into_iter()
            .map(|enrollment| {
                let class = classes.get(&enrollment.class_id);
                let teacher = class.and_then(|c| teachers.get(&c.teacher_id));
                StudentEnrollmentView {
                    class_name: class
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| UNKNOWN_CLASS.to_string()),
                    class_description: class
                        .and_then(|c| c.description.clone())
                        .unwrap_or_default(),
                    teacher_name: teacher
                        .map(|t| t.full_name())
                        .unwrap_or_else(|| UNKNOWN_TEACHER.to_string()),
                    enrollment,
                }
            })
            .collect())
    }

    /// Every class the caller can see, newest first.
    pub async fn teacher_classes(&self) -> Result<Vec<Class>, ClassroomError> {
        self.store
            .classes()
            .await
            .map_err(|e| self.report("Failed to fetch classes", e.into()))
    }

    /// Enrollments of `class_id` with student names.
    pub async fn class_enrollments(
        &self,
        class_id: &str,
    ) -> Result<Vec<ClassEnrollmentView>, ClassroomError> {
        self.load_class_enrollments(class_id)
            .await
            .map_err(|e| self.report("Failed to fetch student enrollments", e))
    }

    async fn load_class_enrollments(
        &self,
        class_id: &str,
    ) -> Result<Vec<ClassEnrollmentView>, ClassroomError> {
        let enrollments = self.store.enrollments_for_class(class_id).await?;
        if enrollments.is_empty() {
            return Ok(Vec::new());
        }

        let student_ids = unique_ids(enrollments.iter().map(|e| e.student_id.as_str()));
        let students: HashMap<String, PersonName> = self
            .store
            .names_by_user_ids(&student_ids)
            .await?
            .into_iter()
            .map(|p| (p.user_id.clone(), p))
            .collect();

        Ok(enrollments
            .into_iter()
            .map(|enrollment| ClassEnrollmentView {
                student_name: students
                    .get(&enrollment.student_id)
                    .map(|s| s.full_name())
                    .unwrap_or_else(|| UNKNOWN_STUDENT.to_string()),
                enrollment,
            })
            .collect())
    }

    /// Students a teacher can enroll.
    pub async fn available_students(&self) -> Result<Vec<StudentSummary>, ClassroomError> {
        self.store
            .students()
            .await
            .map_err(|e| self.report("Failed to fetch students", e.into()))
    }

    /// Save a progress entry, updating or creating the enrollment.
    pub async fn save_progress(&self, entry: ProgressEntry) -> Result<SaveOutcome, ClassroomError> {
        match self.write_progress(entry).await {
            Ok(outcome) => {
                let description = match outcome {
                    SaveOutcome::Updated => "Student progress updated successfully",
                    SaveOutcome::Created => "Progress entry added successfully",
                };
                self.notifier.success("Success", description);
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "Error saving progress");
                self.notifier.error("Error", &e.user_message());
                Err(e)
            }
        }
    }

    async fn write_progress(&self, entry: ProgressEntry) -> Result<SaveOutcome, ClassroomError> {
        if !entry.progress.is_finite() || !(0.0..=100.0).contains(&entry.progress) {
            return Err(ClassroomError::InvalidProgress(entry.progress.to_string()));
        }
        let now = Utc::now();

        if let Some(enrollment_id) = entry.enrollment_id.as_deref() {
            let update = EnrollmentUpdate {
                progress: entry.progress,
                status: entry.status,
                last_activity: now,
                updated_at: now,
            };
            self.store.update_enrollment(enrollment_id, &update).await?;
            info!(enrollment_id = %enrollment_id, progress = entry.progress, "Updated enrollment");
            return Ok(SaveOutcome::Updated);
        }

        let class_id = entry
            .class_id
            .filter(|id| !id.is_empty())
            .ok_or(ClassroomError::MissingClass)?;
        let student_id = entry
            .student_id
            .filter(|id| !id.is_empty())
            .ok_or(ClassroomError::MissingStudent)?;

        let row = EnrollmentUpsert {
            student_id,
            class_id,
            progress: entry.progress,
            status: entry.status,
            last_activity: now,
            created_at: now,
            updated_at: now,
        };
        self.store.upsert_enrollment(&row).await?;
        info!(class_id = %row.class_id, student_id = %row.student_id, "Saved enrollment");
        Ok(SaveOutcome::Created)
    }
}

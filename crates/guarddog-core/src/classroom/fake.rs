//! In-memory class and enrollment tables for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::ClassroomStore;
use crate::backend::BackendError;
use crate::models::{
    Class, Enrollment, EnrollmentUpdate, EnrollmentUpsert, PersonName, StudentSummary,
};

pub fn class(id: &str, name: &str, teacher_id: &str) -> Class {
    Class {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        teacher_id: teacher_id.to_string(),
        created_at: Some(Utc::now()),
    }
}

pub fn enrollment(id: &str, student_id: &str, class_id: &str, progress: Option<f64>) -> Enrollment {
    Enrollment {
        id: id.to_string(),
        student_id: student_id.to_string(),
        class_id: class_id.to_string(),
        progress,
        status: None,
        last_activity: None,
        enrolled_at: Some(Utc::now()),
    }
}

pub fn name(user_id: &str, first_name: &str, last_name: &str) -> PersonName {
    PersonName {
        user_id: user_id.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    }
}

pub struct FakeClassroom {
    classes: Mutex<Vec<Class>>,
    enrollments: Mutex<Vec<Enrollment>>,
    names: Mutex<Vec<PersonName>>,
    students: Mutex<Vec<StudentSummary>>,
    pub fail_reads: bool,
    /// Calls to `classes_by_ids` and `names_by_user_ids`.
    pub lookup_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
}

impl FakeClassroom {
    pub fn new() -> Self {
        Self {
            classes: Mutex::new(Vec::new()),
            enrollments: Mutex::new(Vec::new()),
            names: Mutex::new(Vec::new()),
            students: Mutex::new(Vec::new()),
            fail_reads: false,
            lookup_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_class(self, class: Class) -> Self {
        self.classes.lock().unwrap().push(class);
        self
    }

    pub fn with_enrollment(self, enrollment: Enrollment) -> Self {
        self.enrollments.lock().unwrap().push(enrollment);
        self
    }

    pub fn with_name(self, name: PersonName) -> Self {
        self.names.lock().unwrap().push(name);
        self
    }

    pub fn with_student(self, student: StudentSummary) -> Self {
        self.students.lock().unwrap().push(student);
        self
    }

    pub fn enrollment(&self, id: &str) -> Option<Enrollment> {
        self.enrollments.lock().unwrap().iter().find(|e| e.id == id).cloned()
    }

    pub fn enrollments_in(&self, class_id: &str) -> Vec<Enrollment> {
        self.enrollments
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.class_id == class_id)
            .cloned()
            .collect()
    }

    fn check_read(&self) -> Result<(), BackendError> {
        if self.fail_reads {
            Err(BackendError::ServerError("relation does not exist".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ClassroomStore for FakeClassroom {
    async fn enrollments_for_student(&self, student_id: &str) -> Result<Vec<Enrollment>, BackendError> {
        self.check_read()?;
        Ok(self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn enrollments_for_class(&self, class_id: &str) -> Result<Vec<Enrollment>, BackendError> {
        self.check_read()?;
        Ok(self.enrollments_in(class_id))
    }

    async fn classes(&self) -> Result<Vec<Class>, BackendError> {
        self.check_read()?;
        Ok(self.classes.lock().unwrap().clone())
    }

    async fn classes_by_ids(&self, ids: &[String]) -> Result<Vec<Class>, BackendError> {
        self.check_read()?;
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .classes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn names_by_user_ids(&self, user_ids: &[String]) -> Result<Vec<PersonName>, BackendError> {
        self.check_read()?;
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .names
            .lock()
            .unwrap()
            .iter()
            .filter(|n| user_ids.contains(&n.user_id))
            .cloned()
            .collect())
    }

    async fn students(&self) -> Result<Vec<StudentSummary>, BackendError> {
        self.check_read()?;
        Ok(self.students.lock().unwrap().clone())
    }

    async fn update_enrollment(&self, enrollment_id: &str, update: &EnrollmentUpdate) -> Result<(), BackendError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.enrollments.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|e| e.id == enrollment_id)
            .ok_or_else(|| BackendError::NotFound(enrollment_id.to_string()))?;
        row.progress = Some(update.progress);
        row.status = Some(update.status);
        row.last_activity = Some(update.last_activity);
        Ok(())
    }

    async fn upsert_enrollment(&self, upsert: &EnrollmentUpsert) -> Result<(), BackendError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.enrollments.lock().unwrap();
        let existing = rows
            .iter_mut()
            .find(|e| e.student_id == upsert.student_id && e.class_id == upsert.class_id);
        match existing {
            Some(row) => {
                row.progress = Some(upsert.progress);
                row.status = Some(upsert.status);
                row.last_activity = Some(upsert.last_activity);
            }
            None => {
                let id = format!("e-{}", rows.len() + 1);
                rows.push(Enrollment {
                    id,
                    student_id: upsert.student_id.clone(),
                    class_id: upsert.class_id.clone(),
                    progress: Some(upsert.progress),
                    status: Some(upsert.status),
                    last_activity: Some(upsert.last_activity),
                    enrolled_at: Some(upsert.created_at),
                });
            }
        }
        Ok(())
    }
}

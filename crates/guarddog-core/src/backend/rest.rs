use async_trait::async_trait;

use super::client::{eq, in_list, order_desc, PREFER_MERGE};
use super::{BackendClient, BackendError};
use crate::classroom::ClassroomStore;
use crate::models::{
    Class, Enrollment, EnrollmentUpdate, EnrollmentUpsert, PersonName, Role, StudentSummary,
};

const CLASSES_TABLE: &str = "classes";
const ENROLLMENTS_TABLE: &str = "student_enrollments";
const PROFILES_TABLE: &str = "profiles";

/// Columns the enrollment lists read.
const ENROLLMENT_COLUMNS: &str = "id,student_id,class_id,progress,status,last_activity,enrolled_at";

/// Conflict target for enrollment upserts.
const ENROLLMENT_CONFLICT_COLUMNS: &str = "student_id,class_id";

/// `ClassroomStore` over the hosted tables.
#[derive(Clone)]
pub struct RestClassroomStore {
    client: BackendClient,
}

impl RestClassroomStore {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    async fn enrollments_where(&self, column: &str, value: &str) -> Result<Vec<Enrollment>, BackendError> {
        let url = self.client.rest_url(ENROLLMENTS_TABLE);
        self.client
            .get(
                &url,
                &[
                    ("select", ENROLLMENT_COLUMNS.to_string()),
                    (column, eq(value)),
                    ("order", order_desc("enrolled_at")),
                ],
            )
            .await
    }
}

#[async_trait]
impl ClassroomStore for RestClassroomStore {
    async fn enrollments_for_student(&self, student_id: &str) -> Result<Vec<Enrollment>, BackendError> {
        self.enrollments_where("student_id", student_id).await
    }

    async fn enrollments_for_class(&self, class_id: &str) -> Result<Vec<Enrollment>, BackendError> {
        self.enrollments_where("class_id", class_id).await
    }

    async fn classes(&self) -> Result<Vec<Class>, BackendError> {
        let url = self.client.rest_url(CLASSES_TABLE);
        self.client
            .get(
                &url,
                &[("select", "*".to_string()), ("order", order_desc("created_at"))],
            )
            .await
    }

    async fn classes_by_ids(&self, ids: &[String]) -> Result<Vec<Class>, BackendError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.client.rest_url(CLASSES_TABLE);
        self.client
            .get(
                &url,
                &[
                    ("select", "id,name,description,teacher_id".to_string()),
                    ("id", in_list(ids)),
                ],
            )
            .await
    }

    async fn names_by_user_ids(&self, user_ids: &[String]) -> Result<Vec<PersonName>, BackendError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.client.rest_url(PROFILES_TABLE);
        self.client
            .get(
                &url,
                &[
                    ("select", "user_id,first_name,last_name".to_string()),
                    ("user_id", in_list(user_ids)),
                ],
            )
            .await
    }

    async fn students(&self) -> Result<Vec<StudentSummary>, BackendError> {
        let url = self.client.rest_url(PROFILES_TABLE);
        self.client
            .get(
                &url,
                &[
                    ("select", "id,user_id,first_name,last_name".to_string()),
                    ("role", eq(Role::Student.as_str())),
                ],
            )
            .await
    }

    async fn update_enrollment(&self, enrollment_id: &str, update: &EnrollmentUpdate) -> Result<(), BackendError> {
        let url = self.client.rest_url(ENROLLMENTS_TABLE);
        self.client
            .patch(&url, &[("id", eq(enrollment_id))], update)
            .await
    }

    async fn upsert_enrollment(&self, row: &EnrollmentUpsert) -> Result<(), BackendError> {
        let url = self.client.rest_url(ENROLLMENTS_TABLE);
        self.client
            .post_no_content(
                &url,
                &[("on_conflict", ENROLLMENT_CONFLICT_COLUMNS.to_string())],
                Some(row),
                Some(PREFER_MERGE),
            )
            .await
    }
}

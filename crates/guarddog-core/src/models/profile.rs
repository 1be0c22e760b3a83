use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::router::Route;

/// Application role held by a profile.
///
/// The hosted table stores these as `student`, `teacher` and `head_teacher`.
/// Any other stored value fails to decode, which callers treat as a fetch
/// error rather than a fourth role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    HeadTeacher,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Teacher, Role::HeadTeacher];

    /// The wire value stored in the `role` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::HeadTeacher => "head_teacher",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Teacher => "Teacher",
            Role::HeadTeacher => "Head Teacher",
        }
    }

    /// Parse the wire value. Returns `None` for anything outside the three roles.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            "head_teacher" => Some(Role::HeadTeacher),
            _ => None,
        }
    }

    /// Default view for this role when it lands somewhere it may not be.
    pub fn landing_route(&self) -> Route {
        match self {
            Role::Student => Route::Student,
            Role::Teacher | Role::HeadTeacher => Route::Teacher,
        }
    }

    /// Next role in `ALL`, wrapping around. Used by the registration form.
    pub fn next(&self) -> Self {
        match self {
            Role::Student => Role::Teacher,
            Role::Teacher => Role::HeadTeacher,
            Role::HeadTeacher => Role::Student,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Insert body for a new profile row. The table fills in `id` and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProfile {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// Partial update of a profile. Only fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.role.is_none()
    }

    /// Merge the set fields into `profile`, leaving the rest untouched.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(ref first_name) = self.first_name {
            profile.first_name = first_name.clone();
        }
        if let Some(ref last_name) = self.last_name {
            profile.last_name = last_name.clone();
        }
        if let Some(role) = self.role {
            profile.role = role;
        }
    }
}

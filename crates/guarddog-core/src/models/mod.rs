//! Data models for the hosted tables.
//!
//! - `Profile`, `Role`: the `profiles` table and the three application roles
//! - `Class`, `Enrollment`: the `classes` and `student_enrollments` tables
//!
//! Rows are decoded into these types at the backend boundary so nothing
//! downstream handles untyped JSON.

pub mod class;
pub mod profile;

pub use class::{Class, Enrollment, EnrollmentStatus, EnrollmentUpsert, EnrollmentUpdate, PersonName, StudentSummary};
pub use profile::{NewProfile, Profile, ProfileUpdate, Role};

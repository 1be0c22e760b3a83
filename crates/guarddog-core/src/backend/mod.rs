//! HTTP backend for the hosted identity service and data tables.
//!
//! - `BackendClient`: shared reqwest client carrying the project key and
//!   the signed-in user's access token
//! - `SupabaseIdentity`: `IdentityProvider` over the `/auth/v1` endpoints
//! - `RestProfileStore`, `RestClassroomStore`: table access over `/rest/v1`

mod client;
mod error;
mod identity;
mod profiles;
mod rest;

pub use client::BackendClient;
pub use error::BackendError;
pub use identity::SupabaseIdentity;
pub use profiles::RestProfileStore;
pub use rest::RestClassroomStore;

//! Authentication: who is signed in and what role they hold.
//!
//! This module provides:
//! - `SessionStore`: the single-writer holder of identity, profile and the
//!   loading flag, fed by the identity provider's change stream
//! - `IdentityProvider`, `ProfileStore`: the seams to the hosted auth and
//!   `profiles` endpoints (implemented in `backend`, faked in tests)
//! - `AuthSession`, `SessionFile`: identity session records and their
//!   on-disk persistence
//! - `CredentialStore`: remembered passwords via the OS keychain

pub mod credentials;
pub mod error;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::backend::BackendError;
use crate::models::{NewProfile, Profile, ProfileUpdate};

pub use credentials::CredentialStore;
pub use error::AuthError;
pub use session::{AuthSession, AuthUser, SessionFile, SignUpDetails, UserMetadata};
pub use store::{SessionSnapshot, SessionStore, SessionStoreOptions, SignUpOutcome};

/// Kind of session change reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// One notification on the identity provider's change stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

/// Result of creating an account.
///
/// `session` is absent when the provider requires email confirmation
/// before the first sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResponse {
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
}

/// The hosted identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, BackendError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        details: &SignUpDetails,
    ) -> Result<SignUpResponse, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    async fn current_session(&self) -> Result<Option<AuthSession>, BackendError>;

    /// Subscribe to session changes. Every sign-in, sign-out and token
    /// refresh is delivered to every live receiver.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

/// The `profiles` table.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_by_user_id(&self, user_id: &str) -> Result<Option<Profile>, BackendError>;

    async fn insert(&self, profile: &NewProfile) -> Result<Profile, BackendError>;

    async fn update(&self, profile_id: &str, update: &ProfileUpdate) -> Result<(), BackendError>;
}

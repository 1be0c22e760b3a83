use thiserror::Error;

use crate::backend::BackendError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("No user logged in or profile not found")]
    NoActiveProfile,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AuthError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Backend(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

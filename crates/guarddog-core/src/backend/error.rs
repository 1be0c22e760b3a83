use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl BackendError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    /// Pull the human-readable message out of an auth or table error body.
    ///
    /// The auth endpoints answer with `error_description` or `msg`, the
    /// table endpoints with `message`. Falls back to the raw body.
    pub fn extract_message(body: &str) -> String {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            for key in ["error_description", "msg", "message", "error"] {
                if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                    if !message.is_empty() {
                        return message.to_string();
                    }
                }
            }
        }
        Self::truncate_body(body)
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::extract_message(body);
        match status.as_u16() {
            400 | 422 => BackendError::BadRequest(message),
            401 => BackendError::Unauthorized,
            403 => BackendError::AccessDenied(message),
            404 | 406 => BackendError::NotFound(message),
            409 => BackendError::Conflict(message),
            429 => BackendError::RateLimited,
            500..=599 => BackendError::ServerError(message),
            _ => BackendError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::BadRequest(msg)
            | BackendError::AccessDenied(msg)
            | BackendError::Conflict(msg) => msg.clone(),
            BackendError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            BackendError::NetworkError(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            BackendError::NetworkError(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_maps_codes() {
        assert!(matches!(
            BackendError::from_status(StatusCode::UNAUTHORIZED, ""),
            BackendError::Unauthorized
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            BackendError::RateLimited
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::CONFLICT, "{}"),
            BackendError::Conflict(_)
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::BAD_GATEWAY, "oops"),
            BackendError::ServerError(_)
        ));
    }

    #[test]
    fn test_extract_message_prefers_auth_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(BackendError::extract_message(body), "Invalid login credentials");

        let body = r#"{"code":"23505","message":"duplicate key value"}"#;
        assert_eq!(BackendError::extract_message(body), "duplicate key value");
    }

    #[test]
    fn test_extract_message_truncates_plain_body() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let message = BackendError::extract_message(&body);
        assert!(message.contains("truncated"));
        assert!(message.len() < body.len() + 40);
    }

    #[test]
    fn test_bad_request_user_message_is_server_text() {
        let err = BackendError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.user_message(), "Invalid login credentials");
    }
}

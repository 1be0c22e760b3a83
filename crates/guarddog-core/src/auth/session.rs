use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Buffer time before expiry to trigger refresh (5 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// Metadata attached to the identity at sign-up.
///
/// Kept alongside the identity so a profile row that failed to insert can
/// be recreated later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl UserMetadata {
    /// The sign-up details, if all three fields are present and the role is valid.
    pub fn sign_up_details(&self) -> Option<SignUpDetails> {
        let first_name = self.first_name.as_deref().filter(|s| !s.is_empty())?;
        let last_name = self.last_name.as_deref().filter(|s| !s.is_empty())?;
        let role = self.role.as_deref().and_then(Role::parse)?;
        Some(SignUpDetails {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role,
        })
    }
}

/// Profile fields collected by the registration form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUpDetails {
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// Identity record issued by the identity provider. Opaque to the session
/// store apart from `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl AuthSession {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Check if the session will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        let refresh_at = self.expires_at - Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES);
        Utc::now() >= refresh_at
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_minutes().max(0)
    }
}

/// On-disk persistence for the current identity session.
pub struct SessionFile {
    cache_dir: PathBuf,
}

impl SessionFile {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Load the stored session. An expired access token is still returned;
    /// its refresh token may be good.
    pub fn load(&self) -> Result<Option<AuthSession>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .context("Failed to read session file")?;
        let session: AuthSession = serde_json::from_str(&contents)
            .context("Failed to parse session file")?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &AuthSession) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_expiring_in(minutes: i64) -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::minutes(minutes),
            user: AuthUser {
                id: "u-1".to_string(),
                email: Some("a@b.com".to_string()),
                user_metadata: UserMetadata::default(),
            },
        }
    }

    #[test]
    fn test_session_expiry_windows() {
        let fresh = session_expiring_in(60);
        assert!(!fresh.is_expired());
        assert!(!fresh.needs_refresh());

        let soon = session_expiring_in(3);
        assert!(!soon.is_expired());
        assert!(soon.needs_refresh());

        let gone = session_expiring_in(-1);
        assert!(gone.is_expired());
        assert_eq!(gone.minutes_until_expiry(), 0);
    }

    #[test]
    fn test_metadata_sign_up_details() {
        let metadata = UserMetadata {
            first_name: Some("A".to_string()),
            last_name: Some("B".to_string()),
            role: Some("teacher".to_string()),
        };
        let details = metadata.sign_up_details().unwrap();
        assert_eq!(details.role, Role::Teacher);

        let missing_role = UserMetadata {
            role: Some("janitor".to_string()),
            ..metadata.clone()
        };
        assert!(missing_role.sign_up_details().is_none());

        let blank_name = UserMetadata {
            first_name: Some(String::new()),
            ..metadata
        };
        assert!(blank_name.sign_up_details().is_none());
    }

    #[test]
    fn test_session_file_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().to_path_buf());
        assert!(file.load().unwrap().is_none());

        let session = session_expiring_in(-10);
        file.save(&session).unwrap();
        // Expired sessions are still handed back for a refresh attempt
        assert_eq!(file.load().unwrap(), Some(session));

        file.clear().unwrap();
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_session_file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "not json").unwrap();
        let file = SessionFile::new(dir.path().to_path_buf());
        assert!(file.load().is_err());
    }
}

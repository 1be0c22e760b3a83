use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::{BackendClient, BackendError};
use crate::auth::{
    AuthChange, AuthEvent, AuthSession, AuthUser, IdentityProvider, SessionFile, SignUpDetails,
    SignUpResponse,
};

/// Buffer size for the session change channel.
const AUTH_CHANGE_BUFFER_SIZE: usize = 16;

/// Token lifetime assumed when the response carries no expiry.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| {
                now + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS))
            });
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// The sign-up endpoint answers with a full session when no confirmation is
/// required, and with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session(TokenResponse),
    User(AuthUser),
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a SignUpDetails,
}

/// Identity provider backed by the hosted `/auth/v1` endpoints.
///
/// Holds the current session, persists it between runs when given a
/// `SessionFile`, and broadcasts every change.
pub struct SupabaseIdentity {
    client: BackendClient,
    session: Mutex<Option<AuthSession>>,
    session_file: Option<SessionFile>,
    tx: broadcast::Sender<AuthChange>,
}

impl SupabaseIdentity {
    pub fn new(client: BackendClient, session_file: Option<SessionFile>) -> Self {
        let restored = session_file.as_ref().and_then(|file| match file.load() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable session file");
                None
            }
        });
        if let Some(ref session) = restored {
            debug!(user_id = %session.user_id(), "Restored session from disk");
            client.set_access_token(Some(session.access_token.clone()));
        }

        let (tx, _) = broadcast::channel(AUTH_CHANGE_BUFFER_SIZE);
        Self {
            client,
            session: Mutex::new(restored),
            session_file,
            tx,
        }
    }

    fn emit(&self, event: AuthEvent, session: Option<AuthSession>) {
        // No listeners yet is fine
        let _ = self.tx.send(AuthChange { event, session });
    }

    /// Make `session` current: bearer token, disk and in-memory copy.
    fn store(&self, slot: &mut Option<AuthSession>, session: Option<AuthSession>) {
        self.client
            .set_access_token(session.as_ref().map(|s| s.access_token.clone()));
        if let Some(ref file) = self.session_file {
            let result = match session {
                Some(ref session) => file.save(session),
                None => file.clear(),
            };
            if let Err(e) = result {
                warn!(error = %e, "Failed to persist session");
            }
        }
        *slot = session;
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let url = self.client.auth_url("token");
        let response: TokenResponse = self
            .client
            .post(
                &url,
                &[("grant_type", "refresh_token".to_string())],
                &RefreshGrant { refresh_token },
                None,
            )
            .await?;
        Ok(response.into_session(Utc::now()))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let url = self.client.auth_url("token");
        let response: TokenResponse = self
            .client
            .post(
                &url,
                &[("grant_type", "password".to_string())],
                &PasswordGrant { email, password },
                None,
            )
            .await?;
        let session = response.into_session(Utc::now());

        let mut slot = self.session.lock().await;
        self.store(&mut slot, Some(session.clone()));
        drop(slot);

        info!(user_id = %session.user_id(), "Password sign-in succeeded");
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        details: &SignUpDetails,
    ) -> Result<SignUpResponse, BackendError> {
        let url = self.client.auth_url("signup");
        let body: SignUpBody = self
            .client
            .post(
                &url,
                &[],
                &SignUpRequest {
                    email,
                    password,
                    data: details,
                },
                None,
            )
            .await?;

        match body {
            SignUpBody::Session(response) => {
                let session = response.into_session(Utc::now());
                let mut slot = self.session.lock().await;
                self.store(&mut slot, Some(session.clone()));
                drop(slot);

                info!(user_id = %session.user_id(), "Account created and signed in");
                self.emit(AuthEvent::SignedIn, Some(session.clone()));
                Ok(SignUpResponse {
                    user: Some(session.user.clone()),
                    session: Some(session),
                })
            }
            SignUpBody::User(user) => {
                info!(user_id = %user.id, "Account created, confirmation pending");
                Ok(SignUpResponse {
                    user: Some(user),
                    session: None,
                })
            }
        }
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            let url = self.client.auth_url("logout");
            match self
                .client
                .post_no_content::<()>(&url, &[], None, None)
                .await
            {
                Ok(()) => {}
                // The token is already gone server-side
                Err(BackendError::Unauthorized) | Err(BackendError::NotFound(_)) => {
                    debug!("Session already revoked");
                }
                Err(e) => return Err(e),
            }
        }
        self.store(&mut slot, None);
        drop(slot);

        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<AuthSession>, BackendError> {
        let mut slot = self.session.lock().await;
        let Some(session) = slot.clone() else {
            return Ok(None);
        };
        if !session.needs_refresh() {
            return Ok(Some(session));
        }

        debug!(
            user_id = %session.user_id(),
            minutes_left = session.minutes_until_expiry(),
            "Refreshing session"
        );
        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                self.store(&mut slot, Some(refreshed.clone()));
                drop(slot);
                self.emit(AuthEvent::TokenRefreshed, Some(refreshed.clone()));
                Ok(Some(refreshed))
            }
            Err(BackendError::BadRequest(msg)) | Err(BackendError::AccessDenied(msg)) => {
                warn!(error = %msg, "Refresh token rejected, discarding session");
                self.store(&mut slot, None);
                Ok(None)
            }
            Err(BackendError::Unauthorized) => {
                warn!("Refresh token rejected, discarding session");
                self.store(&mut slot, None);
                Ok(None)
            }
            // Transient failure: keep the session while the token still works
            Err(e) if !session.is_expired() => {
                warn!(error = %e, "Session refresh failed, keeping current token");
                Ok(Some(session))
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.tx.subscribe()
    }
}

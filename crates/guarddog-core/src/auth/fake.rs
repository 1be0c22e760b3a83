//! In-memory identity provider and profile table for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, Notify};

use super::{
    AuthChange, AuthEvent, AuthSession, AuthUser, IdentityProvider, ProfileStore, SignUpDetails,
    SignUpResponse, UserMetadata,
};
use crate::backend::BackendError;
use crate::models::{NewProfile, Profile, ProfileUpdate, Role};

pub fn user(id: &str) -> AuthUser {
    AuthUser {
        id: id.to_string(),
        email: Some(format!("{}@school.test", id)),
        user_metadata: UserMetadata::default(),
    }
}

pub fn session_for(id: &str) -> AuthSession {
    AuthSession {
        access_token: format!("access-{}", id),
        refresh_token: format!("refresh-{}", id),
        expires_at: Utc::now() + chrono::Duration::hours(1),
        user: user(id),
    }
}

pub fn profile_for(user_id: &str, role: Role) -> Profile {
    Profile {
        id: format!("profile-{}", user_id),
        user_id: user_id.to_string(),
        first_name: "Test".to_string(),
        last_name: user_id.to_string(),
        role,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub struct FakeIdentity {
    tx: broadcast::Sender<AuthChange>,
    pub session: Mutex<Option<AuthSession>>,
    /// Users that `sign_in_with_password` accepts, by email.
    pub accounts: Mutex<HashMap<String, AuthUser>>,
    /// When set, `sign_up` returns a user without a session.
    pub require_confirmation: bool,
    /// When set, `current_session` waits for a notification before answering.
    pub session_gate: Option<Arc<Notify>>,
    pub sign_out_error: Mutex<Option<String>>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            tx,
            session: Mutex::new(None),
            accounts: Mutex::new(HashMap::new()),
            require_confirmation: false,
            session_gate: None,
            sign_out_error: Mutex::new(None),
        }
    }

    pub fn with_session(self, session: AuthSession) -> Self {
        *self.session.lock().unwrap() = Some(session);
        self
    }

    pub fn with_account(self, email: &str, user: AuthUser) -> Self {
        self.accounts.lock().unwrap().insert(email.to_string(), user);
        self
    }

    pub fn emit(&self, event: AuthEvent, session: Option<AuthSession>) {
        *self.session.lock().unwrap() = session.clone();
        let _ = self.tx.send(AuthChange { event, session });
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let user = self.accounts.lock().unwrap().get(email).cloned();
        match user {
            Some(user) if password == "correct horse" => {
                let mut session = session_for(&user.id);
                session.user = user;
                self.emit(AuthEvent::SignedIn, Some(session.clone()));
                Ok(session)
            }
            _ => Err(BackendError::BadRequest("Invalid login credentials".to_string())),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        details: &SignUpDetails,
    ) -> Result<SignUpResponse, BackendError> {
        if self.accounts.lock().unwrap().contains_key(email) {
            return Err(BackendError::BadRequest("User already registered".to_string()));
        }
        let mut user = user(&format!("new-{}", email.split('@').next().unwrap_or("user")));
        user.email = Some(email.to_string());
        user.user_metadata = UserMetadata {
            first_name: Some(details.first_name.clone()),
            last_name: Some(details.last_name.clone()),
            role: Some(details.role.as_str().to_string()),
        };
        self.accounts.lock().unwrap().insert(email.to_string(), user.clone());

        if self.require_confirmation {
            return Ok(SignUpResponse {
                user: Some(user),
                session: None,
            });
        }
        let mut session = session_for(&user.id);
        session.user = user.clone();
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(SignUpResponse {
            user: Some(user),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if let Some(message) = self.sign_out_error.lock().unwrap().clone() {
            return Err(BackendError::ServerError(message));
        }
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<AuthSession>, BackendError> {
        // Read before waiting so a gated answer reflects the session at call time
        let session = self.session.lock().unwrap().clone();
        if let Some(gate) = &self.session_gate {
            gate.notified().await;
        }
        Ok(session)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.tx.subscribe()
    }
}

pub struct FakeProfiles {
    pub rows: Mutex<HashMap<String, Profile>>,
    pub fail_insert: bool,
    pub fail_fetch: bool,
    /// When set, `fetch_by_user_id` waits for a notification before answering.
    pub fetch_gate: Option<Arc<Notify>>,
    pub fetch_calls: AtomicUsize,
    pub fetches_completed: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
}

impl FakeProfiles {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            fail_insert: false,
            fail_fetch: false,
            fetch_gate: None,
            fetch_calls: AtomicUsize::new(0),
            fetches_completed: AtomicUsize::new(0),
            insert_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        self.rows.lock().unwrap().insert(profile.user_id.clone(), profile);
        self
    }

    /// Wait until at least `count` fetches have finished.
    pub async fn wait_for_fetches(&self, count: usize) {
        for _ in 0..200 {
            if self.fetches_completed.load(Ordering::SeqCst) >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("profile fetches did not complete");
    }
}

#[async_trait]
impl ProfileStore for FakeProfiles {
    async fn fetch_by_user_id(&self, user_id: &str) -> Result<Option<Profile>, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.fetch_gate {
            gate.notified().await;
        }
        let result = if self.fail_fetch {
            Err(BackendError::ServerError("connection reset".to_string()))
        } else {
            Ok(self.rows.lock().unwrap().get(user_id).cloned())
        };
        self.fetches_completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn insert(&self, profile: &NewProfile) -> Result<Profile, BackendError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert {
            return Err(BackendError::AccessDenied(
                "new row violates row-level security policy".to_string(),
            ));
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&profile.user_id) {
            return Err(BackendError::Conflict("duplicate key value".to_string()));
        }
        let mut row = profile_for(&profile.user_id, profile.role);
        row.first_name = profile.first_name.clone();
        row.last_name = profile.last_name.clone();
        rows.insert(profile.user_id.clone(), row.clone());
        Ok(row)
    }

    async fn update(&self, profile_id: &str, update: &ProfileUpdate) -> Result<(), BackendError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .values_mut()
            .find(|p| p.id == profile_id)
            .ok_or_else(|| BackendError::NotFound(profile_id.to_string()))?;
        update.apply_to(row);
        Ok(())
    }
}

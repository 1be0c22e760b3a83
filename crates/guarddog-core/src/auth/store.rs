//! The session store: one authoritative snapshot of who is signed in.
//!
//! Exactly one update routine writes the snapshot. It is fed by two paths
//! started from `initialize()`:
//!
//! - a listener task draining the identity provider's change stream, and
//! - a one-shot fetch of the current session.
//!
//! Profiles are fetched in background tasks and committed only if the
//! snapshot still belongs to the user they were fetched for, so a slow
//! fetch can never write a profile into a session that has since signed
//! out or switched user. Readers get a `watch::Receiver` and only ever see
//! whole snapshots.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{
    AuthChange, AuthError, AuthEvent, AuthSession, AuthUser, IdentityProvider, ProfileStore,
    SignUpDetails,
};
use crate::backend::BackendError;
use crate::models::{NewProfile, Profile, ProfileUpdate, Role};
use crate::notify::Notifier;

/// Point-in-time view of the session.
///
/// `profile` is only ever present alongside `identity`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub identity: Option<AuthSession>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            identity: None,
            profile: None,
            loading: true,
        }
    }
}

impl SessionSnapshot {
    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|s| s.user_id())
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    pub fn email(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|s| s.user.email.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct SessionStoreOptions {
    /// Recreate a missing profile row from the identity's sign-up metadata.
    pub repair_missing_profiles: bool,
}

impl Default for SessionStoreOptions {
    fn default() -> Self {
        Self {
            repair_missing_profiles: true,
        }
    }
}

/// What `sign_up` achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user_id: Option<String>,
    /// The provider wants the email address confirmed before sign-in.
    pub confirmation_pending: bool,
    /// False when the account exists but its profile row could not be written.
    pub profile_created: bool,
}

struct Inner {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    notifier: Notifier,
    options: SessionStoreOptions,
    state: watch::Sender<SessionSnapshot>,
    /// Number of change notifications applied so far.
    changes_applied: AtomicU64,
    /// User ids with a profile fetch in flight.
    fetching: Mutex<HashSet<String>>,
}

impl Inner {
    fn on_session_change(self: &Arc<Self>, event: AuthEvent, session: Option<AuthSession>) {
        debug!(?event, user_id = ?session.as_ref().map(|s| s.user_id()), "Session change");
        self.changes_applied.fetch_add(1, Ordering::SeqCst);
        self.apply_session(session, None);
    }

    /// The single state-update routine.
    ///
    /// With `expected_changes` set, the session is dropped if any change
    /// notification was applied after that count was read.
    fn apply_session(self: &Arc<Self>, session: Option<AuthSession>, expected_changes: Option<u64>) {
        let mut fetch_for: Option<AuthUser> = None;

        self.state.send_if_modified(|current| {
            if let Some(expected) = expected_changes {
                if self.changes_applied.load(Ordering::SeqCst) != expected {
                    debug!("Session changed while the initial session was in flight, discarding it");
                    return false;
                }
            }

            let next = match session {
                Some(session) => {
                    let same_user = current.user_id() == Some(session.user_id());
                    let profile = if same_user { current.profile.clone() } else { None };
                    if profile.is_none() {
                        fetch_for = Some(session.user.clone());
                    }
                    SessionSnapshot {
                        identity: Some(session),
                        profile,
                        loading: false,
                    }
                }
                None => SessionSnapshot {
                    identity: None,
                    profile: None,
                    loading: false,
                },
            };

            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });

        if let Some(user) = fetch_for {
            self.schedule_profile_fetch(user);
        }
    }

    fn schedule_profile_fetch(self: &Arc<Self>, user: AuthUser) {
        {
            let mut fetching = self.fetching.lock().unwrap_or_else(|e| e.into_inner());
            if !fetching.insert(user.id.clone()) {
                debug!(user_id = %user.id, "Profile fetch already in flight");
                return;
            }
        }

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.fetch_profile(&user).await;
            inner
                .fetching
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&user.id);
        });
    }

    /// Fetch and commit the profile for `user`. Failures are logged and
    /// leave the profile unset.
    async fn fetch_profile(&self, user: &AuthUser) {
        match self.profiles.fetch_by_user_id(&user.id).await {
            Ok(Some(profile)) => {
                self.commit_profile(&user.id, profile);
            }
            Ok(None) => {
                warn!(user_id = %user.id, "No profile found for user");
                if self.options.repair_missing_profiles {
                    self.repair_profile(user).await;
                }
            }
            Err(e) => {
                error!(user_id = %user.id, error = %e, "Error fetching profile");
            }
        }
    }

    /// Recreate a profile row that sign-up failed to write.
    async fn repair_profile(&self, user: &AuthUser) {
        let Some(details) = user.user_metadata.sign_up_details() else {
            debug!(user_id = %user.id, "No sign-up metadata to rebuild profile from");
            return;
        };
        if self.state.borrow().user_id() != Some(user.id.as_str()) {
            return;
        }

        let new_profile = NewProfile {
            user_id: user.id.clone(),
            first_name: details.first_name,
            last_name: details.last_name,
            role: details.role,
        };
        match self.profiles.insert(&new_profile).await {
            Ok(profile) => {
                info!(user_id = %user.id, "Recreated missing profile from sign-up metadata");
                self.commit_profile(&user.id, profile);
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Failed to recreate missing profile");
            }
        }
    }

    /// Store `profile` if the snapshot still belongs to `user_id`.
    fn commit_profile(&self, user_id: &str, profile: Profile) -> bool {
        let committed = self.state.send_if_modified(|current| {
            let still_current = current.user_id() == Some(user_id) && profile.user_id == user_id;
            if !still_current || current.profile.as_ref() == Some(&profile) {
                return false;
            }
            current.profile = Some(profile);
            true
        });
        if !committed {
            debug!(user_id = %user_id, "Profile not committed; session moved on or unchanged");
        }
        committed
    }
}

/// Process-wide session holder. Create one, call `initialize()` once, hand
/// receivers from `subscribe()` to views, and `shutdown()` on exit.
pub struct SessionStore {
    inner: Arc<Inner>,
    initialized: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        notifier: Notifier,
    ) -> Self {
        Self::with_options(identity, profiles, notifier, SessionStoreOptions::default())
    }

    pub fn with_options(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        notifier: Notifier,
        options: SessionStoreOptions,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                identity,
                profiles,
                notifier,
                options,
                state,
                changes_applied: AtomicU64::new(0),
                fetching: Mutex::new(HashSet::new()),
            }),
            initialized: AtomicBool::new(false),
            listener: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Start listening for session changes and resolve the current session.
    /// Calling it again is a no-op.
    pub async fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("Session store already initialized");
            return;
        }

        let rx = self.inner.identity.subscribe();
        let handle = tokio::spawn(Self::listen(Arc::clone(&self.inner), rx));
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        let seen = self.inner.changes_applied.load(Ordering::SeqCst);
        let session = match self.inner.identity.current_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to fetch current session");
                None
            }
        };
        self.inner.apply_session(session, Some(seen));
        info!(authenticated = self.snapshot().is_authenticated(), "Session store initialized");
    }

    async fn listen(inner: Arc<Inner>, mut rx: broadcast::Receiver<AuthChange>) {
        loop {
            match rx.recv().await {
                Ok(change) => inner.on_session_change(change.event, change.session),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session change stream lagged, resynchronizing");
                    match inner.identity.current_session().await {
                        Ok(session) => inner.on_session_change(AuthEvent::InitialSession, session),
                        Err(e) => error!(error = %e, "Failed to resynchronize session"),
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Session change stream closed");
                    break;
                }
            }
        }
    }

    /// Sign in with email and password. The new session reaches the
    /// snapshot through the change stream.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            let err = AuthError::MissingCredentials;
            self.inner.notifier.error("Error", &err.user_message());
            return Err(err);
        }

        match self.inner.identity.sign_in_with_password(email.trim(), password).await {
            Ok(session) => {
                info!(user_id = %session.user_id(), "Signed in");
                self.inner
                    .notifier
                    .success("Welcome back!", "You have successfully signed in.");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Sign in failed");
                let err = AuthError::from(e);
                self.inner.notifier.error("Error", &err.user_message());
                Err(err)
            }
        }
    }

    /// Create an account and its profile row.
    ///
    /// Returns `Ok` once the identity exists, even if the profile insert
    /// fails; that case is reported through a notification and
    /// `SignUpOutcome::profile_created`.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        details: SignUpDetails,
    ) -> Result<SignUpOutcome, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            let err = AuthError::MissingCredentials;
            self.inner.notifier.error("Error", &err.user_message());
            return Err(err);
        }

        let response = match self.inner.identity.sign_up(email.trim(), password, &details).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Sign up failed");
                let err = AuthError::from(e);
                self.inner.notifier.error("Error", &err.user_message());
                return Err(err);
            }
        };

        let confirmation_pending = response.user.is_some() && response.session.is_none();
        if confirmation_pending {
            self.inner
                .notifier
                .info("Check your email", "We've sent you a confirmation link.");
        }

        let mut profile_created = false;
        if let Some(ref user) = response.user {
            let new_profile = NewProfile {
                user_id: user.id.clone(),
                first_name: details.first_name.clone(),
                last_name: details.last_name.clone(),
                role: details.role,
            };
            match self.inner.profiles.insert(&new_profile).await {
                Ok(profile) => {
                    profile_created = true;
                    self.inner.commit_profile(&user.id, profile);
                }
                Err(BackendError::Conflict(_)) => {
                    // The profile was written by a concurrent repair
                    debug!(user_id = %user.id, "Profile already exists");
                    profile_created = true;
                }
                Err(e) => {
                    error!(user_id = %user.id, error = %e, "Error creating profile");
                    self.inner.notifier.error("Error", "Failed to create user profile.");
                }
            }
        }

        Ok(SignUpOutcome {
            user_id: response.user.map(|u| u.id),
            confirmation_pending,
            profile_created,
        })
    }

    /// Sign out. The cleared session reaches the snapshot through the
    /// change stream.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        match self.inner.identity.sign_out().await {
            Ok(()) => {
                info!("Signed out");
                self.inner
                    .notifier
                    .success("Signed out", "You have successfully signed out.");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Sign out failed");
                let err = AuthError::from(e);
                self.inner.notifier.error("Error", &err.user_message());
                Err(err)
            }
        }
    }

    /// Update the signed-in user's profile and merge the change into the
    /// snapshot without refetching.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<(), AuthError> {
        let profile_id = self
            .inner
            .state
            .borrow()
            .profile
            .as_ref()
            .map(|p| p.id.clone())
            .ok_or(AuthError::NoActiveProfile)?;

        if update.is_empty() {
            return Ok(());
        }

        self.inner
            .profiles
            .update(&profile_id, &update)
            .await
            .map_err(|e| {
                error!(profile_id = %profile_id, error = %e, "Error updating profile");
                AuthError::from(e)
            })?;

        self.inner.state.send_if_modified(|current| match current.profile.as_mut() {
            Some(profile) if profile.id == profile_id => {
                update.apply_to(profile);
                true
            }
            _ => false,
        });
        Ok(())
    }

    /// Stop listening for session changes.
    pub fn shutdown(&self) {
        let handle = self.listener.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("Session listener stopped");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;
    use crate::auth::fake::{profile_for, session_for, user, FakeIdentity, FakeProfiles};
    use crate::guard::{AccessGuard, Rendering};
    use crate::notify::{Notification, NotificationKind};

    async fn wait_until(
        store: &SessionStore,
        pred: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        let mut rx = store.subscribe();
        let snapshot = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred))
            .await
            .expect("timed out waiting for session state")
            .expect("session store dropped")
            .clone();
        snapshot
    }

    fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    fn store_with(identity: Arc<FakeIdentity>, profiles: Arc<FakeProfiles>) -> SessionStore {
        SessionStore::new(identity, profiles, Notifier::new())
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_new_store_is_loading_and_empty() {
        let store = store_with(Arc::new(FakeIdentity::new()), Arc::new(FakeProfiles::new()));
        let snapshot = store.snapshot();
        assert!(snapshot.loading);
        assert!(snapshot.identity.is_none());
        assert!(snapshot.profile.is_none());
    }

    #[tokio::test]
    async fn test_initialize_resolves_existing_session_and_profile() {
        let identity = Arc::new(FakeIdentity::new().with_session(session_for("a")));
        let profiles = Arc::new(FakeProfiles::new().with_profile(profile_for("a", Role::Teacher)));
        let store = store_with(identity, profiles);

        store.initialize().await;
        assert!(!store.snapshot().loading);
        assert_eq!(store.snapshot().user_id(), Some("a"));

        let snapshot = wait_until(&store, |s| s.profile.is_some()).await;
        assert_eq!(snapshot.role(), Some(Role::Teacher));
    }

    #[tokio::test]
    async fn test_initialize_without_session_stops_loading() {
        let profiles = Arc::new(FakeProfiles::new());
        let store = store_with(Arc::new(FakeIdentity::new()), profiles.clone());

        store.initialize().await;
        let snapshot = store.snapshot();
        assert!(!snapshot.loading);
        assert!(snapshot.identity.is_none());
        assert_eq!(profiles.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let identity = Arc::new(FakeIdentity::new().with_session(session_for("a")));
        let profiles = Arc::new(FakeProfiles::new().with_profile(profile_for("a", Role::Student)));
        let store = store_with(identity.clone(), profiles.clone());

        store.initialize().await;
        wait_until(&store, |s| s.profile.is_some()).await;
        store.initialize().await;

        // One listener only: a single event produces a single state change
        identity.emit(AuthEvent::SignedOut, None);
        let snapshot = wait_until(&store, |s| s.identity.is_none()).await;
        assert!(snapshot.profile.is_none());
        assert_eq!(profiles.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_listening() {
        let identity = Arc::new(FakeIdentity::new());
        let store = store_with(identity.clone(), Arc::new(FakeProfiles::new()));
        store.initialize().await;
        store.shutdown();

        identity.emit(AuthEvent::SignedIn, Some(session_for("a")));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.snapshot().identity.is_none());
    }

    // -------------------------------------------------------------------------
    // Session changes
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sign_out_event_clears_identity_and_profile() {
        let identity = Arc::new(FakeIdentity::new().with_session(session_for("a")));
        let profiles = Arc::new(FakeProfiles::new().with_profile(profile_for("a", Role::Student)));
        let store = store_with(identity.clone(), profiles);
        store.initialize().await;
        wait_until(&store, |s| s.profile.is_some()).await;

        identity.emit(AuthEvent::SignedOut, None);
        let snapshot = wait_until(&store, |s| s.identity.is_none()).await;
        assert!(snapshot.profile.is_none());
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_same_event_twice_is_idempotent() {
        let identity = Arc::new(FakeIdentity::new());
        let profiles = Arc::new(FakeProfiles::new().with_profile(profile_for("a", Role::Teacher)));
        let store = store_with(identity.clone(), profiles.clone());
        store.initialize().await;

        let session = session_for("a");
        identity.emit(AuthEvent::SignedIn, Some(session.clone()));
        let first = wait_until(&store, |s| s.profile.is_some()).await;

        identity.emit(AuthEvent::SignedIn, Some(session));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = store.snapshot();

        assert_eq!(first, second);
        assert_eq!(profiles.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_refresh_keeps_profile() {
        let identity = Arc::new(FakeIdentity::new().with_session(session_for("a")));
        let profiles = Arc::new(FakeProfiles::new().with_profile(profile_for("a", Role::Student)));
        let store = store_with(identity.clone(), profiles.clone());
        store.initialize().await;
        wait_until(&store, |s| s.profile.is_some()).await;

        let mut refreshed = session_for("a");
        refreshed.access_token = "rotated".to_string();
        identity.emit(AuthEvent::TokenRefreshed, Some(refreshed));

        let snapshot = wait_until(&store, |s| {
            s.identity.as_ref().map(|i| i.access_token.as_str()) == Some("rotated")
        })
        .await;
        assert!(snapshot.profile.is_some());
        assert_eq!(profiles.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_user_switch_drops_previous_profile() {
        let identity = Arc::new(FakeIdentity::new().with_session(session_for("a")));
        let profiles = Arc::new(
            FakeProfiles::new()
                .with_profile(profile_for("a", Role::Teacher))
                .with_profile(profile_for("b", Role::Student)),
        );
        let store = store_with(identity.clone(), profiles);
        store.initialize().await;
        wait_until(&store, |s| s.profile.is_some()).await;

        identity.emit(AuthEvent::SignedIn, Some(session_for("b")));
        let snapshot = wait_until(&store, |s| s.user_id() == Some("b")).await;
        // Never a profile that belongs to someone else
        assert!(snapshot.profile.as_ref().map_or(true, |p| p.user_id == "b"));

        let snapshot = wait_until(&store, |s| s.profile.is_some()).await;
        assert_eq!(snapshot.role(), Some(Role::Student));
    }

    #[tokio::test]
    async fn test_late_profile_fetch_is_discarded_after_sign_out() {
        let gate = Arc::new(Notify::new());
        let mut profiles = FakeProfiles::new().with_profile(profile_for("a", Role::Student));
        profiles.fetch_gate = Some(gate.clone());
        let profiles = Arc::new(profiles);
        let identity = Arc::new(FakeIdentity::new());
        let store = store_with(identity.clone(), profiles.clone());
        store.initialize().await;

        identity.emit(AuthEvent::SignedIn, Some(session_for("a")));
        wait_until(&store, |s| s.user_id() == Some("a")).await;
        identity.emit(AuthEvent::SignedOut, None);
        wait_until(&store, |s| s.identity.is_none()).await;

        gate.notify_one();
        profiles.wait_for_fetches(1).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let snapshot = store.snapshot();
        assert!(snapshot.identity.is_none());
        assert!(snapshot.profile.is_none());
    }

    #[tokio::test]
    async fn test_late_initial_session_is_discarded_after_sign_out() {
        let gate = Arc::new(Notify::new());
        let mut identity = FakeIdentity::new().with_session(session_for("a"));
        identity.session_gate = Some(gate.clone());
        let identity = Arc::new(identity);
        let profiles = Arc::new(FakeProfiles::new().with_profile(profile_for("a", Role::Student)));
        let store = store_with(identity.clone(), profiles.clone());

        let mut rx = store.subscribe();
        let sign_out_first = async {
            identity.emit(AuthEvent::SignedOut, None);
            rx.wait_for(|s| !s.loading).await.unwrap();
            gate.notify_one();
        };
        tokio::join!(store.initialize(), sign_out_first);

        let snapshot = store.snapshot();
        assert!(snapshot.identity.is_none());
        assert!(snapshot.profile.is_none());
        assert_eq!(profiles.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_profile_fetch_error_leaves_profile_unset() {
        let mut profiles = FakeProfiles::new().with_profile(profile_for("a", Role::Student));
        profiles.fail_fetch = true;
        let profiles = Arc::new(profiles);
        let identity = Arc::new(FakeIdentity::new().with_session(session_for("a")));
        let store = store_with(identity, profiles.clone());

        store.initialize().await;
        profiles.wait_for_fetches(1).await;
        let snapshot = store.snapshot();
        assert!(snapshot.identity.is_some());
        assert!(snapshot.profile.is_none());
    }

    #[tokio::test]
    async fn test_missing_profile_is_repaired_from_metadata() {
        let mut session = session_for("a");
        session.user.user_metadata.first_name = Some("A".to_string());
        session.user.user_metadata.last_name = Some("B".to_string());
        session.user.user_metadata.role = Some("teacher".to_string());
        let identity = Arc::new(FakeIdentity::new().with_session(session));
        let profiles = Arc::new(FakeProfiles::new());
        let store = store_with(identity, profiles.clone());

        store.initialize().await;
        let snapshot = wait_until(&store, |s| s.profile.is_some()).await;
        let profile = snapshot.profile.unwrap();
        assert_eq!(profile.role, Role::Teacher);
        assert_eq!(profile.full_name(), "A B");
        assert_eq!(profiles.insert_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repair_disabled_leaves_profile_missing() {
        let mut session = session_for("a");
        session.user.user_metadata.first_name = Some("A".to_string());
        session.user.user_metadata.last_name = Some("B".to_string());
        session.user.user_metadata.role = Some("teacher".to_string());
        let identity = Arc::new(FakeIdentity::new().with_session(session));
        let profiles = Arc::new(FakeProfiles::new());
        let store = SessionStore::with_options(
            identity,
            profiles.clone(),
            Notifier::new(),
            SessionStoreOptions {
                repair_missing_profiles: false,
            },
        );

        store.initialize().await;
        profiles.wait_for_fetches(1).await;
        assert!(store.snapshot().profile.is_none());
        assert_eq!(profiles.insert_calls.load(Ordering::SeqCst), 0);
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sign_in_success_notifies_and_resolves_session() {
        let identity = Arc::new(FakeIdentity::new().with_account("a@b.com", user("a")));
        let profiles = Arc::new(FakeProfiles::new().with_profile(profile_for("a", Role::Student)));
        let store = store_with(identity, profiles);
        let mut notifications = store.notifier().subscribe();
        store.initialize().await;

        store.sign_in("a@b.com", "correct horse").await.unwrap();
        let snapshot = wait_until(&store, |s| s.profile.is_some()).await;
        assert_eq!(snapshot.user_id(), Some("a"));

        let sent = drain(&mut notifications);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Success);
        assert_eq!(sent[0].title, "Welcome back!");
    }

    #[tokio::test]
    async fn test_sign_in_failure_returns_error_and_notifies() {
        let identity = Arc::new(FakeIdentity::new().with_account("a@b.com", user("a")));
        let store = store_with(identity, Arc::new(FakeProfiles::new()));
        let mut notifications = store.notifier().subscribe();
        store.initialize().await;

        let result = store.sign_in("a@b.com", "wrong").await;
        assert!(matches!(result, Err(AuthError::Backend(BackendError::BadRequest(_)))));
        assert!(store.snapshot().identity.is_none());

        let sent = drain(&mut notifications);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Error);
        assert_eq!(sent[0].description.as_deref(), Some("Invalid login credentials"));
    }

    #[tokio::test]
    async fn test_sign_in_requires_credentials() {
        let store = store_with(Arc::new(FakeIdentity::new()), Arc::new(FakeProfiles::new()));
        let result = store.sign_in("  ", "pw").await;
        assert!(matches!(result, Err(AuthError::MissingCredentials)));
    }

    #[tokio::test]
    async fn test_sign_up_creates_identity_and_profile() {
        let identity = Arc::new(FakeIdentity::new());
        let profiles = Arc::new(FakeProfiles::new());
        let store = store_with(identity, profiles);
        store.initialize().await;

        let outcome = store
            .sign_up(
                "a@b.com",
                "x",
                SignUpDetails {
                    first_name: "A".to_string(),
                    last_name: "B".to_string(),
                    role: Role::Teacher,
                },
            )
            .await
            .unwrap();
        assert!(outcome.profile_created);
        assert!(!outcome.confirmation_pending);

        let snapshot = wait_until(&store, |s| s.profile.is_some()).await;
        assert_eq!(snapshot.role(), Some(Role::Teacher));
    }

    #[tokio::test]
    async fn test_sign_up_profile_failure_reports_identity_success() {
        let identity = Arc::new(FakeIdentity::new());
        let mut profiles = FakeProfiles::new();
        profiles.fail_insert = true;
        let profiles = Arc::new(profiles);
        let store = SessionStore::with_options(
            identity,
            profiles.clone(),
            Notifier::new(),
            SessionStoreOptions {
                repair_missing_profiles: false,
            },
        );
        let mut notifications = store.notifier().subscribe();
        store.initialize().await;

        let outcome = store
            .sign_up(
                "a@b.com",
                "x",
                SignUpDetails {
                    first_name: "A".to_string(),
                    last_name: "B".to_string(),
                    role: Role::Teacher,
                },
            )
            .await
            .unwrap();
        assert!(!outcome.profile_created);
        assert!(outcome.user_id.is_some());

        let sent = drain(&mut notifications);
        assert!(sent.iter().any(|n| n.kind == NotificationKind::Error
            && n.description.as_deref() == Some("Failed to create user profile.")));

        wait_until(&store, |s| s.identity.is_some()).await;
        profiles.wait_for_fetches(1).await;
        let snapshot = store.snapshot();
        assert!(snapshot.profile.is_none());
        let view = AccessGuard::new(None).evaluate(&snapshot);
        assert_eq!(view.rendering, Rendering::SettingUpProfile);
        assert!(view.navigation.is_none());
    }

    #[tokio::test]
    async fn test_sign_up_with_confirmation_pending() {
        let mut identity = FakeIdentity::new();
        identity.require_confirmation = true;
        let store = store_with(Arc::new(identity), Arc::new(FakeProfiles::new()));
        let mut notifications = store.notifier().subscribe();
        store.initialize().await;

        let outcome = store
            .sign_up(
                "new@b.com",
                "x",
                SignUpDetails {
                    first_name: "N".to_string(),
                    last_name: "Ew".to_string(),
                    role: Role::Student,
                },
            )
            .await
            .unwrap();
        assert!(outcome.confirmation_pending);
        assert!(outcome.profile_created);
        // No session yet, so nothing is committed to the snapshot
        assert!(store.snapshot().identity.is_none());
        assert!(store.snapshot().profile.is_none());

        let sent = drain(&mut notifications);
        assert_eq!(sent[0].title, "Check your email");
    }

    #[tokio::test]
    async fn test_sign_up_rejected_by_provider() {
        let identity = Arc::new(FakeIdentity::new().with_account("a@b.com", user("a")));
        let profiles = Arc::new(FakeProfiles::new());
        let store = store_with(identity, profiles.clone());

        let result = store
            .sign_up(
                "a@b.com",
                "x",
                SignUpDetails {
                    first_name: "A".to_string(),
                    last_name: "B".to_string(),
                    role: Role::Student,
                },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(profiles.insert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_out_notifies_and_clears() {
        let identity = Arc::new(FakeIdentity::new().with_session(session_for("a")));
        let profiles = Arc::new(FakeProfiles::new().with_profile(profile_for("a", Role::Student)));
        let store = store_with(identity, profiles);
        let mut notifications = store.notifier().subscribe();
        store.initialize().await;
        wait_until(&store, |s| s.profile.is_some()).await;

        store.sign_out().await.unwrap();
        let snapshot = wait_until(&store, |s| s.identity.is_none()).await;
        assert!(snapshot.profile.is_none());

        let sent = drain(&mut notifications);
        assert_eq!(sent.last().map(|n| n.title.as_str()), Some("Signed out"));
    }

    #[tokio::test]
    async fn test_sign_out_failure_keeps_session() {
        let identity = Arc::new(FakeIdentity::new().with_session(session_for("a")));
        *identity.sign_out_error.lock().unwrap() = Some("unavailable".to_string());
        let store = store_with(identity, Arc::new(FakeProfiles::new()));
        store.initialize().await;

        assert!(store.sign_out().await.is_err());
        assert!(store.snapshot().identity.is_some());
    }

    #[tokio::test]
    async fn test_update_profile_without_profile_makes_no_call() {
        let profiles = Arc::new(FakeProfiles::new());
        let store = store_with(Arc::new(FakeIdentity::new()), profiles.clone());
        store.initialize().await;

        let result = store
            .update_profile(ProfileUpdate {
                first_name: Some("Z".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(AuthError::NoActiveProfile)));
        assert_eq!(profiles.update_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_update_profile_merges_into_snapshot() {
        let identity = Arc::new(FakeIdentity::new().with_session(session_for("a")));
        let profiles = Arc::new(FakeProfiles::new().with_profile(profile_for("a", Role::Student)));
        let store = store_with(identity, profiles.clone());
        store.initialize().await;
        wait_until(&store, |s| s.profile.is_some()).await;

        store
            .update_profile(ProfileUpdate {
                first_name: Some("Grace".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let profile = store.snapshot().profile.unwrap();
        assert_eq!(profile.first_name, "Grace");
        assert_eq!(profile.role, Role::Student);
        assert_eq!(profiles.update_calls.load(Ordering::SeqCst), 1);
        assert_eq!(profiles.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_profile_never_without_identity() {
        let identity = Arc::new(FakeIdentity::new().with_session(session_for("a")));
        let profiles = Arc::new(FakeProfiles::new().with_profile(profile_for("a", Role::Student)));
        let store = store_with(identity.clone(), profiles);
        let mut rx = store.subscribe();
        store.initialize().await;

        identity.emit(AuthEvent::SignedOut, None);
        identity.emit(AuthEvent::SignedIn, Some(session_for("a")));
        identity.emit(AuthEvent::SignedOut, None);

        for _ in 0..5 {
            let snapshot = rx.borrow_and_update().clone();
            assert!(snapshot.profile.is_none() || snapshot.identity.is_some());
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let snapshot = wait_until(&store, |s| s.identity.is_none()).await;
        assert!(snapshot.profile.is_none());
    }
}

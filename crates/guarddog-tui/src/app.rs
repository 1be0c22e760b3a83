//! Application state for the guarddog terminal client.
//!
//! `App` owns the router, the guard mounted on the current route, the form
//! state of every view and the data the dashboards show. Session state is
//! never written here: it arrives as snapshots from the `SessionStore`, and
//! every network call runs in a background task that reports back through
//! an mpsc channel.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use guarddog_core::auth::{
    CredentialStore, IdentityProvider, ProfileStore, SessionStoreOptions, SignUpDetails,
    SignUpOutcome,
};
use guarddog_core::classroom::{
    average_progress, class_stats, parse_progress, ClassEnrollmentView, ClassStats,
    ClassroomService, ClassroomStore, ProgressEntry, SaveOutcome, StudentEnrollmentView,
};
use guarddog_core::models::{Class, EnrollmentStatus, Role, StudentSummary};
use guarddog_core::{
    AccessGuard, Config, GuardView, Navigation, Notification, Notifier, Rendering, Route, Router,
    SessionSnapshot, SessionStore,
};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for name inputs.
const MAX_NAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for the progress field ("100.00").
const MAX_PROGRESS_LENGTH: usize = 6;

/// Shortest password the identity service accepts.
const MIN_PASSWORD_LENGTH: usize = 6;

/// How often the session is checked so the access token is refreshed
/// before it expires.
const SESSION_CHECK_INTERVAL_SECS: u64 = 60;

/// Toasts shown at once; older ones are dropped first.
pub const MAX_VISIBLE_TOASTS: usize = 3;

/// Guard redirects followed in one pass before giving up.
const MAX_REDIRECTS_PER_TICK: usize = 4;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    EditingProgress,
    ConfirmingQuit,
    Quitting,
}

/// Panel focus on the teacher dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Detail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
    RegisterLink,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::RegisterLink,
            LoginFocus::RegisterLink => LoginFocus::Email,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::RegisterLink,
            LoginFocus::Password => LoginFocus::Email,
            LoginFocus::Button => LoginFocus::Password,
            LoginFocus::RegisterLink => LoginFocus::Button,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterFocus {
    FirstName,
    LastName,
    Email,
    Password,
    ConfirmPassword,
    Role,
    Button,
    LoginLink,
}

impl RegisterFocus {
    pub fn next(&self) -> Self {
        match self {
            RegisterFocus::FirstName => RegisterFocus::LastName,
            RegisterFocus::LastName => RegisterFocus::Email,
            RegisterFocus::Email => RegisterFocus::Password,
            RegisterFocus::Password => RegisterFocus::ConfirmPassword,
            RegisterFocus::ConfirmPassword => RegisterFocus::Role,
            RegisterFocus::Role => RegisterFocus::Button,
            RegisterFocus::Button => RegisterFocus::LoginLink,
            RegisterFocus::LoginLink => RegisterFocus::FirstName,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            RegisterFocus::FirstName => RegisterFocus::LoginLink,
            RegisterFocus::LastName => RegisterFocus::FirstName,
            RegisterFocus::Email => RegisterFocus::LastName,
            RegisterFocus::Password => RegisterFocus::Email,
            RegisterFocus::ConfirmPassword => RegisterFocus::Password,
            RegisterFocus::Role => RegisterFocus::ConfirmPassword,
            RegisterFocus::Button => RegisterFocus::Role,
            RegisterFocus::LoginLink => RegisterFocus::Button,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressFocus {
    Student,
    Progress,
    Status,
    Button,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub focus: LoginFocus,
    pub error: Option<String>,
    pub submitting: bool,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            focus: LoginFocus::Email,
            error: None,
            submitting: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
    pub focus: RegisterFocus,
    pub error: Option<String>,
    pub submitting: bool,
}

impl Default for RegisterForm {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            role: Role::Student,
            focus: RegisterFocus::FirstName,
            error: None,
            submitting: false,
        }
    }
}

impl RegisterForm {
    /// Check the form before anything is sent.
    pub fn validate(&self) -> Result<SignUpDetails, String> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err("First and last name are required".to_string());
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err("Enter a valid email address".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ));
        }
        if self.password != self.confirm_password {
            return Err("Passwords do not match".to_string());
        }
        Ok(SignUpDetails {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            role: self.role,
        })
    }
}

/// The add/edit progress dialog on the teacher dashboard.
#[derive(Debug, Clone)]
pub struct ProgressForm {
    /// Set when editing an existing enrollment.
    pub enrollment_id: Option<String>,
    pub class_id: String,
    pub class_name: String,
    /// Name of the student being edited.
    pub student_name: Option<String>,
    pub students: Vec<StudentSummary>,
    pub students_loading: bool,
    pub student_selection: usize,
    pub progress: String,
    pub status: EnrollmentStatus,
    pub focus: ProgressFocus,
    pub error: Option<String>,
    pub submitting: bool,
}

impl ProgressForm {
    pub fn is_edit(&self) -> bool {
        self.enrollment_id.is_some()
    }

    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            ProgressFocus::Student => ProgressFocus::Progress,
            ProgressFocus::Progress => ProgressFocus::Status,
            ProgressFocus::Status => ProgressFocus::Button,
            ProgressFocus::Button if self.is_edit() => ProgressFocus::Progress,
            ProgressFocus::Button => ProgressFocus::Student,
        };
    }

    pub fn prev_focus(&mut self) {
        self.focus = match self.focus {
            ProgressFocus::Student => ProgressFocus::Button,
            ProgressFocus::Progress if self.is_edit() => ProgressFocus::Button,
            ProgressFocus::Progress => ProgressFocus::Student,
            ProgressFocus::Status => ProgressFocus::Progress,
            ProgressFocus::Button => ProgressFocus::Status,
        };
    }

    pub fn selected_student(&self) -> Option<&StudentSummary> {
        self.students.get(self.student_selection)
    }

    /// Build the entry to save, or the message to show.
    pub fn to_entry(&self) -> Result<ProgressEntry, String> {
        let progress = parse_progress(&self.progress).map_err(|e| e.user_message())?;
        let student_id = if self.is_edit() {
            None
        } else {
            Some(
                self.selected_student()
                    .map(|s| s.user_id.clone())
                    .ok_or_else(|| "Select a student to enroll".to_string())?,
            )
        };
        Ok(ProgressEntry {
            enrollment_id: self.enrollment_id.clone(),
            class_id: Some(self.class_id.clone()),
            student_id,
            progress,
            status: self.status,
        })
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from background tasks.
enum BackgroundResult {
    SignIn {
        email: String,
        result: Result<(), String>,
    },
    SignUp {
        email: String,
        result: Result<SignUpOutcome, String>,
    },
    SignOut(Result<(), String>),
    StudentEnrollments {
        user_id: String,
        result: Result<Vec<StudentEnrollmentView>, String>,
    },
    Classes(Result<Vec<Class>, String>),
    ClassEnrollments {
        class_id: String,
        result: Result<Vec<ClassEnrollmentView>, String>,
    },
    Students(Result<Vec<StudentSummary>, String>),
    ProgressSaved {
        class_id: String,
        result: Result<SaveOutcome, String>,
    },
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    store: Arc<SessionStore>,
    identity: Arc<dyn IdentityProvider>,
    classroom: ClassroomService,
    session_rx: watch::Receiver<SessionSnapshot>,
    notifications_rx: broadcast::Receiver<Notification>,

    /// Latest session snapshot received from the store.
    pub snapshot: SessionSnapshot,
    pub router: Router,
    /// Guard mounted on the current route; `None` on public routes.
    guard: Option<AccessGuard>,
    pub guard_view: Option<GuardView>,

    // UI State
    pub state: AppState,
    pub focus: Focus,
    pub login: LoginForm,
    pub register: RegisterForm,
    pub progress_form: Option<ProgressForm>,
    pub toasts: Vec<Notification>,
    pub status_message: Option<String>,
    pub busy: bool,

    // Student portal
    pub student_enrollments: Vec<StudentEnrollmentView>,
    pub student_selection: usize,

    // Teacher dashboard
    pub classes: Vec<Class>,
    pub class_selection: usize,
    pub class_enrollments: Vec<ClassEnrollmentView>,
    pub enrollment_selection: usize,

    /// Set when a sign-in left the public routes before the profile was
    /// known; the first authorized render of Home forwards to the
    /// role's dashboard.
    pending_landing: bool,
    /// Route and user the current view's data was loaded for.
    loaded_for: Option<(Route, String)>,
    last_session_check: Instant,

    // Background task channel
    result_rx: mpsc::Receiver<BackgroundResult>,
    result_tx: mpsc::Sender<BackgroundResult>,
}

impl App {
    pub fn new(
        config: Config,
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        classroom_store: Arc<dyn ClassroomStore>,
    ) -> Self {
        let notifier = Notifier::new();
        let notifications_rx = notifier.subscribe();
        let options: SessionStoreOptions = config.session_store_options();
        let store = Arc::new(SessionStore::with_options(
            identity.clone(),
            profiles,
            notifier.clone(),
            options,
        ));
        let session_rx = store.subscribe();
        let snapshot = session_rx.borrow().clone();
        let classroom = ClassroomService::new(classroom_store, notifier);

        let (result_tx, result_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let login = LoginForm {
            email: config.last_email.clone().unwrap_or_default(),
            focus: if config.last_email.is_some() {
                LoginFocus::Password
            } else {
                LoginFocus::Email
            },
            ..LoginForm::default()
        };

        let router = Router::new(Route::Home);
        let guard = Some(AccessGuard::for_route(Route::Home));

        Self {
            config,
            store,
            identity,
            classroom,
            session_rx,
            notifications_rx,
            snapshot,
            router,
            guard,
            guard_view: None,
            state: AppState::Normal,
            focus: Focus::List,
            login,
            register: RegisterForm::default(),
            progress_form: None,
            toasts: Vec::new(),
            status_message: None,
            busy: false,
            student_enrollments: Vec::new(),
            student_selection: 0,
            classes: Vec::new(),
            class_selection: 0,
            class_enrollments: Vec::new(),
            enrollment_selection: 0,
            pending_landing: false,
            loaded_for: None,
            last_session_check: Instant::now(),
            result_rx,
            result_tx,
        }
    }

    /// Resolve the session in the background; the UI shows the loading
    /// state until it arrives.
    pub fn start(&self) {
        let store = self.store.clone();
        tokio::spawn(async move {
            store.initialize().await;
        });
    }

    pub fn shutdown(&self) {
        self.store.shutdown();
    }

    pub fn current_route(&self) -> Route {
        self.router.current()
    }

    pub fn rendering(&self) -> Option<Rendering> {
        self.guard_view.as_ref().map(|v| v.rendering)
    }

    fn spawn_task<F>(&self, task: F)
    where
        F: Future<Output = BackgroundResult> + Send + 'static,
    {
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let result = task.await;
            if tx.send(result).await.is_err() {
                debug!("App closed before background result arrived");
            }
        });
    }

    // =========================================================================
    // Per-frame update
    // =========================================================================

    /// Pull in everything that happened since the last frame.
    pub fn tick(&mut self) {
        self.sync_session();
        self.drain_notifications();
        self.check_background_tasks();
        self.evaluate_route();
        self.ensure_view_data();
        self.check_session_expiry();
    }

    fn sync_session(&mut self) {
        if self.session_rx.has_changed().unwrap_or(false) {
            let snapshot = self.session_rx.borrow_and_update().clone();
            if snapshot.user_id() != self.snapshot.user_id() {
                self.clear_view_data();
            }
            self.snapshot = snapshot;
        }
    }

    fn drain_notifications(&mut self) {
        loop {
            match self.notifications_rx.try_recv() {
                Ok(notification) => self.toasts.push(notification),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Dropped notifications");
                }
                Err(_) => break,
            }
        }
        let now = Utc::now();
        self.toasts.retain(|t| !t.is_expired(now));
        if self.toasts.len() > MAX_VISIBLE_TOASTS {
            let excess = self.toasts.len() - MAX_VISIBLE_TOASTS;
            self.toasts.drain(..excess);
        }
    }

    /// Run the mounted guard (or the public-route redirect) and follow any
    /// navigation it asks for.
    fn evaluate_route(&mut self) {
        for _ in 0..MAX_REDIRECTS_PER_TICK {
            let route = self.router.current();
            let navigation = match self.guard.as_mut() {
                Some(guard) => {
                    let view = guard.evaluate(&self.snapshot);
                    let navigation = view.navigation;
                    self.guard_view = Some(view);
                    navigation
                }
                None => {
                    self.guard_view = None;
                    let navigation = self.public_route_redirect(route);
                    if navigation.map(|n| n.to) == Some(Route::Home) {
                        self.pending_landing = true;
                    }
                    navigation
                }
            };
            let navigation = navigation.or_else(|| self.pending_landing_redirect(route));

            match navigation {
                Some(navigation) => {
                    debug!(from = %route, to = %navigation.to, mode = ?navigation.mode, "Navigating");
                    self.navigate(navigation);
                }
                None => return,
            }
        }
        warn!(route = %self.router.current(), "Too many redirects in one pass");
    }

    /// Signed-in users do not stay on the sign-in and registration views.
    fn public_route_redirect(&self, route: Route) -> Option<Navigation> {
        if route.is_protected() || self.snapshot.loading || !self.snapshot.is_authenticated() {
            return None;
        }
        let target = self
            .snapshot
            .role()
            .map(|role| role.landing_route())
            .unwrap_or(Route::Home);
        Some(Navigation::replace(target))
    }

    fn pending_landing_redirect(&mut self, route: Route) -> Option<Navigation> {
        if !self.pending_landing || !self.snapshot.is_authenticated() {
            self.pending_landing = false;
            return None;
        }
        if route != Route::Home || self.rendering() != Some(Rendering::Children) {
            return None;
        }
        self.pending_landing = false;
        self.snapshot
            .role()
            .map(|role| Navigation::replace(role.landing_route()))
    }

    /// Apply a navigation and mount the new route's guard.
    pub fn navigate(&mut self, navigation: Navigation) {
        let before = self.router.current();
        self.router.apply(navigation);
        if self.router.current() != before {
            self.on_route_changed();
        }
    }

    pub fn go_back(&mut self) {
        if self.router.back() {
            self.on_route_changed();
        }
    }

    fn on_route_changed(&mut self) {
        let route = self.router.current();
        self.guard = route.is_protected().then(|| AccessGuard::for_route(route));
        self.guard_view = None;
        self.focus = Focus::List;
        self.loaded_for = None;
        self.progress_form = None;
        if self.state == AppState::EditingProgress {
            self.state = AppState::Normal;
        }
        match route {
            Route::Login => {
                self.login.error = None;
                self.login.submitting = false;
            }
            Route::Register => {
                self.register.error = None;
                self.register.submitting = false;
            }
            _ => {}
        }
    }

    fn clear_view_data(&mut self) {
        self.student_enrollments.clear();
        self.student_selection = 0;
        self.classes.clear();
        self.class_selection = 0;
        self.class_enrollments.clear();
        self.enrollment_selection = 0;
        self.loaded_for = None;
    }

    /// Load the data of an authorized view once per route and user.
    fn ensure_view_data(&mut self) {
        if self.rendering() != Some(Rendering::Children) {
            return;
        }
        let Some(user_id) = self.snapshot.user_id().map(str::to_string) else {
            return;
        };
        let route = self.router.current();
        let key = (route, user_id.clone());
        if self.loaded_for.as_ref() == Some(&key) {
            return;
        }
        self.loaded_for = Some(key);

        match route {
            Route::Student => self.load_student_enrollments(user_id),
            Route::Teacher => self.load_classes(),
            Route::Home | Route::Login | Route::Register => {}
        }
    }

    /// Keep the access token fresh while the app is open.
    fn check_session_expiry(&mut self) {
        if self.last_session_check.elapsed() < Duration::from_secs(SESSION_CHECK_INTERVAL_SECS) {
            return;
        }
        self.last_session_check = Instant::now();
        if !self.snapshot.is_authenticated() {
            return;
        }
        let identity = self.identity.clone();
        tokio::spawn(async move {
            if let Err(e) = identity.current_session().await {
                warn!(error = %e, "Session check failed");
            }
        });
    }

    /// Reload the current view's data.
    pub fn refresh_current_view(&mut self) {
        self.loaded_for = None;
        self.status_message = Some("Refreshing...".to_string());
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn submit_login(&mut self) {
        if self.login.submitting {
            return;
        }
        let email = self.login.email.trim().to_string();
        if email.is_empty() || self.login.password.is_empty() {
            self.login.error = Some("Email and password are required".to_string());
            return;
        }

        self.login.error = None;
        self.login.submitting = true;
        let password = self.login.password.clone();
        let store = self.store.clone();
        self.spawn_task(async move {
            let result = store
                .sign_in(&email, &password)
                .await
                .map_err(|e| e.user_message());
            BackgroundResult::SignIn { email, result }
        });
    }

    /// Prefill the password from the keychain for the typed email.
    pub fn fill_saved_password(&mut self) {
        let email = self.login.email.trim();
        if email.is_empty() || !self.login.password.is_empty() {
            return;
        }
        match CredentialStore::get_password(email) {
            Ok(password) => {
                self.login.password = password;
                self.login.focus = LoginFocus::Button;
            }
            Err(e) => debug!(error = %e, "No saved password"),
        }
    }

    pub fn submit_register(&mut self) {
        if self.register.submitting {
            return;
        }
        let details = match self.register.validate() {
            Ok(details) => details,
            Err(message) => {
                self.register.error = Some(message);
                return;
            }
        };

        self.register.error = None;
        self.register.submitting = true;
        let email = self.register.email.trim().to_string();
        let password = self.register.password.clone();
        let store = self.store.clone();
        self.spawn_task(async move {
            let result = store
                .sign_up(&email, &password, details)
                .await
                .map_err(|e| e.user_message());
            BackgroundResult::SignUp { email, result }
        });
    }

    pub fn sign_out(&mut self) {
        if self.busy || !self.snapshot.is_authenticated() {
            return;
        }
        self.busy = true;
        if let Some(email) = self.snapshot.email() {
            if CredentialStore::has_credentials(email) {
                if let Err(e) = CredentialStore::delete(email) {
                    warn!(error = %e, "Failed to forget saved password");
                }
            }
        }
        let store = self.store.clone();
        self.spawn_task(async move {
            BackgroundResult::SignOut(store.sign_out().await.map_err(|e| e.user_message()))
        });
    }

    // =========================================================================
    // Dashboards
    // =========================================================================

    fn load_student_enrollments(&mut self, user_id: String) {
        self.busy = true;
        let classroom = self.classroom.clone();
        self.spawn_task(async move {
            let result = classroom
                .student_enrollments(&user_id)
                .await
                .map_err(|e| e.user_message());
            BackgroundResult::StudentEnrollments { user_id, result }
        });
    }

    fn load_classes(&mut self) {
        self.busy = true;
        let classroom = self.classroom.clone();
        self.spawn_task(async move {
            BackgroundResult::Classes(classroom.teacher_classes().await.map_err(|e| e.user_message()))
        });
    }

    fn load_class_enrollments(&mut self, class_id: String) {
        self.busy = true;
        let classroom = self.classroom.clone();
        self.spawn_task(async move {
            let result = classroom
                .class_enrollments(&class_id)
                .await
                .map_err(|e| e.user_message());
            BackgroundResult::ClassEnrollments { class_id, result }
        });
    }

    pub fn selected_class(&self) -> Option<&Class> {
        self.classes.get(self.class_selection)
    }

    pub fn select_class(&mut self, index: usize) {
        if index >= self.classes.len() || (index == self.class_selection && !self.class_enrollments.is_empty()) {
            return;
        }
        self.class_selection = index;
        self.class_enrollments.clear();
        self.enrollment_selection = 0;
        if let Some(class_id) = self.selected_class().map(|c| c.id.clone()) {
            self.load_class_enrollments(class_id);
        }
    }

    pub fn class_stats(&self) -> ClassStats {
        let rows: Vec<_> = self
            .class_enrollments
            .iter()
            .map(|v| v.enrollment.clone())
            .collect();
        class_stats(&rows, Utc::now())
    }

    pub fn student_average(&self) -> u32 {
        average_progress(self.student_enrollments.iter().map(|v| &v.enrollment))
    }

    pub fn open_add_progress(&mut self) {
        let Some(class) = self.selected_class() else {
            self.status_message = Some("Select a class first".to_string());
            return;
        };
        self.progress_form = Some(ProgressForm {
            enrollment_id: None,
            class_id: class.id.clone(),
            class_name: class.name.clone(),
            student_name: None,
            students: Vec::new(),
            students_loading: true,
            student_selection: 0,
            progress: "0".to_string(),
            status: EnrollmentStatus::Active,
            focus: ProgressFocus::Student,
            error: None,
            submitting: false,
        });
        self.state = AppState::EditingProgress;

        let classroom = self.classroom.clone();
        self.spawn_task(async move {
            BackgroundResult::Students(classroom.available_students().await.map_err(|e| e.user_message()))
        });
    }

    pub fn open_edit_progress(&mut self) {
        let Some(class) = self.selected_class() else {
            return;
        };
        let Some(view) = self.class_enrollments.get(self.enrollment_selection) else {
            return;
        };
        let progress = view.enrollment.progress_or_zero();
        self.progress_form = Some(ProgressForm {
            enrollment_id: Some(view.enrollment.id.clone()),
            class_id: class.id.clone(),
            class_name: class.name.clone(),
            student_name: Some(view.student_name.clone()),
            students: Vec::new(),
            students_loading: false,
            student_selection: 0,
            progress: format!("{}", progress),
            status: view.enrollment.status_or_default(),
            focus: ProgressFocus::Progress,
            error: None,
            submitting: false,
        });
        self.state = AppState::EditingProgress;
    }

    pub fn close_progress_form(&mut self) {
        self.progress_form = None;
        self.state = AppState::Normal;
    }

    pub fn submit_progress(&mut self) {
        let Some(form) = self.progress_form.as_mut() else {
            return;
        };
        if form.submitting {
            return;
        }
        let entry = match form.to_entry() {
            Ok(entry) => entry,
            Err(message) => {
                form.error = Some(message);
                return;
            }
        };
        form.error = None;
        form.submitting = true;

        let class_id = form.class_id.clone();
        let classroom = self.classroom.clone();
        self.spawn_task(async move {
            let result = classroom.save_progress(entry).await.map_err(|e| e.user_message());
            BackgroundResult::ProgressSaved { class_id, result }
        });
    }

    // =========================================================================
    // Background results
    // =========================================================================

    pub fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            results.push(result);
        }
        for result in results {
            self.process_background_result(result);
        }
    }

    fn process_background_result(&mut self, result: BackgroundResult) {
        match result {
            BackgroundResult::SignIn { email, result } => {
                self.login.submitting = false;
                match result {
                    Ok(()) => {
                        if let Err(e) = CredentialStore::store(&email, &self.login.password) {
                            warn!(error = %e, "Failed to store credentials");
                        }
                        if let Err(e) = Config::remember_email(&email) {
                            warn!(error = %e, "Failed to save config");
                        }
                        self.config.last_email = Some(email);
                        self.login.password.clear();
                        self.login.error = None;
                        info!("Sign-in complete");
                    }
                    Err(message) => self.login.error = Some(message),
                }
            }
            BackgroundResult::SignUp { email, result } => {
                self.register.submitting = false;
                match result {
                    Ok(outcome) => {
                        self.register.password.clear();
                        self.register.confirm_password.clear();
                        if outcome.confirmation_pending {
                            self.login.email = email;
                            self.login.focus = LoginFocus::Password;
                            self.navigate(Navigation::replace(Route::Login));
                        }
                    }
                    Err(message) => self.register.error = Some(message),
                }
            }
            BackgroundResult::SignOut(result) => {
                self.busy = false;
                if let Err(message) = result {
                    self.status_message = Some(message);
                }
            }
            BackgroundResult::StudentEnrollments { user_id, result } => {
                self.busy = false;
                if self.snapshot.user_id() != Some(user_id.as_str()) {
                    debug!("Discarding enrollments for a previous user");
                    return;
                }
                match result {
                    Ok(views) => {
                        self.student_enrollments = views;
                        self.student_selection = 0;
                        self.status_message = None;
                    }
                    Err(message) => self.status_message = Some(message),
                }
            }
            BackgroundResult::Classes(result) => {
                self.busy = false;
                match result {
                    Ok(classes) => {
                        let previous = self.selected_class().map(|c| c.id.clone());
                        self.classes = classes;
                        self.class_selection = previous
                            .and_then(|id| self.classes.iter().position(|c| c.id == id))
                            .unwrap_or(0);
                        self.status_message = None;
                        if let Some(class_id) = self.selected_class().map(|c| c.id.clone()) {
                            self.load_class_enrollments(class_id);
                        } else {
                            self.class_enrollments.clear();
                        }
                    }
                    Err(message) => self.status_message = Some(message),
                }
            }
            BackgroundResult::ClassEnrollments { class_id, result } => {
                self.busy = false;
                if self.selected_class().map(|c| c.id.as_str()) != Some(class_id.as_str()) {
                    debug!(class_id = %class_id, "Discarding enrollments for a deselected class");
                    return;
                }
                match result {
                    Ok(views) => {
                        self.enrollment_selection = self
                            .enrollment_selection
                            .min(views.len().saturating_sub(1));
                        self.class_enrollments = views;
                    }
                    Err(message) => self.status_message = Some(message),
                }
            }
            BackgroundResult::Students(result) => {
                if let Some(form) = self.progress_form.as_mut() {
                    form.students_loading = false;
                    match result {
                        Ok(students) => {
                            form.students = students;
                            form.student_selection = 0;
                        }
                        Err(message) => form.error = Some(message),
                    }
                }
            }
            BackgroundResult::ProgressSaved { class_id, result } => match result {
                Ok(_) => {
                    self.close_progress_form();
                    if self.selected_class().map(|c| c.id.as_str()) == Some(class_id.as_str()) {
                        self.load_class_enrollments(class_id);
                    }
                }
                Err(message) => {
                    if let Some(form) = self.progress_form.as_mut() {
                        form.submitting = false;
                        form.error = Some(message);
                    }
                }
            },
        }
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

pub fn can_add_name_char(current_len: usize, c: char) -> bool {
    current_len < MAX_NAME_LENGTH && is_valid_input_char(c)
}

pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

pub fn can_add_progress_char(current: &str, c: char) -> bool {
    current.len() < MAX_PROGRESS_LENGTH
        && (c.is_ascii_digit() || (c == '.' && !current.contains('.')))
}

// ============================================================================
// Tests
// ============================================================================

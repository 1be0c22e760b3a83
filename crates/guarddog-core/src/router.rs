//! Routes and navigation history.
//!
//! Every view the client can show is a `Route`. Protected routes declare the
//! roles allowed to see them; the `AccessGuard` reads that list and hands
//! back a `Navigation` when the current session may not stay.

use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Dashboard chooser; any signed-in role.
    Home,
    Login,
    Register,
    Student,
    Teacher,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Student => "/student",
            Route::Teacher => "/teacher",
        }
    }

    /// Case-insensitive path lookup. Trailing slashes are ignored.
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        match normalized.to_ascii_lowercase().as_str() {
            "/" => Some(Route::Home),
            "/login" => Some(Route::Login),
            "/register" => Some(Route::Register),
            "/student" => Some(Route::Student),
            "/teacher" => Some(Route::Teacher),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Dashboard",
            Route::Login => "Sign In",
            Route::Register => "Register",
            Route::Student => "Student Portal",
            Route::Teacher => "Teacher Dashboard",
        }
    }

    /// Whether the route needs a signed-in session at all.
    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }

    /// Roles allowed on this route. `None` means any signed-in role
    /// (or, for public routes, no guard at all).
    pub fn allowed_roles(&self) -> Option<Vec<Role>> {
        match self {
            Route::Student => Some(vec![Role::Student]),
            Route::Teacher => Some(vec![Role::Teacher, Role::HeadTeacher]),
            Route::Home | Route::Login | Route::Register => None,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    Push,
    /// Overwrite the current history entry so back-navigation skips it.
    Replace,
}

/// A navigation request produced by a view or by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub to: Route,
    pub mode: NavigationMode,
}

impl Navigation {
    pub fn push(to: Route) -> Self {
        Self {
            to,
            mode: NavigationMode::Push,
        }
    }

    pub fn replace(to: Route) -> Self {
        Self {
            to,
            mode: NavigationMode::Replace,
        }
    }
}

/// Navigation history. Never empty.
#[derive(Debug, Clone)]
pub struct Router {
    history: Vec<Route>,
}

impl Router {
    pub fn new(initial: Route) -> Self {
        Self {
            history: vec![initial],
        }
    }

    pub fn current(&self) -> Route {
        // history always holds at least the initial route
        self.history.last().copied().unwrap_or(Route::Home)
    }

    pub fn push(&mut self, route: Route) {
        if self.current() != route {
            self.history.push(route);
        }
    }

    pub fn replace(&mut self, route: Route) {
        if let Some(last) = self.history.last_mut() {
            *last = route;
        }
        // Collapse a replace that lands on the entry below it
        let len = self.history.len();
        if len >= 2 && self.history[len - 2] == route {
            self.history.pop();
        }
    }

    pub fn apply(&mut self, navigation: Navigation) {
        match navigation.mode {
            NavigationMode::Push => self.push(navigation.to),
            NavigationMode::Replace => self.replace(navigation.to),
        }
    }

    /// Go back one entry. Returns false when already at the first entry.
    pub fn back(&mut self) -> bool {
        if self.history.len() > 1 {
            self.history.pop();
            true
        } else {
            false
        }
    }

    pub fn depth(&self) -> usize {
        self.history.len()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

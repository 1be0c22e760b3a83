//! Role-based access guard for protected views.
//!
//! A view owns one `AccessGuard` and calls `evaluate` with every snapshot it
//! receives. The guard decides what the view renders and, when the session
//! may not stay on the view, hands back a navigation. A given condition
//! yields its navigation once; re-evaluating the same condition returns
//! `None` until the condition clears.

use crate::auth::SessionSnapshot;
use crate::models::Role;
use crate::router::{Navigation, Route};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Anonymous,
    /// Signed in, profile not yet known.
    Authenticating,
    Authorized,
    Unauthorized,
}

/// What a guarded view should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    Loading,
    Nothing,
    SettingUpProfile,
    Children,
    Redirecting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardView {
    pub state: GuardState,
    pub rendering: Rendering,
    pub navigation: Option<Navigation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Detected {
    Anonymous,
    Unauthorized { user_id: String, role: Role },
}

#[derive(Debug, Clone)]
pub struct AccessGuard {
    allowed_roles: Option<Vec<Role>>,
    latched: Option<Detected>,
}

impl AccessGuard {
    /// `None` admits any signed-in role.
    pub fn new(allowed_roles: Option<Vec<Role>>) -> Self {
        Self {
            allowed_roles,
            latched: None,
        }
    }

    pub fn for_route(route: Route) -> Self {
        Self::new(route.allowed_roles())
    }

    pub fn allowed_roles(&self) -> Option<&[Role]> {
        self.allowed_roles.as_deref()
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles
            .as_ref()
            .map_or(true, |roles| roles.contains(&role))
    }

    /// Classify a snapshot without touching the latch.
    pub fn state(&self, snapshot: &SessionSnapshot) -> GuardState {
        if snapshot.loading {
            return GuardState::Loading;
        }
        if snapshot.identity.is_none() {
            return GuardState::Anonymous;
        }
        match snapshot.role() {
            None => GuardState::Authenticating,
            Some(role) if self.allows(role) => GuardState::Authorized,
            Some(_) => GuardState::Unauthorized,
        }
    }

    pub fn evaluate(&mut self, snapshot: &SessionSnapshot) -> GuardView {
        let state = self.state(snapshot);

        let detected = match state {
            GuardState::Anonymous => Some(Detected::Anonymous),
            GuardState::Unauthorized => match (snapshot.user_id(), snapshot.role()) {
                (Some(user_id), Some(role)) => Some(Detected::Unauthorized {
                    user_id: user_id.to_string(),
                    role,
                }),
                _ => None,
            },
            // Loading decides nothing yet, so it neither fires nor clears
            GuardState::Loading => self.latched.clone(),
            GuardState::Authenticating | GuardState::Authorized => None,
        };

        let navigation = match &detected {
            Some(condition) if self.latched.as_ref() != Some(condition) => {
                Some(Self::navigation_for(condition))
            }
            _ => None,
        };
        self.latched = detected;

        let rendering = match state {
            GuardState::Loading => Rendering::Loading,
            GuardState::Anonymous => Rendering::Nothing,
            GuardState::Authenticating => Rendering::SettingUpProfile,
            GuardState::Authorized => Rendering::Children,
            GuardState::Unauthorized => Rendering::Redirecting,
        };

        GuardView {
            state,
            rendering,
            navigation,
        }
    }

    fn navigation_for(condition: &Detected) -> Navigation {
        match condition {
            Detected::Anonymous => Navigation::replace(Route::Login),
            Detected::Unauthorized { role, .. } => Navigation::replace(role.landing_route()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::fake::{profile_for, session_for};
    use crate::router::NavigationMode;

    fn loading() -> SessionSnapshot {
        SessionSnapshot::default()
    }

    fn anonymous() -> SessionSnapshot {
        SessionSnapshot {
            identity: None,
            profile: None,
            loading: false,
        }
    }

    fn signed_in(user_id: &str, role: Option<Role>) -> SessionSnapshot {
        SessionSnapshot {
            identity: Some(session_for(user_id)),
            profile: role.map(|r| profile_for(user_id, r)),
            loading: false,
        }
    }

    #[test]
    fn test_loading_takes_precedence() {
        let mut guard = AccessGuard::new(Some(vec![Role::Teacher]));
        let mut snapshot = signed_in("a", Some(Role::Student));
        snapshot.loading = true;

        let view = guard.evaluate(&snapshot);
        assert_eq!(view.state, GuardState::Loading);
        assert_eq!(view.rendering, Rendering::Loading);
        assert!(view.navigation.is_none());

        let view = guard.evaluate(&loading());
        assert_eq!(view.rendering, Rendering::Loading);
        assert!(view.navigation.is_none());
    }

    #[test]
    fn test_anonymous_replaces_to_login() {
        let mut guard = AccessGuard::new(None);
        let view = guard.evaluate(&anonymous());
        assert_eq!(view.rendering, Rendering::Nothing);
        let nav = view.navigation.unwrap();
        assert_eq!(nav.to, Route::Login);
        assert_eq!(nav.mode, NavigationMode::Replace);
    }

    #[test]
    fn test_identity_without_profile_sets_up() {
        let mut guard = AccessGuard::new(Some(vec![Role::Student]));
        let view = guard.evaluate(&signed_in("a", None));
        assert_eq!(view.state, GuardState::Authenticating);
        assert_eq!(view.rendering, Rendering::SettingUpProfile);
        assert!(view.navigation.is_none());
    }

    #[test]
    fn test_no_allow_list_passes_every_role() {
        for role in Role::ALL {
            let mut guard = AccessGuard::new(None);
            let view = guard.evaluate(&signed_in("a", Some(role)));
            assert_eq!(view.rendering, Rendering::Children);
            assert!(view.navigation.is_none());
        }
    }

    #[test]
    fn test_allowed_role_renders_children() {
        let mut guard = AccessGuard::for_route(Route::Teacher);
        let view = guard.evaluate(&signed_in("a", Some(Role::HeadTeacher)));
        assert_eq!(view.state, GuardState::Authorized);
        assert_eq!(view.rendering, Rendering::Children);
    }

    #[test]
    fn test_unauthorized_redirects_to_role_landing() {
        let mut guard = AccessGuard::for_route(Route::Teacher);
        let view = guard.evaluate(&signed_in("a", Some(Role::Student)));
        assert_eq!(view.rendering, Rendering::Redirecting);
        assert_eq!(view.navigation, Some(Navigation::replace(Route::Student)));

        let mut guard = AccessGuard::for_route(Route::Student);
        let view = guard.evaluate(&signed_in("b", Some(Role::HeadTeacher)));
        assert_eq!(view.navigation, Some(Navigation::replace(Route::Teacher)));
    }

    #[test]
    fn test_redirect_fires_once_per_detection() {
        let mut guard = AccessGuard::for_route(Route::Teacher);
        let snapshot = signed_in("a", Some(Role::Student));

        assert!(guard.evaluate(&snapshot).navigation.is_some());
        for _ in 0..3 {
            let view = guard.evaluate(&snapshot);
            assert_eq!(view.rendering, Rendering::Redirecting);
            assert!(view.navigation.is_none());
        }
    }

    #[test]
    fn test_anonymous_fires_once_until_cleared() {
        let mut guard = AccessGuard::new(None);
        assert!(guard.evaluate(&anonymous()).navigation.is_some());
        assert!(guard.evaluate(&anonymous()).navigation.is_none());

        // A loading blip in between does not re-arm the latch
        assert!(guard.evaluate(&loading()).navigation.is_none());
        assert!(guard.evaluate(&anonymous()).navigation.is_none());

        guard.evaluate(&signed_in("a", Some(Role::Student)));
        assert!(guard.evaluate(&anonymous()).navigation.is_some());
    }

    #[test]
    fn test_different_user_is_a_new_detection() {
        let mut guard = AccessGuard::for_route(Route::Teacher);
        assert!(guard.evaluate(&signed_in("a", Some(Role::Student))).navigation.is_some());
        assert!(guard.evaluate(&signed_in("b", Some(Role::Student))).navigation.is_some());
    }

    #[test]
    fn test_state_does_not_touch_latch() {
        let mut guard = AccessGuard::new(None);
        assert_eq!(guard.state(&anonymous()), GuardState::Anonymous);
        assert!(guard.evaluate(&anonymous()).navigation.is_some());
    }
}

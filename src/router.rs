//! Top-level view selection and role gating.

use std::fmt;

use tracing::{debug, info};

use crate::models::{Role, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Jobs,
    Login,
    Register,
    Profile,
    Admin,
    CompanyDashboard,
    AddJob,
    SavedJobs,
    Applications,
}

impl View {
    pub const ALL: [View; 10] = [
        View::Home,
        View::Jobs,
        View::Login,
        View::Register,
        View::Profile,
        View::Admin,
        View::CompanyDashboard,
        View::AddJob,
        View::SavedJobs,
        View::Applications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Home => "home",
            View::Jobs => "jobs",
            View::Login => "login",
            View::Register => "register",
            View::Profile => "profile",
            View::Admin => "admin",
            View::CompanyDashboard => "company-dashboard",
            View::AddJob => "add-job",
            View::SavedJobs => "saved-jobs",
            View::Applications => "applications",
        }
    }

    pub fn parse(s: &str) -> Option<View> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|v| v.as_str() == wanted)
    }

    /// The single gating table.
    pub fn access(&self) -> Access {
        match self {
            View::Home | View::Jobs | View::Login | View::Register => Access::Public,
            View::Profile => Access::SignedIn,
            View::Admin => Access::Roles(&[Role::Admin]),
            View::CompanyDashboard => Access::Roles(&[Role::Company]),
            View::AddJob => Access::Roles(&[Role::Company, Role::Admin]),
            View::SavedJobs | View::Applications => Access::Roles(&[Role::Candidate]),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    SignedIn,
    Roles(&'static [Role]),
}

impl Access {
    pub fn allows(&self, session: Option<&Session>) -> bool {
        match (self, session) {
            (Access::Public, _) => true,
            (_, None) => false,
            (Access::SignedIn, Some(_)) => true,
            (Access::Roles(roles), Some(s)) => roles.contains(&s.role),
        }
    }
}

/// What to put on screen for the stored view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Show(View),
    AccessDenied { requested: View },
}

#[derive(Debug, Clone)]
pub struct Router {
    current: View,
}

impl Default for Router {
    fn default() -> Self {
        Self { current: View::Home }
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> View {
        self.current
    }

    /// Store the request as-is; gating happens at render time so the
    /// request survives a later login.
    pub fn navigate(&mut self, view: View) {
        debug!(from = %self.current, to = %view, "navigate");
        self.current = view;
    }

    pub fn render(&self, session: Option<&Session>) -> Screen {
        if self.current.access().allows(session) {
            Screen::Show(self.current)
        } else {
            info!(
                view = %self.current,
                role = session.map(|s| s.role.as_str()).unwrap_or("anonymous"),
                "access denied"
            );
            Screen::AccessDenied {
                requested: self.current,
            }
        }
    }

    pub fn on_login(&mut self) {
        self.navigate(View::Home);
    }

    pub fn on_register(&mut self) {
        self.navigate(View::Login);
    }

    pub fn on_logout(&mut self) {
        self.navigate(View::Home);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> Session {
        Session {
            user_id: 1,
            display_name: "Test".into(),
            role,
            avatar_path: None,
        }
    }

    #[test]
    fn test_starts_at_home() {
        assert_eq!(Router::new().render(None), Screen::Show(View::Home));
    }

    #[test]
    fn test_parse_round_trips_every_view() {
        for view in View::ALL {
            assert_eq!(View::parse(view.as_str()), Some(view));
        }
        assert_eq!(View::parse("Company_Dashboard"), Some(View::CompanyDashboard));
        assert_eq!(View::parse("settings"), None);
    }

    #[test]
    fn test_denied_view_is_kept_until_role_matches() {
        let mut router = Router::new();
        router.navigate(View::Admin);

        let company = session(Role::Company);
        assert_eq!(router.render(Some(&company)), Screen::AccessDenied { requested: View::Admin });
        assert_eq!(router.current(), View::Admin);

        let admin = session(Role::Admin);
        assert_eq!(router.render(Some(&admin)), Screen::Show(View::Admin));
    }

    #[test]
    fn test_gating_table() {
        let cases = [
            (View::Jobs, None, true),
            (View::Profile, None, false),
            (View::Profile, Some(Role::Candidate), true),
            (View::AddJob, Some(Role::Company), true),
            (View::AddJob, Some(Role::Admin), true),
            (View::AddJob, Some(Role::Candidate), false),
            (View::SavedJobs, Some(Role::Candidate), true),
            (View::SavedJobs, Some(Role::Company), false),
            (View::CompanyDashboard, Some(Role::Admin), false),
        ];
        for (view, role, allowed) in cases {
            let s = role.map(session);
            assert_eq!(view.access().allows(s.as_ref()), allowed, "{view} as {role:?}");
        }
    }

    #[test]
    fn test_form_side_effects_navigate() {
        let mut router = Router::new();
        router.navigate(View::Register);
        router.on_register();
        assert_eq!(router.current(), View::Login);
        router.on_login();
        assert_eq!(router.current(), View::Home);
    }
}

//! Protected-route and login redirects.

use mezze_core::RoutesConfig;

use crate::identity::User;

/// Outcome of the route check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectDecision {
    Continue,
    /// Anonymous request for a protected path.
    ToLogin,
    /// Signed-in request for the login page.
    ToDashboard,
}

impl RedirectDecision {
    /// Redirect target, if any.
    pub fn target<'a>(&self, routes: &'a RoutesConfig) -> Option<&'a str> {
        match self {
            Self::Continue => None,
            Self::ToLogin => Some(&routes.login_path),
            Self::ToDashboard => Some(&routes.dashboard_path),
        }
    }
}

/// Decide whether `path` must be redirected.
///
/// The two rules branch on user presence, so they can never both apply.
pub fn check_redirect(routes: &RoutesConfig, path: &str, user: Option<&User>) -> RedirectDecision {
    match user {
        None if routes.is_protected(path) => RedirectDecision::ToLogin,
        Some(_) if routes.is_login(path) => RedirectDecision::ToDashboard,
        _ => RedirectDecision::Continue,
    }
}

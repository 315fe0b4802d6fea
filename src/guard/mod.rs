pub mod navigator;

use serde::Serialize;

use crate::session::{Session, SessionStatus};
use crate::types::Role;

pub use navigator::{MemoryNavigator, Navigator, TracingNavigator};

/// Unauthenticated entry point
pub const LOGIN_ROUTE: &str = "/login";
pub const LANDING_ROUTE: &str = "/services";

/// Who may see a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Access {
    /// Visible to everyone, even while the session is still loading
    Public,
    /// Only for signed-out visitors (login, register)
    PublicOnly,
    /// Any signed-in user
    Protected,
    /// Signed-in users with exactly this role
    RoleOnly(Role),
}

impl Access {
    pub fn requires_auth(&self) -> bool {
        matches!(self, Access::Protected | Access::RoleOnly(_))
    }

    pub fn required_role(&self) -> Option<Role> {
        match self {
            Access::RoleOnly(role) => Some(*role),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GuardDecision {
    Allow,
    /// Session is still resolving; show a neutral waiting state
    Wait,
    Redirect(&'static str),
}

/// Navigation outcome for one route. Pure over its inputs.
pub fn guard(status: SessionStatus, role: Option<Role>, access: Access) -> GuardDecision {
    if access == Access::Public {
        return GuardDecision::Allow;
    }
    if matches!(status, SessionStatus::Loading | SessionStatus::Uninitialized) {
        return GuardDecision::Wait;
    }

    let authenticated = status == SessionStatus::Authenticated;
    let home = role.unwrap_or_default().home();

    match access {
        Access::Public => GuardDecision::Allow,
        Access::PublicOnly if authenticated => GuardDecision::Redirect(home),
        Access::PublicOnly => GuardDecision::Allow,
        _ if !authenticated => GuardDecision::Redirect(LOGIN_ROUTE),
        Access::Protected => GuardDecision::Allow,
        // Mismatch goes to the caller's own home, never an error page
        Access::RoleOnly(required) if role != Some(required) => GuardDecision::Redirect(home),
        Access::RoleOnly(_) => GuardDecision::Allow,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMatch {
    Page { pattern: &'static str, access: Access },
    Redirect(&'static str),
    NotFound,
}

// Segment counts must match exactly, so order is irrelevant
const ROUTES: &[(&str, Access)] = &[
    ("/services", Access::Public),
    ("/login", Access::PublicOnly),
    ("/register", Access::PublicOnly),
    ("/dashboard", Access::RoleOnly(Role::User)),
    ("/rides", Access::RoleOnly(Role::User)),
    ("/rides/book", Access::RoleOnly(Role::User)),
    ("/rides/:id", Access::Protected),
    ("/profile", Access::Protected),
    ("/admin", Access::RoleOnly(Role::Admin)),
    ("/admin/rides", Access::RoleOnly(Role::Admin)),
    ("/admin/analytics", Access::RoleOnly(Role::Admin)),
    ("/admin/activity", Access::RoleOnly(Role::Admin)),
    ("/admin/users", Access::RoleOnly(Role::Admin)),
];

pub fn resolve(path: &str) -> RouteMatch {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    if path == "/" {
        return RouteMatch::Redirect(LANDING_ROUTE);
    }

    ROUTES
        .iter()
        .find(|(pattern, _)| pattern_matches(pattern, path))
        .map(|&(pattern, access)| RouteMatch::Page { pattern, access })
        .unwrap_or(RouteMatch::NotFound)
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut want = pattern.split('/');
    let mut have = path.split('/');
    loop {
        match (want.next(), have.next()) {
            (None, None) => return true,
            (Some(w), Some(h)) if w.starts_with(':') && !h.is_empty() => continue,
            (Some(w), Some(h)) if w == h => continue,
            _ => return false,
        }
    }
}

/// Decide navigation to `path` for the current session
pub fn check(session: &Session, path: &str) -> GuardDecision {
    match resolve(path) {
        RouteMatch::Page { access, .. } => guard(session.status, session.role(), access),
        RouteMatch::Redirect(to) => GuardDecision::Redirect(to),
        RouteMatch::NotFound => GuardDecision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus::*;

    fn decide(status: SessionStatus, role: Option<Role>, path: &str) -> GuardDecision {
        match resolve(path) {
            RouteMatch::Page { access, .. } => guard(status, role, access),
            other => panic!("unexpected route match {:?}", other),
        }
    }

    #[test]
    fn admin_on_user_dashboard_goes_to_admin_home() {
        assert_eq!(decide(Authenticated, Some(Role::Admin), "/dashboard"), GuardDecision::Redirect("/admin"));
    }

    #[test]
    fn anonymous_on_protected_goes_to_login() {
        assert_eq!(decide(Unauthenticated, None, "/rides"), GuardDecision::Redirect("/login"));
        assert_eq!(decide(Unauthenticated, Some(Role::Admin), "/admin/users"), GuardDecision::Redirect("/login"));
    }

    #[test]
    fn user_on_admin_page_goes_to_dashboard() {
        assert_eq!(decide(Authenticated, Some(Role::User), "/admin"), GuardDecision::Redirect("/dashboard"));
        assert_eq!(decide(Authenticated, Some(Role::User), "/admin/rides"), GuardDecision::Redirect("/dashboard"));
    }

    #[test]
    fn loading_waits_without_redirect() {
        assert_eq!(decide(Loading, None, "/rides"), GuardDecision::Wait);
        assert_eq!(decide(Loading, None, "/login"), GuardDecision::Wait);
        assert_eq!(decide(Uninitialized, None, "/admin"), GuardDecision::Wait);
        assert_eq!(decide(Loading, None, "/services"), GuardDecision::Allow);
    }

    #[test]
    fn public_only_redirects_signed_in_users_by_role() {
        assert_eq!(decide(Authenticated, Some(Role::User), "/login"), GuardDecision::Redirect("/dashboard"));
        assert_eq!(decide(Authenticated, Some(Role::Admin), "/register"), GuardDecision::Redirect("/admin"));
        assert_eq!(decide(Unauthenticated, None, "/login"), GuardDecision::Allow);
    }

    #[test]
    fn shared_pages_allow_both_roles() {
        assert_eq!(decide(Authenticated, Some(Role::Admin), "/rides/abc123"), GuardDecision::Allow);
        assert_eq!(decide(Authenticated, Some(Role::User), "/profile"), GuardDecision::Allow);
        assert_eq!(decide(Authenticated, Some(Role::User), "/rides/book"), GuardDecision::Allow);
    }

    #[test]
    fn resolve_handles_root_query_and_unknown_paths() {
        assert_eq!(resolve("/"), RouteMatch::Redirect("/services"));
        assert_eq!(resolve(""), RouteMatch::Redirect("/services"));
        assert!(matches!(resolve("/rides/?status=pending"), RouteMatch::Page { pattern: "/rides", .. }));
        assert!(matches!(resolve("/rides/book"), RouteMatch::Page { pattern: "/rides/book", .. }));
        assert!(matches!(resolve("/rides/r-42"), RouteMatch::Page { pattern: "/rides/:id", .. }));
        assert_eq!(resolve("/nowhere"), RouteMatch::NotFound);
        assert_eq!(resolve("/rides/a/b"), RouteMatch::NotFound);
    }

    #[test]
    fn check_reads_session() {
        let session = Session::default();
        assert_eq!(check(&session, "/rides"), GuardDecision::Wait);
        assert_eq!(check(&session, "/missing"), GuardDecision::Allow);
    }
}

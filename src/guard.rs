use crate::models::Role;
use crate::session::AuthState;

/// Outcome of checking a protected route against the current auth state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Auth state still resolving; show nothing yet.
    Pending,

    /// No signed-in user.
    RedirectToLogin,

    /// Signed in but wrong role; send them to their own area.
    RedirectTo(&'static str),

    Allow,
}

/// Decides access to a route restricted to `allowed` roles. An empty
/// `allowed` slice means any signed-in user passes.
///
/// A signed-in user without a profile row is allowed through: the role is
/// unknown, and blocking would strand accounts whose profile has not
/// materialized yet.
#[must_use]
pub fn decide(state: &AuthState, allowed: &[Role]) -> RouteDecision {
    if state.loading {
        return RouteDecision::Pending;
    }

    if state.user.is_none() {
        return RouteDecision::RedirectToLogin;
    }

    if allowed.is_empty() {
        return RouteDecision::Allow;
    }

    match state.role() {
        Some(role) if allowed.contains(&role) => RouteDecision::Allow,
        Some(role) => RouteDecision::RedirectTo(role.home_path()),
        None => RouteDecision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::AuthUser;
    use crate::models::Profile;
    use uuid::Uuid;

    fn signed_in(role: Option<Role>) -> AuthState {
        AuthState {
            user: Some(AuthUser {
                id: Uuid::nil(),
                email: Some("a@b.c".to_string()),
            }),
            profile: role.map(|role| Profile {
                id: Uuid::nil(),
                full_name: Some("Ada".to_string()),
                role,
                avatar_url: None,
            }),
            loading: false,
        }
    }

    #[test]
    fn test_loading_is_pending() {
        let state = AuthState::resolving();
        assert_eq!(decide(&state, &[Role::Candidate]), RouteDecision::Pending);
    }

    #[test]
    fn test_signed_out_redirects_to_login() {
        let state = AuthState::signed_out();
        assert_eq!(decide(&state, &[]), RouteDecision::RedirectToLogin);
        assert_eq!(
            decide(&state, &[Role::Recruiter]),
            RouteDecision::RedirectToLogin
        );
    }

    #[test]
    fn test_matching_role_allowed() {
        assert_eq!(
            decide(&signed_in(Some(Role::Candidate)), &[Role::Candidate]),
            RouteDecision::Allow
        );
    }

    #[test]
    fn test_wrong_role_redirects_home() {
        assert_eq!(
            decide(&signed_in(Some(Role::Recruiter)), &[Role::Candidate]),
            RouteDecision::RedirectTo("/recruiter/dashboard")
        );
        assert_eq!(
            decide(&signed_in(Some(Role::Candidate)), &[Role::Recruiter]),
            RouteDecision::RedirectTo("/candidate/dashboard")
        );
    }

    #[test]
    fn test_unrestricted_route_admits_any_user() {
        assert_eq!(decide(&signed_in(None), &[]), RouteDecision::Allow);
        assert_eq!(
            decide(&signed_in(Some(Role::Recruiter)), &[]),
            RouteDecision::Allow
        );
    }

    #[test]
    fn test_missing_profile_is_allowed_through() {
        assert_eq!(
            decide(&signed_in(None), &[Role::Candidate]),
            RouteDecision::Allow
        );
    }
}

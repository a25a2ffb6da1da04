//! Sibling guards driven by the login and voter-check flags.

use super::route::{AppRoute, RouteDecision};

pub const ADMIN_ROLE: &str = "Admin";

/// Voting pages require a voter id from the registry check.
pub fn evaluate_voter_guard(voter_id: Option<&str>) -> RouteDecision {
    match voter_id.map(str::trim) {
        Some(id) if !id.is_empty() => RouteDecision::Allow,
        _ => RouteDecision::redirect(AppRoute::Check),
    }
}

/// Admin console requires the exact `Admin` role.
pub fn evaluate_admin_guard(role: Option<&str>) -> RouteDecision {
    if role == Some(ADMIN_ROLE) {
        RouteDecision::Allow
    } else {
        RouteDecision::redirect(AppRoute::Login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voter_guard() {
        assert!(evaluate_voter_guard(Some("42")).is_allowed());
        assert_eq!(
            evaluate_voter_guard(None).target().unwrap().to_url(),
            "/check"
        );
        assert!(!evaluate_voter_guard(Some("")).is_allowed());
    }

    #[test]
    fn test_admin_guard_is_case_sensitive() {
        assert!(evaluate_admin_guard(Some("Admin")).is_allowed());
        assert_eq!(
            evaluate_admin_guard(Some("admin")).target().unwrap().to_url(),
            "/auth/login"
        );
        assert!(!evaluate_admin_guard(None).is_allowed());
    }
}

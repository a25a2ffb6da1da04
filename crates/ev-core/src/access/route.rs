use serde::{Deserialize, Serialize};

use crate::verification::NavigationTarget;

/// Application routes the verification core navigates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppRoute {
    Check,
    Verify,
    Success,
    Failed,
    Elections,
    Login,
}

impl AppRoute {
    pub fn path(self) -> &'static str {
        match self {
            Self::Check => "/check",
            Self::Verify => "/verify",
            Self::Success => "/success",
            Self::Failed => "/failed",
            Self::Elections => "/elections",
            Self::Login => "/auth/login",
        }
    }
}

impl From<NavigationTarget> for AppRoute {
    fn from(target: NavigationTarget) -> Self {
        match target {
            NavigationTarget::Success => Self::Success,
            NavigationTarget::Failed => Self::Failed,
            NavigationTarget::Check => Self::Check,
        }
    }
}

/// A route plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    pub route: AppRoute,
    pub query: Vec<(String, String)>,
}

impl RouteTarget {
    pub fn new(route: AppRoute) -> Self {
        Self {
            route,
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn to_url(&self) -> String {
        if self.query.is_empty() {
            return self.route.path().to_string();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.route.path(), query)
    }
}

impl From<AppRoute> for RouteTarget {
    fn from(route: AppRoute) -> Self {
        Self::new(route)
    }
}

impl std::fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_url())
    }
}

fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Result of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteDecision {
    Allow,
    Redirect {
        target: RouteTarget,
        /// All verification-related storage keys must be removed before
        /// redirecting.
        clear_verification_storage: bool,
    },
}

impl RouteDecision {
    pub fn redirect(target: impl Into<RouteTarget>) -> Self {
        Self::Redirect {
            target: target.into(),
            clear_verification_storage: false,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn target(&self) -> Option<&RouteTarget> {
        match self {
            Self::Allow => None,
            Self::Redirect { target, .. } => Some(target),
        }
    }

    pub fn clears_storage(&self) -> bool {
        matches!(
            self,
            Self::Redirect {
                clear_verification_storage: true,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_without_query() {
        assert_eq!(RouteTarget::new(AppRoute::Check).to_url(), "/check");
    }

    #[test]
    fn test_url_with_query_is_encoded() {
        let target = RouteTarget::new(AppRoute::Verify)
            .with_query("nationalId", "12345678901234")
            .with_query("note", "a b&c");
        assert_eq!(
            target.to_url(),
            "/verify?nationalId=12345678901234&note=a%20b%26c"
        );
        assert_eq!(target.query_value("nationalId"), Some("12345678901234"));
    }

    #[test]
    fn test_navigation_target_maps_to_route() {
        assert_eq!(AppRoute::from(NavigationTarget::Success).path(), "/success");
        assert_eq!(AppRoute::from(NavigationTarget::Failed).path(), "/failed");
    }
}

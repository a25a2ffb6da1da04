use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::evidence::VerificationEvidence;
use super::route::{AppRoute, RouteDecision, RouteTarget};
use crate::verification::VERIFICATION_WINDOW_HOURS;

/// How to treat verified data that carries no usable timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingTimestampPolicy {
    /// Treat the session as valid.
    Allow,
    /// Treat the session as expired.
    #[default]
    Deny,
}

impl MissingTimestampPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "allow" => Some(Self::Allow),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionValidityPolicy {
    pub window: Duration,
    pub missing_timestamp: MissingTimestampPolicy,
}

impl Default for SessionValidityPolicy {
    fn default() -> Self {
        Self {
            window: Duration::hours(VERIFICATION_WINDOW_HOURS),
            missing_timestamp: MissingTimestampPolicy::Deny,
        }
    }
}

impl SessionValidityPolicy {
    pub fn new(window_hours: i64, missing_timestamp: MissingTimestampPolicy) -> Self {
        Self {
            window: Duration::hours(window_hours),
            missing_timestamp,
        }
    }

    fn is_expired(&self, timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match timestamp {
            Some(ts) => now - ts > self.window,
            None => self.missing_timestamp == MissingTimestampPolicy::Deny,
        }
    }
}

/// Gate for voting and election routes.
///
/// Rules are applied in order and the first that fires decides:
/// 1. no national ID → `/check`
/// 2. no verification data → `/verify?nationalId=…`
/// 3. not verified → `/verify?reason=not_verified`
/// 4. older than the window → clear storage, `/check?sessionExpired=true`
/// 5. allow
///
/// Malformed stored data must be passed as `None`.
pub fn evaluate_verification_guard(
    national_id: Option<&str>,
    verification_data: Option<&Value>,
    now: DateTime<Utc>,
    policy: &SessionValidityPolicy,
) -> RouteDecision {
    let national_id = match national_id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => id,
        None => return RouteDecision::redirect(AppRoute::Check),
    };

    let data = match verification_data.filter(|v| !v.is_null()) {
        Some(data) => data,
        None => {
            return RouteDecision::redirect(
                RouteTarget::new(AppRoute::Verify).with_query("nationalId", national_id),
            )
        }
    };

    let evidence = VerificationEvidence::from_value(data);
    if !evidence.verified {
        return RouteDecision::redirect(
            RouteTarget::new(AppRoute::Verify).with_query("reason", "not_verified"),
        );
    }

    if policy.is_expired(evidence.timestamp, now) {
        return RouteDecision::Redirect {
            target: RouteTarget::new(AppRoute::Check).with_query("sessionExpired", "true"),
            clear_verification_storage: true,
        };
    }

    RouteDecision::Allow
}

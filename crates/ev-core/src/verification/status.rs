use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::result::VerificationResult;
use crate::ids::{VerificationSessionId, VoterId};

/// Hours a positive verification stays valid.
pub const VERIFICATION_WINDOW_HOURS: i64 = 8;

/// Durable checkpoint of the last completed verification, keyed by national
/// ID. Lives independently of the in-progress session so a returning voter
/// can skip re-verification inside the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatus {
    pub national_id: String,
    #[serde(default)]
    pub voter_id: VoterId,
    pub verified: bool,
    #[serde(default)]
    pub match_percentage: f64,
    #[serde(default)]
    pub verification_result: Option<VerificationResult>,
    pub verification_time: DateTime<Utc>,
    pub session_id: VerificationSessionId,
}

impl VerificationStatus {
    pub fn default_window() -> Duration {
        Duration::hours(VERIFICATION_WINDOW_HOURS)
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.verification_time
    }

    pub fn belongs_to(&self, national_id: &str) -> bool {
        !national_id.is_empty() && self.national_id == national_id
    }

    /// Verified and no older than `window`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.verified && self.age_at(now) <= window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(verified: bool, age_hours: i64, now: DateTime<Utc>) -> VerificationStatus {
        VerificationStatus {
            national_id: "12345678901234".into(),
            voter_id: VoterId(7),
            verified,
            match_percentage: 92.3,
            verification_result: None,
            verification_time: now - Duration::hours(age_hours),
            session_id: "session_1_abc".into(),
        }
    }

    #[test]
    fn test_valid_inside_window() {
        let now = Utc::now();
        assert!(status(true, 1, now).is_valid_at(now, VerificationStatus::default_window()));
        assert!(status(true, 8, now).is_valid_at(now, VerificationStatus::default_window()));
    }

    #[test]
    fn test_expired_outside_window() {
        let now = Utc::now();
        assert!(!status(true, 9, now).is_valid_at(now, VerificationStatus::default_window()));
    }

    #[test]
    fn test_unverified_never_valid() {
        let now = Utc::now();
        assert!(!status(false, 0, now).is_valid_at(now, VerificationStatus::default_window()));
    }

    #[test]
    fn test_belongs_to_requires_same_id() {
        let now = Utc::now();
        let s = status(true, 0, now);
        assert!(s.belongs_to("12345678901234"));
        assert!(!s.belongs_to("99999999999999"));
        assert!(!s.belongs_to(""));
    }

    #[test]
    fn test_uses_camel_case_keys() {
        let now = Utc::now();
        let json = serde_json::to_value(status(true, 0, now)).unwrap();
        assert!(json.get("nationalId").is_some());
        assert!(json.get("matchPercentage").is_some());
        assert!(json.get("verificationTime").is_some());
    }
}

use serde::{Deserialize, Serialize};

use super::id_macro::impl_id;

/// Verification session identifier
/// Format: "session_{unix_millis}_{random}"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationSessionId(String);

impl VerificationSessionId {
    /// Generate a fresh id stamped with the given wall-clock milliseconds.
    pub fn generate(now_ms: i64) -> Self {
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("session_{}_{}", now_ms, &random[..9]))
    }
}

impl_id!(VerificationSessionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_carries_prefix_and_timestamp() {
        let id = VerificationSessionId::generate(1_700_000_000_000);
        assert!(id.as_str().starts_with("session_1700000000000_"));
        assert_eq!(id.as_str().len(), "session_1700000000000_".len() + 9);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = VerificationSessionId::generate(1);
        let b = VerificationSessionId::generate(1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_id_from_str() {
        let id: VerificationSessionId = "session_1_abc".into();
        assert_eq!(id.as_str(), "session_1_abc");
    }
}

use serde::{Deserialize, Serialize};

/// Voter registration number returned by the registry.
///
/// `0` means "not assigned yet", matching what the registry sends for
/// unknown voters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterId(pub i64);

impl VoterId {
    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for VoterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for VoterId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

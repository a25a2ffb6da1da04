use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::errors::FaceMatchError;
use crate::verification::{ImageFile, VerificationResult};

pub const HEALTH_OFFLINE: &str = "offline";

/// Liveness report of the face-match service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ServiceHealth {
    pub fn offline(timestamp: DateTime<Utc>) -> Self {
        Self {
            status: HEALTH_OFFLINE.to_string(),
            timestamp,
            version: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status != HEALTH_OFFLINE
    }
}

#[async_trait]
pub trait FaceMatchPort: Send + Sync {
    /// Compare the ID-card photo with the selfie.
    ///
    /// Unrecognized response bodies are not errors; they come back as an
    /// unverified result with a diagnostic message.
    async fn verify(
        &self,
        id_card: &ImageFile,
        face: &ImageFile,
    ) -> Result<VerificationResult, FaceMatchError>;

    /// Best-effort probe. Never fails; reports `offline` instead.
    async fn check_health(&self) -> ServiceHealth;
}

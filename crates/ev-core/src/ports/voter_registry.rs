use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ids::{NationalId, VoterId};
use crate::ports::errors::VoterRegistryError;

/// Answer of `POST /Voter/check-voter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterCheckResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub voter_id: Option<VoterId>,
}

#[async_trait]
pub trait VoterRegistryPort: Send + Sync {
    async fn check_voter(
        &self,
        national_id: &NationalId,
    ) -> Result<VoterCheckResponse, VoterRegistryError>;
}

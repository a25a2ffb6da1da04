use std::sync::Arc;

use ev_core::ids::{NationalId, NationalIdError, VoterId};
use ev_core::ports::{KeyValueStorePort, VoterRegistryError, VoterRegistryPort};
use ev_core::storage_keys;
use ev_core::VerificationError;
use tracing::{info, info_span, warn, Instrument};

use super::session_store::VerificationSessionStore;

/// Fallback when the registry refuses without saying why.
pub const DEFAULT_REJECTION_MESSAGE: &str = "Voter not found or not eligible to vote";

/// Where the voter goes after the national-ID check.
#[derive(Debug, Clone, PartialEq)]
pub enum VoterCheckOutcome {
    /// A valid positive checkpoint exists; skip straight to the success page.
    AlreadyVerified {
        national_id: String,
        voter_id: VoterId,
        match_percentage: f64,
    },
    /// Registered and not yet verified.
    ProceedToVerification {
        national_id: String,
        voter_id: VoterId,
        message: Option<String>,
    },
    /// The registry answered `success = false`.
    Rejected { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CheckVoterError {
    #[error(transparent)]
    InvalidNationalId(#[from] NationalIdError),
    #[error(transparent)]
    Registry(#[from] VoterRegistryError),
    #[error(transparent)]
    Storage(#[from] VerificationError),
}

impl CheckVoterError {
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidNationalId(err) => err.user_message().to_string(),
            Self::Registry(err) => err.user_message(),
            Self::Storage(err) => err.user_message(),
        }
    }
}

/// National-ID check in front of the verification wizard.
///
/// 身份证号检查：已验证的选民直接跳过人脸比对。
pub struct CheckVoter {
    registry: Arc<dyn VoterRegistryPort>,
    session_storage: Arc<dyn KeyValueStorePort>,
    store: Arc<VerificationSessionStore>,
}

impl CheckVoter {
    pub fn new(
        registry: Arc<dyn VoterRegistryPort>,
        session_storage: Arc<dyn KeyValueStorePort>,
        store: Arc<VerificationSessionStore>,
    ) -> Self {
        Self {
            registry,
            session_storage,
            store,
        }
    }

    /// National ID remembered from an earlier check on this kiosk session.
    pub async fn stored_national_id(&self) -> Option<String> {
        match self.session_storage.get(storage_keys::NATIONAL_ID).await {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(err) => {
                warn!(error = %err, "failed to read stored national id");
                None
            }
        }
    }

    pub async fn execute(&self, input: &str) -> Result<VoterCheckOutcome, CheckVoterError> {
        let national_id = NationalId::parse(input)?;
        let span = info_span!("usecase.check_voter.execute", national_id = %national_id);
        self.check(national_id).instrument(span).await
    }

    async fn check(&self, national_id: NationalId) -> Result<VoterCheckOutcome, CheckVoterError> {
        if self.stored_national_id().await.as_deref() == Some(national_id.as_str()) {
            if let Some(outcome) = self.cached_outcome(&national_id).await {
                info!("voter already verified; skipping registry call");
                return Ok(outcome);
            }
        }

        let response = self.registry.check_voter(&national_id).await?;
        if !response.success {
            let message = response
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string());
            info!(message = %message, "voter rejected by registry");
            return Ok(VoterCheckOutcome::Rejected { message });
        }

        let voter_id = response.voter_id.unwrap_or_default();
        self.remember(&national_id, voter_id).await?;
        self.store.start_session(national_id.as_str(), voter_id).await?;

        if let Some(outcome) = self.cached_outcome(&national_id).await {
            return Ok(outcome);
        }
        info!(voter_id = %voter_id, "voter registered; proceeding to verification");
        Ok(VoterCheckOutcome::ProceedToVerification {
            national_id: national_id.into_inner(),
            voter_id,
            message: response.message,
        })
    }

    /// Forget the remembered national ID.
    pub async fn clear_stored_national_id(&self) -> Result<(), CheckVoterError> {
        self.session_storage
            .remove(storage_keys::NATIONAL_ID)
            .await
            .map_err(|e| VerificationError::storage(storage_keys::NATIONAL_ID, e))?;
        info!("stored national id cleared");
        Ok(())
    }

    async fn cached_outcome(&self, national_id: &NationalId) -> Option<VoterCheckOutcome> {
        if !self.store.is_user_verified(Some(national_id.as_str())).await {
            return None;
        }
        let status = self.store.verification_status().await?;
        Some(VoterCheckOutcome::AlreadyVerified {
            national_id: status.national_id,
            voter_id: status.voter_id,
            match_percentage: status.match_percentage,
        })
    }

    async fn remember(
        &self,
        national_id: &NationalId,
        voter_id: VoterId,
    ) -> Result<(), VerificationError> {
        self.session_storage
            .set(storage_keys::NATIONAL_ID, national_id.as_str())
            .await
            .map_err(|e| VerificationError::storage(storage_keys::NATIONAL_ID, e))?;
        if voter_id.is_assigned() {
            self.session_storage
                .set(storage_keys::VOTER_ID, &voter_id.to_string())
                .await
                .map_err(|e| VerificationError::storage(storage_keys::VOTER_ID, e))?;
        }
        Ok(())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use ev_core::ports::{FaceMatchError, FaceMatchPort, ServiceHealth};
use ev_core::verification::{ImageFile, VerificationResult};
use tracing::{info_span, warn, Instrument};

/// Tries the primary matcher and, when enabled, substitutes the simulated
/// one on failure.
///
/// Only transport-level failures trigger the substitute. A request that
/// could not be built (missing image bytes) always propagates.
pub struct FallbackFaceMatcher {
    primary: Arc<dyn FaceMatchPort>,
    simulated: Arc<dyn FaceMatchPort>,
    simulation_enabled: bool,
}

impl FallbackFaceMatcher {
    pub fn new(
        primary: Arc<dyn FaceMatchPort>,
        simulated: Arc<dyn FaceMatchPort>,
        simulation_enabled: bool,
    ) -> Self {
        Self {
            primary,
            simulated,
            simulation_enabled,
        }
    }

    pub fn simulation_enabled(&self) -> bool {
        self.simulation_enabled
    }
}

#[async_trait]
impl FaceMatchPort for FallbackFaceMatcher {
    async fn verify(
        &self,
        id_card: &ImageFile,
        face: &ImageFile,
    ) -> Result<VerificationResult, FaceMatchError> {
        let span = info_span!("infra.face_match.verify", simulation_enabled = self.simulation_enabled);
        async move {
            match self.primary.verify(id_card, face).await {
                Ok(result) => Ok(result),
                Err(FaceMatchError::InvalidRequest(msg)) => Err(FaceMatchError::InvalidRequest(msg)),
                Err(err) if self.simulation_enabled => {
                    warn!(
                        degraded = true,
                        source = "simulated",
                        error = %err,
                        "Face-match service failed, substituting simulated result"
                    );
                    self.simulated.verify(id_card, face).await
                }
                Err(err) => {
                    warn!(error = %err, "Face-match service failed and simulation is disabled");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn check_health(&self) -> ServiceHealth {
        self.primary.check_health().await
    }
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ev_core::ports::{ClockPort, FaceMatchError, FaceMatchPort, ServiceHealth};
use ev_core::verification::response::{DEFAULT_MATCH_MESSAGE, DEFAULT_MISMATCH_MESSAGE};
use ev_core::verification::{ImageFile, VerificationResult, VerificationSource};
use rand::Rng;
use tracing::warn;

/// Probability that a simulated comparison reports a match.
pub const SIMULATED_MATCH_PROBABILITY: f64 = 0.7;

/// Local stand-in for the face-match service.
///
/// Outcomes are random: a match with probability 0.7 and confidence in
/// `[85, 100)`, otherwise a mismatch with confidence in `[40, 70)`. Every
/// result is tagged [`VerificationSource::Simulated`].
pub struct SimulatedFaceMatcher {
    delay: Duration,
    clock: Arc<dyn ClockPort>,
}

impl SimulatedFaceMatcher {
    pub fn new(delay: Duration, clock: Arc<dyn ClockPort>) -> Self {
        Self { delay, clock }
    }

    pub fn simulate(&self) -> VerificationResult {
        let mut rng = rand::rng();
        let is_match = rng.random_bool(SIMULATED_MATCH_PROBABILITY);
        let confidence = if is_match {
            rng.random_range(85.0..100.0)
        } else {
            rng.random_range(40.0..70.0)
        };
        let message = if is_match {
            DEFAULT_MATCH_MESSAGE
        } else {
            DEFAULT_MISMATCH_MESSAGE
        };
        VerificationResult::new(
            is_match,
            Some(confidence),
            Some(message.to_string()),
            self.clock.now(),
            VerificationSource::Simulated,
        )
    }
}

#[async_trait]
impl FaceMatchPort for SimulatedFaceMatcher {
    async fn verify(
        &self,
        id_card: &ImageFile,
        face: &ImageFile,
    ) -> Result<VerificationResult, FaceMatchError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = self.simulate();
        warn!(
            degraded = true,
            source = "simulated",
            id_card = %id_card.name(),
            face = %face.name(),
            verified = result.verified(),
            confidence = ?result.confidence(),
            "Simulated face verification result"
        );
        Ok(result)
    }

    async fn check_health(&self) -> ServiceHealth {
        ServiceHealth {
            status: "simulated".to_string(),
            timestamp: self.clock.now(),
            version: None,
        }
    }
}

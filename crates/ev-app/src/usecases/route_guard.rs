use std::sync::Arc;

use ev_core::access::{
    evaluate_admin_guard, evaluate_verification_guard, evaluate_voter_guard, RouteDecision,
    SessionValidityPolicy,
};
use ev_core::ports::{ClockPort, KeyValueStorePort};
use ev_core::storage_keys;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};

/// Storage-backed route guards.
///
/// Reads the stored flags, hands them to the pure decision functions in
/// `ev_core::access` and performs the clean-up a decision asks for.
pub struct RouteGuard {
    session_storage: Arc<dyn KeyValueStorePort>,
    durable_storage: Arc<dyn KeyValueStorePort>,
    clock: Arc<dyn ClockPort>,
    policy: SessionValidityPolicy,
}

impl RouteGuard {
    pub fn new(
        session_storage: Arc<dyn KeyValueStorePort>,
        durable_storage: Arc<dyn KeyValueStorePort>,
        clock: Arc<dyn ClockPort>,
        policy: SessionValidityPolicy,
    ) -> Self {
        Self {
            session_storage,
            durable_storage,
            clock,
            policy,
        }
    }

    /// Gate for voting and election routes.
    pub async fn check_verification(&self) -> RouteDecision {
        let span = info_span!("usecase.route_guard.check_verification");
        async {
            let national_id = self.read(storage_keys::NATIONAL_ID).await;
            let verification_data = self.read_verification_data().await;

            let decision = evaluate_verification_guard(
                national_id.as_deref(),
                verification_data.as_ref(),
                self.clock.now(),
                &self.policy,
            );

            if decision.clears_storage() {
                info!("verification session expired; clearing stored verification");
                self.clear_verification_storage().await;
            }
            match decision.target() {
                Some(target) => info!(redirect = %target, "route blocked"),
                None => debug!("route allowed"),
            }
            decision
        }
        .instrument(span)
        .await
    }

    /// Gate for pages that need a registry-confirmed voter.
    pub async fn check_voter(&self) -> RouteDecision {
        let voter_id = self.read(storage_keys::VOTER_ID).await;
        evaluate_voter_guard(voter_id.as_deref())
    }

    /// Gate for the admin console.
    pub async fn check_admin(&self) -> RouteDecision {
        let role = self.read(storage_keys::ROLE).await;
        evaluate_admin_guard(role.as_deref())
    }

    /// Remove every verification key from both stores.
    pub async fn clear_verification_storage(&self) {
        let session = storage_keys::SESSION_VERIFICATION_KEYS
            .iter()
            .map(|&key| async move { (key, self.session_storage.remove(key).await) });
        let durable = storage_keys::DURABLE_VERIFICATION_KEYS
            .iter()
            .map(|&key| async move { (key, self.durable_storage.remove(key).await) });
        let (session, durable) = futures::future::join(join_all(session), join_all(durable)).await;

        for (key, result) in session {
            if let Err(err) = result {
                warn!(key, error = %err, "failed to clear session key");
            }
        }
        for (key, result) in durable {
            if let Err(err) = result {
                warn!(key, error = %err, "failed to clear durable key");
            }
        }
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.session_storage.get(key).await {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "failed to read session key");
                None
            }
        }
    }

    /// Malformed JSON is treated as absent and removed.
    async fn read_verification_data(&self) -> Option<Value> {
        let raw = self.read(storage_keys::FACE_VERIFICATION_DATA).await?;
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(error = %err, "stored verification data is malformed; clearing");
                if let Err(err) = self
                    .session_storage
                    .remove(storage_keys::FACE_VERIFICATION_DATA)
                    .await
                {
                    warn!(error = %err, "failed to clear malformed verification data");
                }
                None
            }
        }
    }
}

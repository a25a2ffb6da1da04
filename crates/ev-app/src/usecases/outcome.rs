//! Success and failure pages shown after the wizard.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use ev_core::access::{AppRoute, RouteTarget};
use ev_core::ids::VoterId;
use ev_core::ports::{ClockPort, KeyValueStorePort, NavigatorPort};
use ev_core::storage_keys;
use ev_core::verification::{SessionSnapshot, VerificationSource};
use ev_core::VerificationError;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session_store::VerificationSessionStore;

pub const SUCCESS_REDIRECT_SECS: u32 = 5;
pub const FAILURE_REDIRECT_SECS: u32 = 8;

/// Advice listed on the failure page.
pub const COMMON_SOLUTIONS: &[(&str, &str)] = &[
    (
        "Check Image Quality",
        "Ensure your ID card photo is clear, well-lit, and all text is readable",
    ),
    (
        "Face Positioning",
        "Look directly at the camera with good lighting and remove accessories",
    ),
    (
        "Retry Process",
        "Sometimes network issues can cause verification failures",
    ),
];

/// Once-per-second countdown that navigates when it reaches zero.
pub struct RedirectCountdown {
    remaining: watch::Receiver<u32>,
    cancel: CancellationToken,
}

impl RedirectCountdown {
    pub fn start(
        navigator: Arc<dyn NavigatorPort>,
        target: RouteTarget,
        seconds: u32,
        parent: &CancellationToken,
    ) -> Self {
        let (tx, remaining) = watch::channel(seconds);
        let cancel = parent.child_token();
        let token = cancel.clone();
        tokio::spawn(async move {
            let mut left = seconds;
            while left > 0 {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(route = %target, left, "redirect countdown cancelled");
                        return;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
                left -= 1;
                tx.send_replace(left);
            }
            if !token.is_cancelled() {
                info!(route = %target, "redirecting");
                navigator.navigate(target);
            }
        });
        Self { remaining, cancel }
    }

    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// What the success page shows.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessSummary {
    pub national_id: String,
    pub voter_id: VoterId,
    pub match_percentage: f64,
    pub verified_at: DateTime<Utc>,
    pub source: Option<VerificationSource>,
}

impl SuccessSummary {
    /// Plain-text certificate offered for download.
    pub fn certificate(&self) -> String {
        let date = self.verified_at.format("%A, %B %-d, %Y %H:%M:%S UTC");
        [
            "VERIFICATION CERTIFICATE".to_string(),
            "========================".to_string(),
            String::new(),
            "IDENTITY VERIFICATION SUCCESSFUL".to_string(),
            String::new(),
            "VERIFICATION DETAILS:".to_string(),
            format!("  National ID: {}", self.national_id),
            format!("  Voter ID: {}", self.voter_id),
            format!("  Match Percentage: {:.1}%", self.match_percentage),
            format!("  Verification Date: {date}"),
            String::new(),
            "NEXT STEP:".to_string(),
            "  You are now eligible to participate in the upcoming elections.".to_string(),
            String::new(),
            "This is a computer-generated document and does not require a signature.".to_string(),
        ]
        .join("\n")
    }

    pub fn certificate_file_name(&self, now_ms: i64) -> String {
        format!("verification_{}_{}.txt", self.national_id, now_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    BothChecksFailed,
    IdCardFailed,
    FaceFailed,
    SessionExpired,
    DataError,
    General,
}

impl FailureReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::BothChecksFailed => "Both ID card and face verification failed",
            Self::IdCardFailed => "ID card verification failed",
            Self::FaceFailed => "Face verification failed",
            Self::SessionExpired => "Verification session expired",
            Self::DataError => "Data processing error",
            Self::General => "General verification error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetail {
    pub label: &'static str,
    pub value: String,
    pub passed: bool,
}

/// What the failure page shows.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureSummary {
    pub reason: FailureReason,
    pub national_id: Option<String>,
    pub details: Vec<FailureDetail>,
}

fn status_detail(label: &'static str, passed: bool) -> FailureDetail {
    FailureDetail {
        label,
        value: if passed { "Verified" } else { "Failed" }.to_string(),
        passed,
    }
}

impl FailureSummary {
    fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let session = &snapshot.session;
        let id_card_ok = session.id_card_image().is_some();
        let face_ok = session.overall_verified();
        let reason = match (id_card_ok, face_ok) {
            (false, false) => FailureReason::BothChecksFailed,
            (false, true) => FailureReason::IdCardFailed,
            (true, false) => FailureReason::FaceFailed,
            (true, true) => FailureReason::General,
        };

        let mut details = vec![
            status_detail("ID Card Status", id_card_ok),
            status_detail("Face Verification", face_ok),
        ];
        if let Some(message) = session.verification_result().and_then(|r| r.message()) {
            details.push(FailureDetail {
                label: "Error Message",
                value: message.to_string(),
                passed: false,
            });
        }

        Self {
            reason,
            national_id: Some(session.national_id().to_string()).filter(|s| !s.is_empty()),
            details,
        }
    }

    fn without_session(reason: FailureReason) -> Self {
        Self {
            reason,
            national_id: None,
            details: Vec::new(),
        }
    }
}

/// Use cases behind the success and failure pages.
pub struct VerificationOutcomes {
    store: Arc<VerificationSessionStore>,
    session_storage: Arc<dyn KeyValueStorePort>,
    navigator: Arc<dyn NavigatorPort>,
    clock: Arc<dyn ClockPort>,
    lifetime: CancellationToken,
    countdown: Mutex<Option<RedirectCountdown>>,
}

impl VerificationOutcomes {
    pub fn new(
        store: Arc<VerificationSessionStore>,
        session_storage: Arc<dyn KeyValueStorePort>,
        navigator: Arc<dyn NavigatorPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            store,
            session_storage,
            navigator,
            clock,
            lifetime: CancellationToken::new(),
            countdown: Mutex::new(None),
        }
    }

    /// Success details from the checkpoint, falling back to the live
    /// session's result.
    pub async fn success_summary(&self) -> Option<SuccessSummary> {
        if let Some(status) = self.store.verification_status().await {
            if status.verified {
                return Some(SuccessSummary {
                    national_id: status.national_id,
                    voter_id: status.voter_id,
                    match_percentage: status.match_percentage,
                    verified_at: status.verification_time,
                    source: status.verification_result.map(|r| r.source()),
                });
            }
        }

        let session = self.store.session().await?;
        let result = session.verification_result().filter(|r| r.verified())?;
        Some(SuccessSummary {
            national_id: session.national_id().to_string(),
            voter_id: session.voter_id(),
            match_percentage: result.match_percentage(),
            verified_at: result.timestamp(),
            source: Some(result.source()),
        })
    }

    pub fn start_success_redirect(&self) -> watch::Receiver<u32> {
        self.start_countdown(RouteTarget::new(AppRoute::Elections), SUCCESS_REDIRECT_SECS)
    }

    pub fn go_to_elections_now(&self) {
        self.cancel_countdown();
        self.navigator.navigate(RouteTarget::new(AppRoute::Elections));
    }

    /// Why the last attempt failed, read from the stored session.
    pub async fn failure_summary(&self) -> FailureSummary {
        let raw = match self
            .session_storage
            .get(storage_keys::FACE_VERIFICATION_DATA)
            .await
        {
            Ok(Some(raw)) => raw,
            Ok(None) => return FailureSummary::without_session(FailureReason::SessionExpired),
            Err(err) => {
                warn!(error = %err, "failed to read verification data");
                return FailureSummary::without_session(FailureReason::DataError);
            }
        };
        match serde_json::from_str::<SessionSnapshot>(&raw) {
            Ok(snapshot) => FailureSummary::from_snapshot(&snapshot),
            Err(err) => {
                warn!(error = %err, "verification data is malformed");
                FailureSummary::without_session(FailureReason::DataError)
            }
        }
    }

    pub fn start_failure_redirect(&self) -> watch::Receiver<u32> {
        self.start_countdown(RouteTarget::new(AppRoute::Check), FAILURE_REDIRECT_SECS)
    }

    /// Drop the failed attempt, keep the national ID, and go back to the
    /// wizard.
    #[tracing::instrument(name = "usecase.verification_outcomes.retry", skip(self))]
    pub async fn retry(&self) -> Result<(), VerificationError> {
        self.cancel_countdown();
        let national_id = self.store.national_id().await;
        self.store.reset().await?;
        if let Some(national_id) = national_id {
            self.session_storage
                .set(storage_keys::NATIONAL_ID, &national_id)
                .await
                .map_err(|e| VerificationError::storage(storage_keys::NATIONAL_ID, e))?;
        }
        info!(at = %self.clock.now(), "retrying verification");
        self.navigator.navigate(RouteTarget::new(AppRoute::Verify));
        Ok(())
    }

    /// Stop any pending redirect.
    pub fn dispose(&self) {
        self.lifetime.cancel();
    }

    fn start_countdown(&self, target: RouteTarget, seconds: u32) -> watch::Receiver<u32> {
        let countdown =
            RedirectCountdown::start(self.navigator.clone(), target, seconds, &self.lifetime);
        let remaining = countdown.subscribe();
        let previous = self
            .countdown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(countdown);
        if let Some(previous) = previous {
            previous.cancel();
        }
        remaining
    }

    fn cancel_countdown(&self) {
        let current = self
            .countdown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(current) = current {
            current.cancel();
        }
    }
}

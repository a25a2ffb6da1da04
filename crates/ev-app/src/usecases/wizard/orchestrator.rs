//! Verification wizard orchestrator.
//!
//! Drives [`WizardStateMachine`] and executes the actions it returns. Every
//! timer the wizard starts is a child of one lifetime token, so
//! [`dispose`](VerificationWizard::dispose) tears everything down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use ev_core::access::RouteTarget;
use ev_core::camera::{CameraError, CameraErrorKind, CAPTURED_SELFIE_NAME};
use ev_core::config::VerificationConfig;
use ev_core::ports::{CameraPort, ClockPort, FaceMatchPort, NavigatorPort};
use ev_core::verification::{
    ImageFile, NavigationTarget, VerificationResult, VerificationStep, WizardAction, WizardEvent,
    WizardRejection, WizardState, WizardStateMachine,
};
use ev_core::VerificationError;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::context::WizardContext;
use crate::usecases::session_store::VerificationSessionStore;

const FACE_MATCH_ENDPOINT: &str = "/face/verify";

/// Timing knobs, taken from `[verification]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardSettings {
    /// Pause between showing an outcome and leaving the wizard.
    pub redirect_delay: Duration,
    pub countdown_secs: u32,
    pub banner_dismiss: Duration,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self::from_config(&VerificationConfig::default())
    }
}

impl WizardSettings {
    pub fn from_config(config: &VerificationConfig) -> Self {
        Self {
            redirect_delay: Duration::from_millis(config.redirect_delay_ms),
            countdown_secs: config.countdown_secs,
            banner_dismiss: Duration::from_millis(config.banner_dismiss_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    Success,
    Error,
    Warning,
}

/// Inline message with an auto-dismiss deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub id: u64,
    pub kind: BannerKind,
    pub message: String,
}

/// Everything the wizard page renders.
///
/// 向导页面的完整视图状态。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub state: WizardState,
    pub loading: bool,
    pub capturing: bool,
    /// Seconds left on the selfie countdown.
    pub countdown: Option<u32>,
    pub camera_active: bool,
    pub result: Option<VerificationResult>,
    pub success: Option<Banner>,
    pub error: Option<Banner>,
    pub warning: Option<Banner>,
}

impl WizardView {
    fn new(state: WizardState) -> Self {
        Self {
            state,
            loading: false,
            capturing: false,
            countdown: None,
            camera_active: false,
            result: None,
            success: None,
            error: None,
            warning: None,
        }
    }

    pub fn match_percentage(&self) -> f64 {
        self.result
            .as_ref()
            .map(VerificationResult::match_percentage)
            .unwrap_or(0.0)
    }

    pub fn title(&self) -> &'static str {
        self.state.step.wizard_title()
    }

    pub fn icon(&self) -> &'static str {
        self.state.step.wizard_icon()
    }

    pub fn banner(&self, kind: BannerKind) -> Option<&Banner> {
        match kind {
            BannerKind::Success => self.success.as_ref(),
            BannerKind::Error => self.error.as_ref(),
            BannerKind::Warning => self.warning.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: BannerKind) -> &mut Option<Banner> {
        match kind {
            BannerKind::Success => &mut self.success,
            BannerKind::Error => &mut self.error,
            BannerKind::Warning => &mut self.warning,
        }
    }

    fn clear_banners(&mut self) {
        self.success = None;
        self.error = None;
        self.warning = None;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Rejected(#[from] WizardRejection),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("wizard has been disposed")]
    Disposed,
}

impl WizardError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(rejection) => rejection.user_message(),
            Self::Verification(err) => err.user_message(),
            Self::Disposed => "This page is no longer active".to_string(),
        }
    }
}

/// Orchestrator for the three-step verification wizard.
///
/// 三步验证向导的编排器。
pub struct VerificationWizard {
    context: Arc<WizardContext>,
    store: Arc<VerificationSessionStore>,
    camera: Arc<dyn CameraPort>,
    face_match: Arc<dyn FaceMatchPort>,
    navigator: Arc<dyn NavigatorPort>,
    clock: Arc<dyn ClockPort>,
    settings: WizardSettings,
    view: Arc<watch::Sender<WizardView>>,
    lifetime: CancellationToken,
    pending_navigation: Mutex<Option<CancellationToken>>,
    capture: Mutex<Option<CancellationToken>>,
    banner_seq: AtomicU64,
}

fn replace_token(slot: &Mutex<Option<CancellationToken>>, token: Option<CancellationToken>) {
    let previous = {
        let mut guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, token)
    };
    if let Some(previous) = previous {
        previous.cancel();
    }
}

impl VerificationWizard {
    pub fn new(
        store: Arc<VerificationSessionStore>,
        camera: Arc<dyn CameraPort>,
        face_match: Arc<dyn FaceMatchPort>,
        navigator: Arc<dyn NavigatorPort>,
        clock: Arc<dyn ClockPort>,
        settings: WizardSettings,
    ) -> Self {
        let (view, _) = watch::channel(WizardView::new(WizardState::initial()));
        Self {
            context: WizardContext::default().arc(),
            store,
            camera,
            face_match,
            navigator,
            clock,
            settings,
            view: Arc::new(view),
            lifetime: CancellationToken::new(),
            pending_navigation: Mutex::new(None),
            capture: Mutex::new(None),
            banner_seq: AtomicU64::new(0),
        }
    }

    pub fn view(&self) -> WizardView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WizardView> {
        self.view.subscribe()
    }

    pub async fn state(&self) -> WizardState {
        self.context.get_state().await
    }

    pub fn step_title(&self) -> &'static str {
        self.view.borrow().title()
    }

    pub fn step_icon(&self) -> &'static str {
        self.view.borrow().icon()
    }

    pub fn is_step_complete(&self, n: u8) -> bool {
        self.view.borrow().state.is_step_complete(n)
    }

    pub fn can_proceed_to_verification(&self) -> bool {
        self.store.can_advance_to_verification()
    }

    /// Sync with the session store. A valid positive checkpoint for the
    /// voter short-circuits to the verified step-3 view without calling the
    /// face-match service. An unfinished session whose images lost their
    /// bytes on reload is rewound to the first image that has to be provided
    /// again.
    #[tracing::instrument(name = "usecase.verification_wizard.load", skip(self))]
    pub async fn load(&self) -> Result<WizardView, WizardError> {
        self.ensure_live()?;
        let _guard = self.context.acquire_dispatch_lock().await;

        let checkpoint_valid = match self.store.national_id().await {
            Some(national_id) => self.store.is_user_verified(Some(&national_id)).await,
            None => false,
        };
        let rewound = if checkpoint_valid {
            None
        } else {
            match self.store.rewind_to_missing_image().await {
                Ok(step) => step,
                Err(err) => {
                    self.report(&err);
                    None
                }
            }
        };

        let result = self.store.verification_result();
        let state = WizardState {
            step: self.store.current_step(),
            has_id_card: self.store.has_usable_id_card(),
            has_face: self.store.has_usable_face(),
            verifying: false,
            verified: self.store.is_verified(),
            outcome: result.as_ref().map(VerificationResult::verified),
        };
        self.context.set_state(state.clone()).await;
        let restored = state.clone();
        self.view.send_modify(|v| {
            v.state = restored;
            v.result = result;
        });

        if checkpoint_valid {
            self.show_checkpoint().await?;
            return Ok(self.view());
        }

        if state.step == VerificationStep::FaceCapture && !state.verified {
            self.start_camera().await;
        }
        if let Some(step) = rewound {
            self.show_banner(BannerKind::Warning, reupload_message(step));
        }
        Ok(self.view())
    }

    /// Step 1: accept an ID-card image.
    pub async fn upload_id_card(
        &self,
        name: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<WizardView, WizardError> {
        self.ensure_live()?;
        let _guard = self.context.acquire_dispatch_lock().await;
        self.precheck(WizardEvent::IdCardAccepted).await?;

        let image = ImageFile::new(name, mime_type, data, self.clock.now());
        self.set_loading(true);
        let stored = self.store.set_id_card_image(image).await;
        self.set_loading(false);
        if let Err(err) = stored {
            self.report(&err);
            return Err(err.into());
        }

        self.dismiss(BannerKind::Error);
        self.apply(WizardEvent::IdCardAccepted).await?;
        Ok(self.view())
    }

    /// Step 2 via file picker.
    pub async fn upload_selfie(
        &self,
        name: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<WizardView, WizardError> {
        self.ensure_live()?;
        let _guard = self.context.acquire_dispatch_lock().await;
        self.precheck(WizardEvent::FaceAccepted).await?;

        let image = ImageFile::new(name, mime_type, data, self.clock.now());
        self.accept_face(image).await?;
        self.show_banner(BannerKind::Warning, "Selfie uploaded! Ready for verification.");
        Ok(self.view())
    }

    /// Step 2 via camera: count down, capture, store.
    ///
    /// The dispatch lock is not held during the countdown, so a restart or
    /// dispose can interrupt it. A cancelled countdown stores nothing.
    pub async fn capture_selfie(&self) -> Result<WizardView, WizardError> {
        self.ensure_live()?;
        self.precheck(WizardEvent::FaceAccepted).await?;
        if !self.camera.is_active() {
            let err = VerificationError::from(CameraError::new(CameraErrorKind::NotActive));
            self.report(&err);
            return Err(err.into());
        }

        let token = self.lifetime.child_token();
        replace_token(&self.capture, Some(token.clone()));
        let seconds = self.settings.countdown_secs;
        self.view.send_modify(|v| {
            v.capturing = true;
            v.countdown = Some(seconds);
            v.error = None;
        });

        let mut ticks = self.camera.capture_with_countdown(seconds, token);
        let mut photo = None;
        let mut failure = None;
        while let Some(tick) = ticks.recv().await {
            match tick {
                Ok(tick) => {
                    self.view.send_modify(|v| v.countdown = Some(tick.remaining));
                    if tick.photo.is_some() {
                        photo = tick.photo;
                    }
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        self.view.send_modify(|v| {
            v.capturing = false;
            v.countdown = None;
        });

        if let Some(err) = failure {
            let err = VerificationError::from(err);
            self.report(&err);
            return Err(err.into());
        }
        let Some(photo) = photo else {
            debug!("selfie countdown ended without a photo");
            return Ok(self.view());
        };

        let _guard = self.context.acquire_dispatch_lock().await;
        self.ensure_live()?;
        self.precheck(WizardEvent::FaceAccepted).await?;
        self.accept_face(photo.into_image_file(CAPTURED_SELFIE_NAME))
            .await?;
        self.show_banner(BannerKind::Warning, "Selfie captured! Ready for verification.");
        Ok(self.view())
    }

    pub fn cancel_capture(&self) {
        replace_token(&self.capture, None);
    }

    /// Step 3: run the face match.
    pub async fn verify(&self) -> Result<WizardView, WizardError> {
        self.ensure_live()?;
        let _guard = self.context.acquire_dispatch_lock().await;
        self.apply(WizardEvent::VerifyRequested).await?;
        Ok(self.view())
    }

    /// Discard the selfie and go back to capture. Refused once verified.
    pub async fn retry_capture(&self) -> Result<WizardView, WizardError> {
        self.ensure_live()?;
        let _guard = self.context.acquire_dispatch_lock().await;
        self.apply(WizardEvent::RetryCapture).await?;
        Ok(self.view())
    }

    /// Full reset back to step 1. The durable checkpoint is kept.
    pub async fn restart_process(&self) -> Result<WizardView, WizardError> {
        self.ensure_live()?;
        let _guard = self.context.acquire_dispatch_lock().await;
        self.apply(WizardEvent::Restart).await?;
        Ok(self.view())
    }

    pub async fn go_to_step(&self, step: u8) -> Result<WizardView, WizardError> {
        self.ensure_live()?;
        let _guard = self.context.acquire_dispatch_lock().await;
        self.apply(WizardEvent::GoToStep { step }).await?;
        Ok(self.view())
    }

    pub async fn go_back(&self) -> Result<WizardView, WizardError> {
        self.ensure_live()?;
        let _guard = self.context.acquire_dispatch_lock().await;
        self.apply(WizardEvent::GoBack).await?;
        Ok(self.view())
    }

    pub fn dismiss_banners(&self) {
        self.view.send_modify(WizardView::clear_banners);
    }

    /// Cancel every timer and release the camera. Later calls fail with
    /// [`WizardError::Disposed`].
    pub async fn dispose(&self) {
        self.lifetime.cancel();
        replace_token(&self.pending_navigation, None);
        replace_token(&self.capture, None);
        self.camera.release().await;
        self.view.send_modify(|v| {
            v.camera_active = false;
            v.capturing = false;
            v.countdown = None;
        });
        info!("verification wizard disposed");
    }

    fn ensure_live(&self) -> Result<(), WizardError> {
        if self.lifetime.is_cancelled() {
            return Err(WizardError::Disposed);
        }
        Ok(())
    }

    /// Dry-run `event` against the current state so nothing is stored for
    /// an event the wizard would refuse.
    async fn precheck(&self, event: WizardEvent) -> Result<(), WizardError> {
        let state = self.context.get_state().await;
        match WizardStateMachine::transition(state, event) {
            Ok(_) => Ok(()),
            Err(rejection) => {
                self.show_banner(BannerKind::Error, rejection.user_message());
                Err(rejection.into())
            }
        }
    }

    async fn accept_face(&self, image: ImageFile) -> Result<(), WizardError> {
        self.set_loading(true);
        let stored = self.store.set_face_image(image).await;
        self.set_loading(false);
        if let Err(err) = stored {
            self.report(&err);
            return Err(err.into());
        }
        self.dismiss(BannerKind::Error);
        self.apply(WizardEvent::FaceAccepted).await?;
        Ok(())
    }

    async fn show_checkpoint(&self) -> Result<(), WizardError> {
        let status = self.store.verification_status().await;
        let checkpoint_result = status.as_ref().and_then(|s| s.verification_result.clone());
        let match_percentage = status.as_ref().map(|s| s.match_percentage).unwrap_or(0.0);
        info!(match_percentage, "valid checkpoint found; skipping face match");

        if !self.store.is_verified() {
            if let Some(result) = checkpoint_result.clone() {
                if let Err(err) = self.store.set_verification_result(Some(result)).await {
                    warn!(error = %err, "failed to mirror checkpoint into session");
                }
            }
        }

        self.apply(WizardEvent::RevisitVerified).await?;
        let result = checkpoint_result.or_else(|| self.store.verification_result());
        self.view.send_modify(|v| v.result = result);
        self.show_banner(
            BannerKind::Success,
            format!("You are already verified! Match percentage: {match_percentage:.1}%"),
        );
        Ok(())
    }

    /// Run `event` and every follow-up it produces. Caller holds the
    /// dispatch lock.
    #[tracing::instrument(name = "usecase.verification_wizard.dispatch", skip(self))]
    async fn apply(&self, event: WizardEvent) -> Result<WizardState, WizardError> {
        let mut current = self.context.get_state().await;
        let mut pending = vec![event];

        while let Some(event) = pending.pop() {
            let event_name = format!("{event:?}");
            let (next, actions) = match WizardStateMachine::transition(current.clone(), event) {
                Ok(transition) => transition,
                Err(rejection) => {
                    warn!(event = %event_name, reason = %rejection, "wizard event rejected");
                    self.show_banner(BannerKind::Error, rejection.user_message());
                    return Err(WizardError::Rejected(rejection));
                }
            };
            info!(from = ?current.step, to = ?next.step, event = %event_name, "wizard transition");

            self.context.set_state(next.clone()).await;
            let published = next.clone();
            self.view.send_modify(|v| v.state = published);
            current = next;

            let follow_ups = self.execute_actions(actions).await;
            pending.extend(follow_ups);
        }

        Ok(current)
    }

    async fn execute_actions(&self, actions: Vec<WizardAction>) -> Vec<WizardEvent> {
        let mut follow_ups = Vec::new();
        for action in actions {
            debug!(?action, "wizard executing action");
            match action {
                WizardAction::StartCamera => self.start_camera().await,
                WizardAction::StopCamera => self.stop_camera().await,
                WizardAction::InvokeFaceMatch => follow_ups.push(self.run_face_match().await),
                WizardAction::ClearFaceImage => {
                    if let Err(err) = self.store.clear_face_image().await {
                        self.report(&err);
                    }
                    self.view.send_modify(|v| {
                        v.result = None;
                        v.clear_banners();
                    });
                }
                WizardAction::ResetSession => {
                    if let Err(err) = self.store.reset().await {
                        self.report(&err);
                    }
                    self.view.send_modify(|v| {
                        v.result = None;
                        v.loading = false;
                        v.capturing = false;
                        v.countdown = None;
                        v.clear_banners();
                    });
                }
                WizardAction::JumpSessionTo { step } => {
                    if let Err(err) = self.store.go_to_step(step).await {
                        self.report(&err);
                    }
                }
                WizardAction::CancelPendingNavigation => {
                    replace_token(&self.pending_navigation, None);
                }
                WizardAction::NavigateAfterDelay { target } => self.navigate_after_delay(target),
                WizardAction::NavigateNow { target } => {
                    replace_token(&self.pending_navigation, None);
                    self.navigator.navigate(RouteTarget::new(target.into()));
                }
            }
        }
        follow_ups
    }

    async fn start_camera(&self) {
        if self.camera.is_active() {
            self.view.send_modify(|v| v.camera_active = true);
            return;
        }
        match self.camera.acquire(None).await {
            Ok(()) => {
                self.view.send_modify(|v| v.camera_active = true);
                self.show_banner(
                    BannerKind::Warning,
                    "Position your face in the center and click \"Capture Selfie\"",
                );
            }
            Err(err) => {
                warn!(kind = ?err.kind(), "camera unavailable; photo upload remains possible");
                self.view.send_modify(|v| v.camera_active = false);
                self.report(&VerificationError::from(err));
            }
        }
    }

    async fn stop_camera(&self) {
        replace_token(&self.capture, None);
        self.camera.release().await;
        self.view.send_modify(|v| {
            v.camera_active = false;
            v.capturing = false;
            v.countdown = None;
        });
    }

    async fn run_face_match(&self) -> WizardEvent {
        let (Some(id_card), Some(face)) = (self.store.id_card_image(), self.store.face_image())
        else {
            self.show_banner(
                BannerKind::Error,
                WizardRejection::MissingImages.user_message(),
            );
            return WizardEvent::VerificationErrored;
        };

        self.view.send_modify(|v| {
            v.success = None;
            v.error = None;
        });

        let result = match self.face_match.verify(&id_card, &face).await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "face match failed");
                self.report(&err.to_verification_error(FACE_MATCH_ENDPOINT));
                return WizardEvent::VerificationErrored;
            }
        };

        if let Err(err) = self.store.record_outcome(result.clone()).await {
            self.report(&err);
            return WizardEvent::VerificationErrored;
        }

        let verified = result.verified();
        let percentage = result.confidence();
        if verified {
            let message = match percentage {
                Some(p) => format!("Verification Successful! Match: {p:.1}%"),
                None => "Verification Successful!".to_string(),
            };
            self.show_banner(BannerKind::Success, message);
        } else {
            let mut message = match percentage {
                Some(p) => format!("Verification Failed. Similarity: {p:.1}%"),
                None => "Verification Failed.".to_string(),
            };
            if let Some(detail) = result.message() {
                message.push_str(" - ");
                message.push_str(detail);
            }
            self.show_banner(BannerKind::Error, message);
        }
        self.view.send_modify(|v| v.result = Some(result));
        WizardEvent::OutcomeRecorded { verified }
    }

    fn navigate_after_delay(&self, target: NavigationTarget) {
        let token = self.lifetime.child_token();
        replace_token(&self.pending_navigation, Some(token.clone()));
        let navigator = self.navigator.clone();
        let delay = self.settings.redirect_delay;
        let route = RouteTarget::new(target.into());
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(route = %route, "pending navigation cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    info!(route = %route, "navigating after outcome");
                    navigator.navigate(route);
                }
            }
        });
    }

    fn set_loading(&self, loading: bool) {
        self.view.send_if_modified(|v| {
            let changed = v.loading != loading;
            v.loading = loading;
            changed
        });
    }

    fn report(&self, err: &VerificationError) {
        warn!(kind = ?err.kind(), error = %err, "verification step failed");
        self.show_banner(BannerKind::Error, err.user_message());
    }

    fn dismiss(&self, kind: BannerKind) {
        self.view.send_if_modified(|v| v.slot_mut(kind).take().is_some());
    }

    fn show_banner(&self, kind: BannerKind, message: impl Into<String>) {
        let id = self.banner_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let banner = Banner {
            id,
            kind,
            message: message.into(),
        };
        self.view.send_modify(|v| *v.slot_mut(kind) = Some(banner));

        let view = Arc::clone(&self.view);
        let token = self.lifetime.child_token();
        let dismiss_after = self.settings.banner_dismiss;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(dismiss_after) => {
                    view.send_if_modified(|v| {
                        let slot = v.slot_mut(kind);
                        if slot.as_ref().is_some_and(|b| b.id == id) {
                            *slot = None;
                            true
                        } else {
                            false
                        }
                    });
                }
            }
        });
    }
}

fn reupload_message(step: VerificationStep) -> &'static str {
    match step {
        VerificationStep::IdCard => {
            "Your previous uploads were not kept. Please upload your ID card again."
        }
        _ => "Your previous selfie was not kept. Please capture your selfie again.",
    }
}

//! Verification session store.
//!
//! In-memory source of truth for the wizard's progress. Every mutation
//! writes a complete snapshot to session storage (`face_verification_data`)
//! and a reduced summary to durable storage (`verification_session`). The
//! positive-outcome checkpoint (`user_verification_status`) is written
//! separately and survives [`reset`](VerificationSessionStore::reset).
//!
//! 验证会话存储：内存为准，每次变更都整体写入存储。

use std::sync::Arc;

use chrono::Duration;
use ev_core::ids::VoterId;
use ev_core::ports::{ClockPort, KeyValueStorePort};
use ev_core::storage_keys;
use ev_core::verification::{
    ImageFile, ImageRef, SessionSnapshot, VerificationProgress, VerificationResult,
    VerificationSession, VerificationStatus, VerificationStep,
};
use ev_core::VerificationError;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

pub struct VerificationSessionStore {
    session_storage: Arc<dyn KeyValueStorePort>,
    durable_storage: Arc<dyn KeyValueStorePort>,
    clock: Arc<dyn ClockPort>,
    window: Duration,
    session: Mutex<Option<VerificationSession>>,
    id_card_image: watch::Sender<Option<ImageFile>>,
    face_image: watch::Sender<Option<ImageFile>>,
    current_step: watch::Sender<VerificationStep>,
    verification_result: watch::Sender<Option<VerificationResult>>,
    is_verified: watch::Sender<bool>,
}

fn set_if_changed<T: PartialEq>(tx: &watch::Sender<T>, value: T) {
    tx.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

fn holds_bytes(slot: &watch::Sender<Option<ImageFile>>) -> bool {
    slot.borrow().as_ref().is_some_and(ImageFile::has_data)
}

/// Previews are plain handles; dropping the ref is the release.
fn release_preview(slot: &'static str, previous: Option<ImageRef>) {
    if let Some(previous) = previous {
        debug!(slot, preview = %previous.preview_url, "released image preview");
    }
}

impl VerificationSessionStore {
    /// Empty store. Call [`restore`](Self::restore) or use
    /// [`open`](Self::open) to pick up earlier state.
    pub fn new(
        session_storage: Arc<dyn KeyValueStorePort>,
        durable_storage: Arc<dyn KeyValueStorePort>,
        clock: Arc<dyn ClockPort>,
        window: Duration,
    ) -> Self {
        Self {
            session_storage,
            durable_storage,
            clock,
            window,
            session: Mutex::new(None),
            id_card_image: watch::channel(None).0,
            face_image: watch::channel(None).0,
            current_step: watch::channel(VerificationStep::IdCard).0,
            verification_result: watch::channel(None).0,
            is_verified: watch::channel(false).0,
        }
    }

    /// Construct and restore in one go.
    pub async fn open(
        session_storage: Arc<dyn KeyValueStorePort>,
        durable_storage: Arc<dyn KeyValueStorePort>,
        clock: Arc<dyn ClockPort>,
        window: Duration,
    ) -> Self {
        let store = Self::new(session_storage, durable_storage, clock, window);
        store.restore().await;
        store
    }

    /// Rebuild from session storage. Returns whether a session was found.
    /// Unreadable or corrupt data is removed and the store starts empty.
    #[tracing::instrument(name = "usecase.session_store.restore", skip(self))]
    pub async fn restore(&self) -> bool {
        let raw = match self
            .session_storage
            .get(storage_keys::FACE_VERIFICATION_DATA)
            .await
        {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(err) => {
                warn!(error = %err, "failed to read stored verification session");
                return false;
            }
        };

        let snapshot = match serde_json::from_str::<SessionSnapshot>(&raw) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "stored verification session is corrupt; clearing");
                if let Err(err) = self
                    .session_storage
                    .remove(storage_keys::FACE_VERIFICATION_DATA)
                    .await
                {
                    warn!(error = %err, "failed to clear corrupt verification session");
                }
                return false;
            }
        };

        let session = snapshot.session;
        set_if_changed(
            &self.id_card_image,
            session.id_card_image().cloned().map(ImageFile::restored),
        );
        set_if_changed(
            &self.face_image,
            session.face_image().cloned().map(ImageFile::restored),
        );
        self.publish(Some(&session));
        info!(
            session_id = %session.session_id(),
            step = session.current_step().as_str(),
            "verification session restored"
        );
        *self.session.lock().await = Some(session);
        true
    }

    pub fn id_card_image(&self) -> Option<ImageFile> {
        self.id_card_image.borrow().clone()
    }

    pub fn subscribe_id_card_image(&self) -> watch::Receiver<Option<ImageFile>> {
        self.id_card_image.subscribe()
    }

    pub fn face_image(&self) -> Option<ImageFile> {
        self.face_image.borrow().clone()
    }

    pub fn subscribe_face_image(&self) -> watch::Receiver<Option<ImageFile>> {
        self.face_image.subscribe()
    }

    pub fn current_step(&self) -> VerificationStep {
        *self.current_step.borrow()
    }

    pub fn subscribe_current_step(&self) -> watch::Receiver<VerificationStep> {
        self.current_step.subscribe()
    }

    pub fn verification_result(&self) -> Option<VerificationResult> {
        self.verification_result.borrow().clone()
    }

    pub fn subscribe_verification_result(&self) -> watch::Receiver<Option<VerificationResult>> {
        self.verification_result.subscribe()
    }

    /// Mirrors the recorded result; there is no independent setter.
    pub fn is_verified(&self) -> bool {
        *self.is_verified.borrow()
    }

    pub fn subscribe_is_verified(&self) -> watch::Receiver<bool> {
        self.is_verified.subscribe()
    }

    pub fn progress(&self) -> VerificationProgress {
        self.current_step().progress()
    }

    /// Both images must still hold their bytes; restored metadata alone
    /// cannot be sent to the face-match service.
    pub fn can_advance_to_verification(&self) -> bool {
        holds_bytes(&self.id_card_image) && holds_bytes(&self.face_image)
    }

    pub fn has_usable_id_card(&self) -> bool {
        holds_bytes(&self.id_card_image)
    }

    pub fn has_usable_face(&self) -> bool {
        holds_bytes(&self.face_image)
    }

    /// After a restore the image bytes are gone. Move an unfinished session
    /// back to the first step whose image has to be provided again, dropping
    /// the byte-less images from that step on. Returns the step rewound to.
    /// Verified sessions are left alone.
    #[tracing::instrument(name = "usecase.session_store.rewind_to_missing_image", skip(self))]
    pub async fn rewind_to_missing_image(
        &self,
    ) -> Result<Option<VerificationStep>, VerificationError> {
        let target = if !holds_bytes(&self.id_card_image) {
            VerificationStep::IdCard
        } else if !holds_bytes(&self.face_image) {
            VerificationStep::FaceCapture
        } else {
            return Ok(None);
        };

        let now = self.clock.now();
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return Ok(None);
        };
        if session.overall_verified() || session.current_step() <= target {
            return Ok(None);
        }

        if target == VerificationStep::IdCard {
            release_preview("idCardImage", session.clear_id_card_image(now));
            set_if_changed(&self.id_card_image, None);
        }
        if !holds_bytes(&self.face_image) {
            release_preview("faceImage", session.clear_face_image(now));
            set_if_changed(&self.face_image, None);
        }
        session.clear_result(now);
        session.rewind_to(target, now);
        info!(step = target.as_str(), "restored session rewound to missing image");
        self.commit(guard.as_ref()).await?;
        Ok(Some(target))
    }

    pub async fn session(&self) -> Option<VerificationSession> {
        self.session.lock().await.clone()
    }

    /// National ID of the live session, falling back to session storage.
    pub async fn national_id(&self) -> Option<String> {
        if let Some(session) = self.session.lock().await.as_ref() {
            if !session.national_id().is_empty() {
                return Some(session.national_id().to_string());
            }
        }
        self.read_session_value(storage_keys::NATIONAL_ID).await
    }

    /// Bind the store to a voter. A session for a different voter is
    /// replaced; the same voter keeps its progress.
    #[tracing::instrument(name = "usecase.session_store.start_session", skip(self))]
    pub async fn start_session(
        &self,
        national_id: &str,
        voter_id: VoterId,
    ) -> Result<(), VerificationError> {
        let now = self.clock.now();
        let mut guard = self.session.lock().await;
        let same_voter = guard
            .as_ref()
            .is_some_and(|s| s.national_id() == national_id);
        if same_voter {
            if let Some(session) = guard.as_mut() {
                session.set_identity(national_id, voter_id, now);
            }
        } else {
            if let Some(previous) = guard.take() {
                release_preview("idCardImage", previous.id_card_image().cloned());
                release_preview("faceImage", previous.face_image().cloned());
            }
            set_if_changed(&self.id_card_image, None);
            set_if_changed(&self.face_image, None);
            let session = VerificationSession::new(national_id, voter_id, now);
            info!(session_id = %session.session_id(), "verification session started");
            *guard = Some(session);
        }
        self.commit(guard.as_ref()).await
    }

    /// Store a validated ID-card image and advance to face capture.
    #[tracing::instrument(
        name = "usecase.session_store.set_id_card_image",
        skip(self, image),
        fields(name = %image.name(), size = image.size())
    )]
    pub async fn set_id_card_image(&self, image: ImageFile) -> Result<(), VerificationError> {
        image.validate()?;
        let now = self.clock.now();
        let mut guard = self.session.lock().await;
        let session = self.ensure_session(&mut guard).await;
        release_preview(
            "idCardImage",
            session.set_id_card_image(image.meta().clone(), now),
        );
        self.id_card_image.send_replace(Some(image));
        self.commit(guard.as_ref()).await
    }

    /// Store a validated selfie and advance to verification.
    #[tracing::instrument(
        name = "usecase.session_store.set_face_image",
        skip(self, image),
        fields(name = %image.name(), size = image.size())
    )]
    pub async fn set_face_image(&self, image: ImageFile) -> Result<(), VerificationError> {
        image.validate()?;
        let now = self.clock.now();
        let mut guard = self.session.lock().await;
        let session = self.ensure_session(&mut guard).await;
        release_preview("faceImage", session.set_face_image(image.meta().clone(), now));
        self.face_image.send_replace(Some(image));
        self.commit(guard.as_ref()).await
    }

    pub async fn clear_id_card_image(&self) -> Result<(), VerificationError> {
        let now = self.clock.now();
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_mut() {
            release_preview("idCardImage", session.clear_id_card_image(now));
        }
        set_if_changed(&self.id_card_image, None);
        self.commit(guard.as_ref()).await
    }

    /// Drop the selfie and any outcome computed from it.
    pub async fn clear_face_image(&self) -> Result<(), VerificationError> {
        let now = self.clock.now();
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_mut() {
            release_preview("faceImage", session.clear_face_image(now));
            session.clear_result(now);
            if session.current_step() > VerificationStep::FaceCapture {
                session.rewind_to(VerificationStep::FaceCapture, now);
            }
        }
        set_if_changed(&self.face_image, None);
        self.commit(guard.as_ref()).await
    }

    /// Explicit jump, the only way besides retry and reset to move back.
    pub async fn go_to_step(&self, step: VerificationStep) -> Result<(), VerificationError> {
        let now = self.clock.now();
        let mut guard = self.session.lock().await;
        let session = self.ensure_session(&mut guard).await;
        if step < session.current_step() {
            session.rewind_to(step, now);
        } else {
            session.advance_to(step, now);
        }
        self.commit(guard.as_ref()).await
    }

    /// Replace or drop the live outcome without touching the checkpoint.
    pub async fn set_verification_result(
        &self,
        result: Option<VerificationResult>,
    ) -> Result<(), VerificationError> {
        let now = self.clock.now();
        let mut guard = self.session.lock().await;
        let session = self.ensure_session(&mut guard).await;
        match result {
            Some(result) => session.apply_result(result, now),
            None => session.clear_result(now),
        }
        self.commit(guard.as_ref()).await
    }

    /// Write the durable checkpoint for this voter, then update the live
    /// session. The checkpoint is written first so a crash in between never
    /// leaves a verified session without one.
    #[tracing::instrument(
        name = "usecase.session_store.record_outcome",
        skip(self, result),
        fields(verified = result.verified(), confidence = ?result.confidence(), source = ?result.source())
    )]
    pub async fn record_outcome(
        &self,
        result: VerificationResult,
    ) -> Result<VerificationStatus, VerificationError> {
        let now = self.clock.now();
        let mut guard = self.session.lock().await;
        let session = self.ensure_session(&mut guard).await;

        let status = VerificationStatus {
            national_id: session.national_id().to_string(),
            voter_id: session.voter_id(),
            verified: result.verified(),
            match_percentage: result.match_percentage(),
            verification_result: Some(result.clone()),
            verification_time: now,
            session_id: session.session_id().clone(),
        };
        let json = serde_json::to_string(&status)
            .map_err(|e| VerificationError::storage(storage_keys::USER_VERIFICATION_STATUS, e))?;
        self.durable_storage
            .set(storage_keys::USER_VERIFICATION_STATUS, &json)
            .await
            .map_err(|e| VerificationError::storage(storage_keys::USER_VERIFICATION_STATUS, e))?;

        session.apply_result(result, now);
        info!(
            national_id = %status.national_id,
            verified = status.verified,
            match_percentage = status.match_percentage,
            "verification checkpoint recorded"
        );
        self.commit(guard.as_ref()).await?;
        Ok(status)
    }

    /// Durable checkpoint, if readable. Malformed data is cleared.
    pub async fn verification_status(&self) -> Option<VerificationStatus> {
        let raw = match self
            .durable_storage
            .get(storage_keys::USER_VERIFICATION_STATUS)
            .await
        {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(error = %err, "failed to read verification checkpoint");
                return None;
            }
        };
        match serde_json::from_str::<VerificationStatus>(&raw) {
            Ok(status) => Some(status),
            Err(err) => {
                warn!(error = %err, "verification checkpoint is corrupt; clearing");
                if let Err(err) = self
                    .durable_storage
                    .remove(storage_keys::USER_VERIFICATION_STATUS)
                    .await
                {
                    warn!(error = %err, "failed to clear corrupt verification checkpoint");
                }
                None
            }
        }
    }

    /// The checkpoint's validity window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether a valid positive checkpoint exists, optionally for a
    /// specific national ID.
    pub async fn is_user_verified(&self, national_id: Option<&str>) -> bool {
        let Some(status) = self.verification_status().await else {
            return false;
        };
        if let Some(national_id) = national_id {
            if !status.belongs_to(national_id) {
                return false;
            }
        }
        status.is_valid_at(self.clock.now(), self.window)
    }

    /// Serialize the live session to both stores.
    pub async fn persist(&self) -> Result<(), VerificationError> {
        let guard = self.session.lock().await;
        self.write_snapshot(guard.as_ref()).await
    }

    /// Forget the live session. The durable checkpoint stays.
    #[tracing::instrument(name = "usecase.session_store.reset", skip(self))]
    pub async fn reset(&self) -> Result<(), VerificationError> {
        let mut guard = self.session.lock().await;
        if let Some(previous) = guard.take() {
            release_preview("idCardImage", previous.id_card_image().cloned());
            release_preview("faceImage", previous.face_image().cloned());
        }
        set_if_changed(&self.id_card_image, None);
        set_if_changed(&self.face_image, None);
        self.publish(None);
        self.session_storage
            .remove(storage_keys::FACE_VERIFICATION_DATA)
            .await
            .map_err(|e| VerificationError::storage(storage_keys::FACE_VERIFICATION_DATA, e))?;
        info!("verification session reset");
        Ok(())
    }

    async fn read_session_value(&self, key: &str) -> Option<String> {
        match self.session_storage.get(key).await {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(err) => {
                warn!(key, error = %err, "failed to read session value");
                None
            }
        }
    }

    /// Sessions are created lazily from the identity in session storage.
    async fn ensure_session<'a>(
        &self,
        slot: &'a mut Option<VerificationSession>,
    ) -> &'a mut VerificationSession {
        let session = match slot.take() {
            Some(session) => session,
            None => {
                let national_id = self
                    .read_session_value(storage_keys::NATIONAL_ID)
                    .await
                    .unwrap_or_default();
                let voter_id = self
                    .read_session_value(storage_keys::VOTER_ID)
                    .await
                    .and_then(|v| v.trim().parse::<i64>().ok())
                    .map(VoterId)
                    .unwrap_or_default();
                let session = VerificationSession::new(national_id, voter_id, self.clock.now());
                debug!(session_id = %session.session_id(), "verification session created");
                session
            }
        };
        slot.insert(session)
    }

    async fn commit(&self, session: Option<&VerificationSession>) -> Result<(), VerificationError> {
        self.publish(session);
        self.write_snapshot(session).await
    }

    fn publish(&self, session: Option<&VerificationSession>) {
        set_if_changed(
            &self.current_step,
            session.map(|s| s.current_step()).unwrap_or_default(),
        );
        set_if_changed(
            &self.verification_result,
            session.and_then(|s| s.verification_result().cloned()),
        );
        set_if_changed(
            &self.is_verified,
            session.is_some_and(|s| s.overall_verified()),
        );
    }

    async fn write_snapshot(
        &self,
        session: Option<&VerificationSession>,
    ) -> Result<(), VerificationError> {
        let Some(session) = session else {
            return Ok(());
        };

        let snapshot = serde_json::to_string(&SessionSnapshot::from(session))
            .map_err(|e| VerificationError::storage(storage_keys::FACE_VERIFICATION_DATA, e))?;
        self.session_storage
            .set(storage_keys::FACE_VERIFICATION_DATA, &snapshot)
            .await
            .map_err(|e| VerificationError::storage(storage_keys::FACE_VERIFICATION_DATA, e))?;

        let summary = serde_json::to_string(&session.summary())
            .map_err(|e| VerificationError::storage(storage_keys::VERIFICATION_SESSION, e))?;
        self.durable_storage
            .set(storage_keys::VERIFICATION_SESSION, &summary)
            .await
            .map_err(|e| VerificationError::storage(storage_keys::VERIFICATION_SESSION, e))?;
        Ok(())
    }
}

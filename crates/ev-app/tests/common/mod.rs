//! Fakes shared by the ev-app integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ev_app::usecases::{
    CheckVoter, RouteGuard, VerificationOutcomes, VerificationSessionStore, VerificationWizard,
    WizardSettings,
};
use ev_core::access::{RouteTarget, SessionValidityPolicy};
use ev_core::camera::{CameraConfig, CameraDevice, CameraError, CameraState, CapturedPhoto, CountdownTick};
use ev_core::ids::{NationalId, VerificationSessionId, VoterId};
use ev_core::ports::{
    CameraPort, ClockPort, FaceMatchError, FaceMatchPort, KeyValueStorePort, NavigatorPort,
    ServiceHealth, VoterCheckResponse, VoterRegistryError, VoterRegistryPort,
};
use ev_core::storage_keys;
use ev_core::verification::{ImageFile, VerificationResult, VerificationStatus};
use ev_infra::InMemoryKeyValueStore;
use mockall::mock;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

pub const NATIONAL_ID: &str = "12345678901234";

static TRACE_INIT: Once = Once::new();

pub fn init_tracing() {
    TRACE_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// 2024-05-01T10:00:00Z
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

pub struct FixedClock {
    now_ms: AtomicI64,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now_ms: AtomicI64::new(now.timestamp_millis()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl ClockPort for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<RouteTarget>>,
}

impl RecordingNavigator {
    pub fn urls(&self) -> Vec<String> {
        self.routes
            .lock()
            .unwrap()
            .iter()
            .map(RouteTarget::to_url)
            .collect()
    }
}

impl NavigatorPort for RecordingNavigator {
    fn navigate(&self, target: RouteTarget) {
        self.routes.lock().unwrap().push(target);
    }
}

/// Camera that always works and captures a fixed JPEG.
pub struct FakeCamera {
    active: AtomicBool,
    acquired: AtomicUsize,
    state: watch::Sender<CameraState>,
}

impl Default for FakeCamera {
    fn default() -> Self {
        Self {
            active: AtomicBool::new(false),
            acquired: AtomicUsize::new(0),
            state: watch::channel(CameraState::default()).0,
        }
    }
}

impl FakeCamera {
    pub fn acquire_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    fn photo() -> CapturedPhoto {
        CapturedPhoto {
            data: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]),
            width: 1280,
            height: 720,
            captured_at: base_time(),
        }
    }
}

#[async_trait]
impl CameraPort for FakeCamera {
    fn is_supported(&self) -> bool {
        true
    }

    async fn acquire(&self, _config: Option<CameraConfig>) -> Result<(), CameraError> {
        self.active.store(true, Ordering::SeqCst);
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.is_active = true;
            s.is_streaming = true;
            s.has_permission = true;
        });
        Ok(())
    }

    async fn release(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.is_active = false;
            s.is_streaming = false;
        });
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn capture_frame(&self) -> Result<CapturedPhoto, CameraError> {
        Ok(Self::photo())
    }

    fn capture_with_countdown(
        &self,
        seconds: u32,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<Result<CountdownTick, CameraError>> {
        let (tx, rx) = mpsc::channel(seconds as usize + 1);
        tokio::spawn(async move {
            for remaining in (1..=seconds).rev() {
                if cancel.is_cancelled() {
                    return;
                }
                let _ = tx
                    .send(Ok(CountdownTick {
                        remaining,
                        photo: None,
                    }))
                    .await;
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
            if cancel.is_cancelled() {
                return;
            }
            let _ = tx
                .send(Ok(CountdownTick {
                    remaining: 0,
                    photo: Some(Self::photo()),
                }))
                .await;
        });
        rx
    }

    async fn list_devices(&self) -> Result<Vec<CameraDevice>, CameraError> {
        Ok(vec![CameraDevice::new("fake-camera", Some("Fake Camera"))])
    }

    async fn switch_camera(&self) -> Result<(), CameraError> {
        Ok(())
    }

    async fn check_camera_status(&self) -> bool {
        true
    }

    fn state(&self) -> CameraState {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<CameraState> {
        self.state.subscribe()
    }
}

mock! {
    pub FaceMatch {}

    #[async_trait]
    impl FaceMatchPort for FaceMatch {
        async fn verify(
            &self,
            id_card: &ImageFile,
            face: &ImageFile,
        ) -> Result<VerificationResult, FaceMatchError>;
        async fn check_health(&self) -> ServiceHealth;
    }
}

mock! {
    pub Registry {}

    #[async_trait]
    impl VoterRegistryPort for Registry {
        async fn check_voter(
            &self,
            national_id: &NationalId,
        ) -> Result<VoterCheckResponse, VoterRegistryError>;
    }
}

pub fn face_match_returning(result: VerificationResult) -> MockFaceMatch {
    let mut face_match = MockFaceMatch::new();
    face_match
        .expect_verify()
        .times(1)
        .returning(move |_, _| Ok(result.clone()));
    face_match
}

pub fn jpeg(len: usize) -> Bytes {
    Bytes::from(vec![0xAB; len])
}

pub fn checkpoint(verified: bool, match_percentage: f64, at: DateTime<Utc>) -> VerificationStatus {
    VerificationStatus {
        national_id: NATIONAL_ID.to_string(),
        voter_id: VoterId(7),
        verified,
        match_percentage,
        verification_result: Some(VerificationResult::remote(
            verified,
            Some(match_percentage),
            None,
            at,
        )),
        verification_time: at,
        session_id: VerificationSessionId::generate(at.timestamp_millis()),
    }
}

/// Session store plus everything around it, backed by in-memory storage.
/// The store starts empty; call `restore` to pick up seeded data.
pub struct Harness {
    pub session_storage: Arc<InMemoryKeyValueStore>,
    pub durable_storage: Arc<InMemoryKeyValueStore>,
    pub clock: Arc<FixedClock>,
    pub navigator: Arc<RecordingNavigator>,
    pub camera: Arc<FakeCamera>,
    pub store: Arc<VerificationSessionStore>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_storage(InMemoryKeyValueStore::new(), InMemoryKeyValueStore::new()).await
    }

    /// Kiosk that already passed the voter check for [`NATIONAL_ID`].
    pub async fn checked_in() -> Self {
        Self::with_storage(
            InMemoryKeyValueStore::with_entries([
                (storage_keys::NATIONAL_ID, NATIONAL_ID),
                (storage_keys::VOTER_ID, "7"),
            ]),
            InMemoryKeyValueStore::new(),
        )
        .await
    }

    pub async fn with_storage(
        session_storage: InMemoryKeyValueStore,
        durable_storage: InMemoryKeyValueStore,
    ) -> Self {
        init_tracing();
        let session_storage = Arc::new(session_storage);
        let durable_storage = Arc::new(durable_storage);
        let clock = Arc::new(FixedClock::at(base_time()));
        let store = Arc::new(VerificationSessionStore::new(
            session_storage.clone(),
            durable_storage.clone(),
            clock.clone(),
            VerificationStatus::default_window(),
        ));
        Self {
            session_storage,
            durable_storage,
            clock,
            navigator: Arc::new(RecordingNavigator::default()),
            camera: Arc::new(FakeCamera::default()),
            store,
        }
    }

    /// Same storage and clock with a fresh store, camera and navigator, as
    /// after a page reload. The store restores what was persisted.
    pub async fn reload(&self) -> Self {
        let store = Arc::new(VerificationSessionStore::new(
            self.session_storage.clone(),
            self.durable_storage.clone(),
            self.clock.clone(),
            VerificationStatus::default_window(),
        ));
        store.restore().await;
        Self {
            session_storage: self.session_storage.clone(),
            durable_storage: self.durable_storage.clone(),
            clock: self.clock.clone(),
            navigator: Arc::new(RecordingNavigator::default()),
            camera: Arc::new(FakeCamera::default()),
            store,
        }
    }

    pub async fn seed_checkpoint(&self, status: &VerificationStatus) {
        self.durable_storage
            .set(
                storage_keys::USER_VERIFICATION_STATUS,
                &serde_json::to_string(status).unwrap(),
            )
            .await
            .unwrap();
    }

    pub fn wizard(&self, face_match: MockFaceMatch) -> VerificationWizard {
        VerificationWizard::new(
            self.store.clone(),
            self.camera.clone(),
            Arc::new(face_match),
            self.navigator.clone(),
            self.clock.clone(),
            WizardSettings::default(),
        )
    }

    pub fn check_voter(&self, registry: MockRegistry) -> CheckVoter {
        CheckVoter::new(
            Arc::new(registry),
            self.session_storage.clone(),
            self.store.clone(),
        )
    }

    pub fn guard(&self, policy: SessionValidityPolicy) -> RouteGuard {
        RouteGuard::new(
            self.session_storage.clone(),
            self.durable_storage.clone(),
            self.clock.clone(),
            policy,
        )
    }

    pub fn outcomes(&self) -> VerificationOutcomes {
        VerificationOutcomes::new(
            self.store.clone(),
            self.session_storage.clone(),
            self.navigator.clone(),
            self.clock.clone(),
        )
    }
}

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use ev_core::camera::{
    CameraConfig, CameraDevice, CameraError, CameraErrorKind, CameraState, CapturedPhoto,
    CountdownTick,
};
use ev_core::ports::CameraPort;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::encoder::JpegFrameEncoder;
use crate::ports::{BackendError, MediaDeviceKind, MediaDevicesPort, MediaStreamPort};

/// Delay between checks for the stream's first frame.
pub const FRAME_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Checks before a capture gives up on a stream that never produces a frame.
pub const MAX_FRAME_POLLS: u32 = 50;

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// `CameraPort` over a `MediaDevicesPort` backend.
///
/// Owns at most one live stream. Acquiring again stops the previous stream
/// before the new one is stored, and dropping the last handle stops
/// whatever is still open.
///
/// 摄像头适配器：全局只持有一个活动流。
#[derive(Clone)]
pub struct CameraAdapter {
    inner: Arc<CameraInner>,
}

struct CameraInner {
    backend: Arc<dyn MediaDevicesPort>,
    default_config: CameraConfig,
    encoder: JpegFrameEncoder,
    stream: Mutex<Option<Box<dyn MediaStreamPort>>>,
    state: watch::Sender<CameraState>,
}

impl CameraAdapter {
    pub fn new(backend: Arc<dyn MediaDevicesPort>, default_config: CameraConfig) -> Self {
        Self::with_encoder(backend, default_config, JpegFrameEncoder::default())
    }

    pub fn with_encoder(
        backend: Arc<dyn MediaDevicesPort>,
        default_config: CameraConfig,
        encoder: JpegFrameEncoder,
    ) -> Self {
        let (state, _) = watch::channel(CameraState::default());
        Self {
            inner: Arc::new(CameraInner {
                backend,
                default_config,
                encoder,
                stream: Mutex::new(None),
                state,
            }),
        }
    }
}

fn backend_error(err: BackendError) -> CameraError {
    CameraError::from_backend(&err.name, err.message)
}

impl CameraInner {
    fn lock_stream(&self) -> MutexGuard<'_, Option<Box<dyn MediaStreamPort>>> {
        self.stream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stop and drop the current stream. Returns whether one was open.
    fn release_stream(&self) -> bool {
        let previous = self.lock_stream().take();
        match previous {
            Some(stream) => {
                stream.stop();
                true
            }
            None => false,
        }
    }

    fn is_active(&self) -> bool {
        self.lock_stream().as_ref().is_some_and(|s| s.is_live())
    }

    fn record_failure(&self, err: &CameraError) {
        let message = err.user_message().to_string();
        let denied = err.is_permission();
        self.state.send_modify(|state| {
            state.is_active = false;
            state.is_streaming = false;
            if denied {
                state.has_permission = false;
            }
            state.error = Some(message);
        });
    }

    async fn video_inputs(&self) -> Result<Vec<CameraDevice>, CameraError> {
        let devices = self
            .backend
            .enumerate_devices()
            .await
            .map_err(backend_error)?;
        Ok(devices
            .into_iter()
            .filter(|d| d.kind == MediaDeviceKind::VideoInput)
            .map(|d| CameraDevice::new(d.device_id, d.label.as_deref()))
            .collect())
    }

    async fn acquire(&self, config: Option<CameraConfig>) -> Result<(), CameraError> {
        if !self.backend.is_supported() {
            let err = CameraError::new(CameraErrorKind::CameraUnavailable);
            self.record_failure(&err);
            return Err(err);
        }

        if self.release_stream() {
            debug!("released previous camera stream before acquiring");
        }

        let config = config.unwrap_or_else(|| self.default_config.clone());
        let stream = match self.backend.get_user_media(&config).await {
            Ok(stream) => stream,
            Err(err) => {
                let err = backend_error(err);
                warn!(kind = ?err.kind(), detail = %err.detail(), "failed to acquire camera");
                self.record_failure(&err);
                return Err(err);
            }
        };

        let device_id = stream.device_id().or_else(|| config.device_id.clone());
        let stream_id = stream.id().to_string();
        if let Some(raced) = self.lock_stream().replace(stream) {
            raced.stop();
        }

        // Labels are only visible once permission has been granted.
        let devices = match self.video_inputs().await {
            Ok(devices) => devices,
            Err(err) => {
                debug!(error = %err, "device enumeration failed after acquire");
                Vec::new()
            }
        };
        let current = device_id.map(|id| {
            devices
                .iter()
                .find(|d| d.device_id == id)
                .cloned()
                .unwrap_or_else(|| CameraDevice::new(id, None))
        });

        info!(
            stream_id = %stream_id,
            device = current.as_ref().map(|d| d.label.as_str()).unwrap_or("default"),
            width = config.width,
            height = config.height,
            "camera stream acquired"
        );

        self.state.send_modify(|state| {
            state.is_active = true;
            state.is_streaming = true;
            state.has_permission = true;
            state.current_device = current;
            state.available_devices = devices;
            state.error = None;
        });
        Ok(())
    }

    fn release(&self) {
        if self.release_stream() {
            info!("camera stream released");
        }
        self.state.send_modify(|state| {
            state.is_active = false;
            state.is_streaming = false;
            state.current_device = None;
        });
    }

    async fn capture_frame(&self) -> Result<CapturedPhoto, CameraError> {
        let mut polls = 0u32;
        loop {
            let (width, height) = {
                let guard = self.lock_stream();
                match guard.as_ref() {
                    Some(stream) if stream.is_live() => stream.video_dimensions(),
                    _ => return Err(CameraError::new(CameraErrorKind::NotActive)),
                }
            };
            if width > 0 && height > 0 {
                break;
            }
            polls += 1;
            if polls >= MAX_FRAME_POLLS {
                return Err(CameraError::with_detail(
                    CameraErrorKind::CaptureFailed,
                    "video stream never reported its dimensions",
                ));
            }
            tokio::time::sleep(FRAME_POLL_INTERVAL).await;
        }

        let frame = {
            let guard = self.lock_stream();
            match guard.as_ref() {
                Some(stream) => stream.read_frame().map_err(|e| {
                    CameraError::with_detail(CameraErrorKind::CaptureFailed, e.to_string())
                })?,
                None => return Err(CameraError::new(CameraErrorKind::NotActive)),
            }
        };

        let (width, height) = (frame.width, frame.height);
        let encoder = self.encoder;
        let jpeg = tokio::task::spawn_blocking(move || encoder.encode(&frame))
            .await
            .map_err(|e| CameraError::with_detail(CameraErrorKind::CaptureFailed, e.to_string()))?
            .map_err(|e| {
                CameraError::with_detail(CameraErrorKind::CaptureFailed, format!("{e:#}"))
            })?;
        if jpeg.is_empty() {
            return Err(CameraError::with_detail(
                CameraErrorKind::CaptureFailed,
                "encoder produced no data",
            ));
        }

        debug!(width, height, bytes = jpeg.len(), "frame captured");
        Ok(CapturedPhoto {
            data: Bytes::from(jpeg),
            width,
            height,
            captured_at: Utc::now(),
        })
    }

    async fn run_countdown(
        &self,
        seconds: u32,
        cancel: CancellationToken,
        tx: mpsc::Sender<Result<CountdownTick, CameraError>>,
    ) {
        for remaining in (1..=seconds).rev() {
            if cancel.is_cancelled() {
                return;
            }
            let tick = CountdownTick {
                remaining,
                photo: None,
            };
            if tx.send(Ok(tick)).await.is_err() {
                debug!(remaining, "countdown receiver dropped");
                return;
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(remaining, "countdown cancelled");
                    return;
                }
                _ = tx.closed() => {
                    debug!(remaining, "countdown receiver dropped");
                    return;
                }
                _ = tokio::time::sleep(COUNTDOWN_TICK) => {}
            }
        }

        if cancel.is_cancelled() || tx.is_closed() {
            return;
        }

        let tick = self.capture_frame().await.map(|photo| CountdownTick {
            remaining: 0,
            photo: Some(photo),
        });
        let _ = tx.send(tick).await;
    }
}

impl Drop for CameraInner {
    fn drop(&mut self) {
        if self.release_stream() {
            debug!("camera stream stopped on drop");
        }
    }
}

#[async_trait]
impl CameraPort for CameraAdapter {
    fn is_supported(&self) -> bool {
        self.inner.backend.is_supported()
    }

    async fn acquire(&self, config: Option<CameraConfig>) -> Result<(), CameraError> {
        self.inner.acquire(config).await
    }

    async fn release(&self) {
        self.inner.release();
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    async fn capture_frame(&self) -> Result<CapturedPhoto, CameraError> {
        self.inner.capture_frame().await
    }

    fn capture_with_countdown(
        &self,
        seconds: u32,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<Result<CountdownTick, CameraError>> {
        let (tx, rx) = mpsc::channel(seconds as usize + 1);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_countdown(seconds, cancel, tx).await;
        });
        rx
    }

    async fn list_devices(&self) -> Result<Vec<CameraDevice>, CameraError> {
        let devices = self.inner.video_inputs().await?;
        let snapshot = devices.clone();
        self.inner.state.send_modify(|state| {
            state.available_devices = snapshot;
        });
        Ok(devices)
    }

    async fn switch_camera(&self) -> Result<(), CameraError> {
        let devices = self.list_devices().await?;
        if devices.is_empty() {
            return Err(CameraError::new(CameraErrorKind::CameraUnavailable));
        }

        let current = self
            .inner
            .state
            .borrow()
            .current_device
            .as_ref()
            .map(|d| d.device_id.clone());
        let next = current
            .and_then(|id| devices.iter().position(|d| d.device_id == id))
            .map(|idx| (idx + 1) % devices.len())
            .unwrap_or(0);

        info!(device = %devices[next].label, "switching camera");
        let config = self
            .inner
            .default_config
            .clone()
            .with_device(devices[next].device_id.clone());
        self.inner.acquire(Some(config)).await
    }

    async fn check_camera_status(&self) -> bool {
        if !self.inner.backend.is_supported() {
            return false;
        }
        if self.inner.is_active() {
            return true;
        }
        match self.inner.backend.get_user_media(&CameraConfig::probe()).await {
            Ok(probe) => {
                probe.stop();
                self.inner.state.send_modify(|state| state.has_permission = true);
                true
            }
            Err(err) => {
                let err = backend_error(err);
                debug!(kind = ?err.kind(), "camera probe failed");
                if err.is_permission() {
                    self.inner.state.send_modify(|state| state.has_permission = false);
                }
                false
            }
        }
    }

    fn state(&self) -> CameraState {
        self.inner.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<CameraState> {
        self.inner.state.subscribe()
    }
}

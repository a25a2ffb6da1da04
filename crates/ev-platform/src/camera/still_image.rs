use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ev_core::camera::CameraConfig;

use crate::ports::{
    BackendError, MediaDeviceInfo, MediaDeviceKind, MediaDevicesPort, MediaStreamPort, RawFrame,
};

pub const STILL_IMAGE_DEVICE_ID: &str = "still-image";

/// Capture backend that serves one image file as a single-device camera.
/// Used on kiosks without a webcam driver and in end-to-end runs.
pub struct StillImageMediaDevices {
    path: PathBuf,
}

impl StillImageMediaDevices {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_frame(&self) -> Result<RawFrame, BackendError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            let name = match e.kind() {
                std::io::ErrorKind::NotFound => "NotFoundError",
                std::io::ErrorKind::PermissionDenied => "NotAllowedError",
                _ => "NotReadableError",
            };
            BackendError::new(name, format!("read {}: {e}", self.path.display()))
        })?;

        let image = image::load_from_memory(&bytes).map_err(|e| {
            BackendError::new(
                "NotReadableError",
                format!("decode {}: {e}", self.path.display()),
            )
        })?;
        let rgba = image.to_rgba8();
        Ok(RawFrame {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        })
    }

    fn label(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("Still image ({name})")
    }
}

#[async_trait]
impl MediaDevicesPort for StillImageMediaDevices {
    fn is_supported(&self) -> bool {
        true
    }

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, BackendError> {
        if tokio::fs::metadata(&self.path).await.is_err() {
            return Ok(Vec::new());
        }
        Ok(vec![MediaDeviceInfo {
            device_id: STILL_IMAGE_DEVICE_ID.to_string(),
            label: Some(self.label()),
            kind: MediaDeviceKind::VideoInput,
        }])
    }

    async fn get_user_media(
        &self,
        constraints: &CameraConfig,
    ) -> Result<Box<dyn MediaStreamPort>, BackendError> {
        if let Some(requested) = constraints.device_id.as_deref() {
            if requested != STILL_IMAGE_DEVICE_ID {
                return Err(BackendError::new(
                    "OverconstrainedError",
                    format!("unknown device {requested}"),
                ));
            }
        }

        let frame = self.load_frame().await?;
        Ok(Box::new(StillImageStream {
            id: uuid::Uuid::new_v4().to_string(),
            frame,
            live: AtomicBool::new(true),
        }))
    }
}

struct StillImageStream {
    id: String,
    frame: RawFrame,
    live: AtomicBool,
}

impl MediaStreamPort for StillImageStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn device_id(&self) -> Option<String> {
        Some(STILL_IMAGE_DEVICE_ID.to_string())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn video_dimensions(&self) -> (u32, u32) {
        if self.is_live() {
            (self.frame.width, self.frame.height)
        } else {
            (0, 0)
        }
    }

    fn read_frame(&self) -> Result<RawFrame, BackendError> {
        if !self.is_live() {
            return Err(BackendError::new("InvalidStateError", "stream stopped"));
        }
        Ok(self.frame.clone())
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

use async_trait::async_trait;
use ev_core::camera::CameraConfig;
use thiserror::Error;

/// Error raised by a capture backend, identified by its name
/// (`NotAllowedError`, `NotFoundError`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {message}")]
pub struct BackendError {
    pub name: String,
    pub message: String,
}

impl BackendError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    /// Hidden by some backends until permission is granted.
    pub label: Option<String>,
    pub kind: MediaDeviceKind,
}

/// One decoded video frame, RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// A live capture stream.
pub trait MediaStreamPort: Send + Sync {
    fn id(&self) -> &str;

    fn device_id(&self) -> Option<String>;

    fn is_live(&self) -> bool;

    /// `(0, 0)` until the first frame is available.
    fn video_dimensions(&self) -> (u32, u32);

    fn read_frame(&self) -> Result<RawFrame, BackendError>;

    /// Stop every track. Idempotent.
    fn stop(&self);
}

#[async_trait]
pub trait MediaDevicesPort: Send + Sync {
    fn is_supported(&self) -> bool;

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, BackendError>;

    /// Open a video-only stream. Constraint values are ideals.
    async fn get_user_media(
        &self,
        constraints: &CameraConfig,
    ) -> Result<Box<dyn MediaStreamPort>, BackendError>;
}

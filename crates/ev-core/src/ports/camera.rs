use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::camera::{CameraConfig, CameraDevice, CameraError, CameraState, CapturedPhoto, CountdownTick};

/// Exclusive owner of the single live capture stream.
#[async_trait]
pub trait CameraPort: Send + Sync {
    /// Whether a capture backend exists at all.
    fn is_supported(&self) -> bool;

    /// Open a video-only stream. Any previous stream is released first.
    /// `None` uses the configured defaults.
    async fn acquire(&self, config: Option<CameraConfig>) -> Result<(), CameraError>;

    /// Stop every track of the current stream. Idempotent.
    async fn release(&self);

    fn is_active(&self) -> bool;

    /// Grab one frame as JPEG once the stream reports its dimensions.
    async fn capture_frame(&self) -> Result<CapturedPhoto, CameraError>;

    /// Count down `seconds … 1`, then emit a final tick carrying the photo.
    /// Cancelling `cancel` or dropping the receiver before zero captures
    /// nothing.
    fn capture_with_countdown(
        &self,
        seconds: u32,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<Result<CountdownTick, CameraError>>;

    /// Video inputs only.
    async fn list_devices(&self) -> Result<Vec<CameraDevice>, CameraError>;

    /// Re-acquire on the next available device.
    async fn switch_camera(&self) -> Result<(), CameraError>;

    /// Acquire a small probe stream and release it again.
    async fn check_camera_status(&self) -> bool;

    fn state(&self) -> CameraState;

    fn subscribe(&self) -> watch::Receiver<CameraState>;
}

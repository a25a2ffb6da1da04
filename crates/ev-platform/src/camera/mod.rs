mod adapter;
mod encoder;
mod still_image;

pub use adapter::{CameraAdapter, FRAME_POLL_INTERVAL, MAX_FRAME_POLLS};
pub use encoder::{JpegFrameEncoder, CAPTURE_JPEG_QUALITY};
pub use still_image::StillImageMediaDevices;

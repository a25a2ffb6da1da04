//! # ev-platform
//!
//! Platform-specific implementations for the evote verification kiosk.
//!
//! This crate contains the adapters that touch hardware and the operating
//! system: the camera and the application directories.

pub mod app_dirs;
pub mod camera;
pub mod ports;

pub use app_dirs::DirsAppDirsAdapter;
pub use camera::{CameraAdapter, JpegFrameEncoder, StillImageMediaDevices};

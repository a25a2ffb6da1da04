//! Camera vocabulary shared by the capture adapter and the wizard.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::verification::ImageFile;

/// File name given to captured selfies.
pub const CAPTURED_SELFIE_NAME: &str = "selfie.jpg";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

impl FacingMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "environment" => Some(Self::Environment),
            _ => None,
        }
    }
}

/// Ideal stream constraints. Backends treat every field as a preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub facing_mode: FacingMode,
    /// Pin a specific device instead of letting the backend choose.
    #[serde(default)]
    pub device_id: Option<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: 30,
            facing_mode: FacingMode::User,
            device_id: None,
        }
    }
}

impl CameraConfig {
    /// Lightweight profile used to probe whether a camera works at all.
    pub fn probe() -> Self {
        Self {
            width: 640,
            height: 480,
            ..Self::default()
        }
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDevice {
    pub device_id: String,
    pub label: String,
}

impl CameraDevice {
    /// Backends may hide labels until permission is granted; fall back to
    /// a name derived from the device id.
    pub fn new(device_id: impl Into<String>, label: Option<&str>) -> Self {
        let device_id = device_id.into();
        let label = match label {
            Some(l) if !l.trim().is_empty() => l.to_string(),
            _ => format!("Camera {}", device_id.chars().take(5).collect::<String>()),
        };
        Self { device_id, label }
    }
}

/// Observable camera state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraState {
    pub is_active: bool,
    pub is_streaming: bool,
    pub has_permission: bool,
    pub current_device: Option<CameraDevice>,
    pub available_devices: Vec<CameraDevice>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraErrorKind {
    PermissionDenied,
    CameraUnavailable,
    DeviceBusy,
    ConstraintError,
    Aborted,
    NotActive,
    CaptureFailed,
    Unknown,
}

impl CameraErrorKind {
    /// Map a capture backend error name onto a kind.
    pub fn from_backend_name(name: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
                Self::PermissionDenied
            }
            "NotFoundError" | "DevicesNotFoundError" => Self::CameraUnavailable,
            "NotReadableError" | "TrackStartError" => Self::DeviceBusy,
            "OverconstrainedError" | "TypeError" => Self::ConstraintError,
            "AbortError" => Self::Aborted,
            _ => Self::Unknown,
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Camera access denied. Please allow camera permissions and try again."
            }
            Self::CameraUnavailable => {
                "No camera found. Please connect a camera or use photo upload."
            }
            Self::DeviceBusy => "Camera is already in use by another application.",
            Self::ConstraintError => "Unable to start camera with requested constraints.",
            Self::Aborted => "Camera operation was aborted.",
            Self::NotActive => "Camera is not active. Please start the camera first.",
            Self::CaptureFailed => "Failed to capture image. Please try again.",
            Self::Unknown => "Unable to access camera. Please try again or use photo upload.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {detail}")]
pub struct CameraError {
    kind: CameraErrorKind,
    detail: String,
}

impl CameraError {
    pub fn new(kind: CameraErrorKind) -> Self {
        Self {
            kind,
            detail: kind.user_message().to_string(),
        }
    }

    pub fn with_detail(kind: CameraErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Build from a backend error name and its raw message.
    pub fn from_backend(name: &str, message: impl Into<String>) -> Self {
        Self::with_detail(CameraErrorKind::from_backend_name(name), message)
    }

    pub fn kind(&self) -> CameraErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn is_permission(&self) -> bool {
        self.kind == CameraErrorKind::PermissionDenied
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

/// A still frame encoded as JPEG.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPhoto {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl CapturedPhoto {
    pub const MIME_TYPE: &'static str = "image/jpeg";

    pub fn into_image_file(self, name: &str) -> ImageFile {
        ImageFile::new(name, Self::MIME_TYPE, self.data, self.captured_at)
    }
}

/// One countdown event. The final tick has `remaining == 0` and carries the
/// photo.
#[derive(Debug, Clone, PartialEq)]
pub struct CountdownTick {
    pub remaining: u32,
    pub photo: Option<CapturedPhoto>,
}

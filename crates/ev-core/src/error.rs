//! Closed error taxonomy for the verification workflow.
//!
//! Every failure the workflow surfaces to the kiosk UI is one of these kinds.
//! None of them is fatal to the page; the worst outcome is a redirect back to
//! an earlier step with the attached message.

use thiserror::Error;

use crate::camera::CameraError;
use crate::ids::NationalIdError;
use crate::verification::ImageValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Permission,
    Device,
    Network,
    Timeout,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerificationError {
    #[error("validation failed: {message}")]
    Validation { field: &'static str, message: String },

    #[error("permission denied: {message}")]
    Permission { message: String },

    #[error("device error: {message}")]
    Device { message: String },

    #[error("network error: {message}")]
    Network { endpoint: String, message: String },

    #[error("request to {endpoint} timed out after {after_secs}s")]
    Timeout { endpoint: String, after_secs: u64 },

    #[error("storage error for key {key}: {message}")]
    Storage { key: String, message: String },
}

impl VerificationError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn storage(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Storage {
            key: key.into(),
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Permission { .. } => ErrorKind::Permission,
            Self::Device { .. } => ErrorKind::Device,
            Self::Network { .. } => ErrorKind::Network,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Text shown in the inline banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::Permission { message } | Self::Device { message } => message.clone(),
            Self::Network { .. } => "Verification service is currently unavailable".to_string(),
            Self::Timeout { .. } => {
                "The verification service took too long to respond. Please try again.".to_string()
            }
            Self::Storage { .. } => "Unable to save your progress. Please try again.".to_string(),
        }
    }
}

impl From<ImageValidationError> for VerificationError {
    fn from(err: ImageValidationError) -> Self {
        Self::validation("image", err.user_message())
    }
}

impl From<NationalIdError> for VerificationError {
    fn from(err: NationalIdError) -> Self {
        Self::validation("nationalId", err.user_message())
    }
}

impl From<CameraError> for VerificationError {
    fn from(err: CameraError) -> Self {
        if err.is_permission() {
            Self::Permission {
                message: err.user_message().to_string(),
            }
        } else {
            Self::Device {
                message: err.user_message().to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraErrorKind;

    #[test]
    fn test_camera_permission_maps_to_permission_kind() {
        let err: VerificationError = CameraError::new(CameraErrorKind::PermissionDenied).into();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn test_camera_busy_maps_to_device_kind() {
        let err: VerificationError = CameraError::new(CameraErrorKind::DeviceBusy).into();
        assert_eq!(err.kind(), ErrorKind::Device);
        assert_eq!(
            err.user_message(),
            "Camera is already in use by another application."
        );
    }

    #[test]
    fn test_image_validation_keeps_message() {
        let err: VerificationError = ImageValidationError::TooLarge {
            size: 10,
            max: 5,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.user_message(), "File size too large. Maximum 5MB");
    }
}

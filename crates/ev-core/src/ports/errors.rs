use thiserror::Error;

use crate::error::VerificationError;

#[derive(Debug, Error)]
pub enum AppDirsError {
    #[error("system data directory unavailable")]
    DataLocalDirUnavailable,

    #[error("platform error: {0}")]
    Platform(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaceMatchError {
    #[error("face-match request timed out after {after_secs}s")]
    Timeout { after_secs: u64 },

    #[error("face-match service unreachable: {0}")]
    Network(String),

    #[error("face-match service returned status {status}")]
    Status { status: u16, body: String },

    #[error("failed to read face-match response: {0}")]
    Body(String),

    #[error("invalid face-match request: {0}")]
    InvalidRequest(String),
}

impl FaceMatchError {
    pub fn to_verification_error(&self, endpoint: &str) -> VerificationError {
        match self {
            Self::Timeout { after_secs } => VerificationError::Timeout {
                endpoint: endpoint.to_string(),
                after_secs: *after_secs,
            },
            Self::InvalidRequest(message) => VerificationError::validation("image", message.clone()),
            other => VerificationError::Network {
                endpoint: endpoint.to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoterRegistryError {
    #[error("voter registry request timed out after {after_secs}s")]
    Timeout { after_secs: u64 },

    #[error("voter registry unreachable: {0}")]
    Network(String),

    /// Non-2xx answer. `message` is the server's explanation when it sent one.
    #[error("voter registry returned status {status}")]
    Status { status: u16, message: Option<String> },

    #[error("invalid voter registry response: {0}")]
    InvalidResponse(String),
}

impl VoterRegistryError {
    /// Server-provided text when available, else a generic message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            Self::Timeout { .. } => "The request timed out. Please try again.".to_string(),
            _ => "Error checking National ID. Please try again.".to_string(),
        }
    }
}

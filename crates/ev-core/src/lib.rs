//! # ev-core
//!
//! Core domain models and business rules for the evote identity verification kiosk.
//!
//! This crate contains pure business logic without any infrastructure dependencies.

// Public module exports
pub mod access;
pub mod app_dirs;
pub mod camera;
pub mod config;
pub mod error;
pub mod ids;
pub mod ports;
pub mod storage_keys;
pub mod verification;

// Re-export commonly used types at the crate root
pub use app_dirs::AppDirs;
pub use config::AppConfig;
pub use error::{ErrorKind, VerificationError};
pub use ids::{NationalId, VerificationSessionId, VoterId};
pub use verification::{
    ImageFile, ImageRef, VerificationResult, VerificationSession, VerificationSource,
    VerificationStatus, VerificationStep,
};

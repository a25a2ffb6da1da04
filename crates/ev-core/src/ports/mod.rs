//! Port interfaces for the application layer
//!
//! Ports define the contract between the verification use cases and the
//! infrastructure/platform implementations (HTTP clients, storage, camera).

pub mod app_dirs;
pub mod camera;
mod clock;
pub mod errors;
pub mod face_match;
pub mod navigation;
pub mod storage;
pub mod voter_registry;

pub use app_dirs::AppDirsPort;
pub use camera::CameraPort;
pub use clock::*;
pub use errors::{AppDirsError, FaceMatchError, VoterRegistryError};
pub use face_match::{FaceMatchPort, ServiceHealth};
pub use navigation::NavigatorPort;
pub use storage::KeyValueStorePort;
pub use voter_registry::{VoterCheckResponse, VoterRegistryPort};

pub mod face_match;
pub mod storage;
pub mod time;
pub mod voter;

pub use face_match::{FallbackFaceMatcher, HttpFaceMatchClient, SimulatedFaceMatcher};
pub use storage::{FileKeyValueStore, InMemoryKeyValueStore};
pub use time::SystemClock;
pub use voter::HttpVoterRegistry;

//! Face-match adapters.
//!
//! [`HttpFaceMatchClient`] talks to the remote service,
//! [`SimulatedFaceMatcher`] produces a local randomized outcome, and
//! [`FallbackFaceMatcher`] combines the two for degraded operation.

mod fallback;
mod http;
mod simulated;

pub use fallback::FallbackFaceMatcher;
pub use http::{HttpFaceMatchClient, HEALTH_PATH, VERIFY_PATH};
pub use simulated::SimulatedFaceMatcher;

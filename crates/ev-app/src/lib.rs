//! evote kiosk application orchestration layer
//!
//! Use cases of the identity-verification flow: the session store, voter
//! check, wizard orchestrator, route guards and outcome pages.

pub mod app_paths;
pub mod deps;
pub mod usecases;

pub use app_paths::AppPaths;
pub use deps::AppDeps;

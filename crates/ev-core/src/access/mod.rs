//! Route gating.
//!
//! Pure decision functions evaluated before entering protected routes. They
//! read already-loaded storage values and return a [`RouteDecision`]; the
//! app layer performs the storage reads, clears and redirects.

pub mod auth;
pub mod evidence;
pub mod guard;
pub mod route;

pub use auth::{evaluate_admin_guard, evaluate_voter_guard, ADMIN_ROLE};
pub use evidence::VerificationEvidence;
pub use guard::{evaluate_verification_guard, MissingTimestampPolicy, SessionValidityPolicy};
pub use route::{AppRoute, RouteDecision, RouteTarget};

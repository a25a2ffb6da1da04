//! Storage keys shared by the verification store, the voter check and the
//! route guards.
//!
//! Session-scoped keys live for one kiosk session; durable keys survive
//! restarts.

/// Plain national ID string (session).
pub const NATIONAL_ID: &str = "nationalId";
/// Serialized live verification session (session).
pub const FACE_VERIFICATION_DATA: &str = "face_verification_data";
/// Reduced session projection without images (durable).
pub const VERIFICATION_SESSION: &str = "verification_session";
/// Verification checkpoint keyed by national ID (durable).
pub const USER_VERIFICATION_STATUS: &str = "user_verification_status";

/// Auth/session flags owned by the login flow (session).
pub const VOTER_ID: &str = "voterId";
pub const ROLE: &str = "role";
pub const IS_LOGGED_IN: &str = "isLoggedIn";
pub const JWT_TOKEN: &str = "jwtToken";

/// Session keys removed when a verified session expires.
pub const SESSION_VERIFICATION_KEYS: &[&str] = &[NATIONAL_ID, FACE_VERIFICATION_DATA, VOTER_ID];

/// Durable keys removed when a verified session expires.
pub const DURABLE_VERIFICATION_KEYS: &[&str] = &[VERIFICATION_SESSION, USER_VERIFICATION_STATUS];

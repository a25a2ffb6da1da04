//! ID type wrappers for type safety.

mod id_macro;
pub mod national_id;
pub mod session_id;
pub mod voter_id;

pub use national_id::{NationalId, NationalIdError};
pub use session_id::VerificationSessionId;
pub use voter_id::VoterId;

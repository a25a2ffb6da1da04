mod http;

pub use http::{HttpVoterRegistry, CHECK_VOTER_PATH};

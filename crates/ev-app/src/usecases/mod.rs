pub mod check_voter;
pub mod outcome;
pub mod route_guard;
pub mod session_store;
pub mod wizard;

pub use check_voter::{CheckVoter, CheckVoterError, VoterCheckOutcome, DEFAULT_REJECTION_MESSAGE};
pub use outcome::{
    FailureDetail, FailureReason, FailureSummary, RedirectCountdown, SuccessSummary,
    VerificationOutcomes, COMMON_SOLUTIONS, FAILURE_REDIRECT_SECS, SUCCESS_REDIRECT_SECS,
};
pub use route_guard::RouteGuard;
pub use session_store::VerificationSessionStore;
pub use wizard::{
    Banner, BannerKind, VerificationWizard, WizardError, WizardSettings, WizardView,
};

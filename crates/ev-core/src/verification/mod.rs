//! Identity verification domain: steps, images, results, checkpoints, the
//! live session and the wizard state machine.

pub mod image;
pub mod response;
pub mod result;
pub mod session;
pub mod status;
pub mod step;
pub mod wizard;

pub use image::{
    mime_from_file_name, validate_image, ImageFile, ImageRef, ImageValidationError,
    ACCEPTED_MIME_TYPES, MAX_IMAGE_BYTES,
};
pub use response::{normalize_response, FaceMatchResponse, ResponseParseError};
pub use result::{clamp_confidence, VerificationResult, VerificationSource};
pub use session::{SessionOutcome, SessionSnapshot, SessionSummary, VerificationSession};
pub use status::{VerificationStatus, VERIFICATION_WINDOW_HOURS};
pub use step::{VerificationProgress, VerificationStep, TOTAL_STEPS};
pub use wizard::{
    NavigationTarget, WizardAction, WizardEvent, WizardRejection, WizardState,
    WizardStateMachine,
};

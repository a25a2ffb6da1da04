//! Three-step verification wizard: ID card, selfie, face match.

mod context;
mod orchestrator;

pub use context::WizardContext;
pub use orchestrator::{
    Banner, BannerKind, VerificationWizard, WizardError, WizardSettings, WizardView,
};

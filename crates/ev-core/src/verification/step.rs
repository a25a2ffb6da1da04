use serde::{Deserialize, Serialize};

/// Number of tracked verification steps, `complete` included.
pub const TOTAL_STEPS: u8 = 4;

/// Verification workflow step.
///
/// Ordering follows the workflow, so `a < b` means `a` comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStep {
    IdCard,
    FaceCapture,
    Verification,
    Complete,
}

impl Default for VerificationStep {
    fn default() -> Self {
        Self::IdCard
    }
}

impl VerificationStep {
    pub const ALL: [VerificationStep; 4] = [
        Self::IdCard,
        Self::FaceCapture,
        Self::Verification,
        Self::Complete,
    ];

    /// 1-based position among the four tracked steps.
    pub fn number(self) -> u8 {
        match self {
            Self::IdCard => 1,
            Self::FaceCapture => 2,
            Self::Verification => 3,
            Self::Complete => 4,
        }
    }

    /// Position in the three-step wizard. `Complete` is shown as the
    /// verification step with a result attached.
    pub fn wizard_number(self) -> u8 {
        match self {
            Self::IdCard => 1,
            Self::FaceCapture => 2,
            Self::Verification | Self::Complete => 3,
        }
    }

    /// Inverse of [`wizard_number`](Self::wizard_number) for steps 1..=3.
    pub fn from_wizard_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::IdCard),
            2 => Some(Self::FaceCapture),
            3 => Some(Self::Verification),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::IdCard => "id-card",
            Self::FaceCapture => "face-capture",
            Self::Verification => "verification",
            Self::Complete => "complete",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::IdCard => "ID Card Upload",
            Self::FaceCapture => "Face Capture",
            Self::Verification => "Verification",
            Self::Complete => "Complete",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::IdCard => "Upload your national ID card",
            Self::FaceCapture => "Take a selfie for verification",
            Self::Verification => "Comparing your face with ID card",
            Self::Complete => "Verification completed",
        }
    }

    /// Heading shown above the wizard body.
    pub fn wizard_title(self) -> &'static str {
        match self {
            Self::IdCard => "Upload ID Card",
            Self::FaceCapture => "Capture Selfie",
            Self::Verification | Self::Complete => "Verify Faces",
        }
    }

    pub fn wizard_icon(self) -> &'static str {
        match self {
            Self::IdCard => "id-card",
            Self::FaceCapture => "camera",
            Self::Verification | Self::Complete => "user-check",
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::IdCard => Some(Self::FaceCapture),
            Self::FaceCapture => Some(Self::Verification),
            Self::Verification => Some(Self::Complete),
            Self::Complete => None,
        }
    }

    pub fn progress(self) -> VerificationProgress {
        let current = self.number();
        VerificationProgress {
            current_step: current,
            total_steps: TOTAL_STEPS,
            percentage: ((current as f64 / TOTAL_STEPS as f64) * 100.0).round() as u8,
            step_name: self.name().to_string(),
            step_description: self.description().to_string(),
        }
    }
}

impl std::fmt::Display for VerificationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress indicator derived from the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationProgress {
    pub current_step: u8,
    pub total_steps: u8,
    pub percentage: u8,
    pub step_name: String,
    pub step_description: String,
}

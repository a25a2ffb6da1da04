//! Verification wizard state machine.
//!
//! Defines a pure transition function for the three-step verification
//! wizard (ID card → selfie → face match). Side effects are returned as
//! [`WizardAction`]s and executed by the orchestrator in the app layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::step::VerificationStep;

/// Where the wizard sends the voter once a flow ends.
///
/// 流程结束后的跳转目标。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationTarget {
    /// Verification succeeded.
    ///
    /// 验证成功页。
    Success,
    /// Verification failed.
    ///
    /// 验证失败页。
    Failed,
    /// Back to the national-ID check.
    ///
    /// 返回身份证号检查页。
    Check,
}

/// Wizard view state.
///
/// 向导视图状态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    pub step: VerificationStep,
    pub has_id_card: bool,
    pub has_face: bool,
    /// A face-match call is in flight.
    ///
    /// 正在进行人脸比对。
    pub verifying: bool,
    /// A positive outcome is recorded for this voter.
    ///
    /// 已记录通过的验证结果。
    pub verified: bool,
    /// Outcome of the last attempt, if any.
    pub outcome: Option<bool>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self::initial()
    }
}

impl WizardState {
    pub fn initial() -> Self {
        Self {
            step: VerificationStep::IdCard,
            has_id_card: false,
            has_face: false,
            verifying: false,
            verified: false,
            outcome: None,
        }
    }

    /// 1..=3 as shown in the step indicator.
    pub fn wizard_number(&self) -> u8 {
        self.step.wizard_number()
    }

    pub fn is_step_complete(&self, n: u8) -> bool {
        match n {
            1 => self.has_id_card,
            2 => self.has_face,
            3 => self.outcome.is_some(),
            _ => false,
        }
    }
}

/// Events that drive the wizard.
///
/// 驱动向导的事件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardEvent {
    /// A validated ID-card image was stored.
    ///
    /// 身份证图片已通过校验并保存。
    IdCardAccepted,
    /// A validated selfie was stored.
    ///
    /// 自拍已通过校验并保存。
    FaceAccepted,
    /// User pressed "verify".
    ///
    /// 用户发起比对。
    VerifyRequested,
    /// The face-match outcome was recorded.
    ///
    /// 比对结果已记录。
    OutcomeRecorded { verified: bool },
    /// The face-match call failed and no substitute result was produced.
    ///
    /// 比对调用失败且没有替代结果。
    VerificationErrored,
    /// Discard the selfie and capture again.
    ///
    /// 重新拍摄自拍。
    RetryCapture,
    /// Start over from step 1.
    ///
    /// 从第一步重新开始。
    Restart,
    /// Jump to wizard step `1..=3`.
    ///
    /// 跳转到指定步骤。
    GoToStep { step: u8 },
    /// One step back.
    ///
    /// 返回上一步。
    GoBack,
    /// A valid positive checkpoint exists for this voter.
    ///
    /// 存在有效的已验证记录。
    RevisitVerified,
}

/// Side effects produced by transitions.
///
/// 状态迁移产生的副作用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardAction {
    StartCamera,
    StopCamera,
    InvokeFaceMatch,
    ClearFaceImage,
    ResetSession,
    /// Move the stored session to `step` outside the forward-only path.
    JumpSessionTo { step: VerificationStep },
    CancelPendingNavigation,
    NavigateAfterDelay { target: NavigationTarget },
    NavigateNow { target: NavigationTarget },
}

/// Why an event was refused. The state is left untouched.
///
/// 事件被拒绝的原因。
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum WizardRejection {
    #[error("event not allowed at step {current}")]
    WrongStep { current: VerificationStep },

    #[error("both images are required")]
    MissingImages,

    #[error("a verification is already in progress")]
    VerificationInProgress,

    #[error("no verification is pending")]
    NoVerificationPending,

    #[error("already verified")]
    AlreadyVerified,

    #[error("invalid wizard step {0}")]
    InvalidStep(u8),
}

impl WizardRejection {
    pub fn user_message(&self) -> String {
        match self {
            Self::WrongStep { current } => {
                format!("This action is not available during \"{}\"", current.wizard_title())
            }
            Self::MissingImages => "Both ID card and selfie are required".to_string(),
            Self::VerificationInProgress => "Verification is already in progress".to_string(),
            Self::NoVerificationPending => "No verification is in progress".to_string(),
            Self::AlreadyVerified => {
                "You have already been verified. Re-verification is not allowed.".to_string()
            }
            Self::InvalidStep(n) => format!("Step {n} does not exist"),
        }
    }
}

pub type Transition = (WizardState, Vec<WizardAction>);

/// Pure wizard state machine.
///
/// 纯状态机：不包含副作用。
pub struct WizardStateMachine;

impl WizardStateMachine {
    pub fn transition(
        state: WizardState,
        event: WizardEvent,
    ) -> Result<Transition, WizardRejection> {
        match event {
            WizardEvent::IdCardAccepted => {
                require_step(&state, &[VerificationStep::IdCard])?;
                Ok((
                    WizardState {
                        step: VerificationStep::FaceCapture,
                        has_id_card: true,
                        ..state
                    },
                    vec![WizardAction::StartCamera],
                ))
            }
            WizardEvent::FaceAccepted => {
                require_step(&state, &[VerificationStep::FaceCapture])?;
                Ok((
                    WizardState {
                        step: VerificationStep::Verification,
                        has_face: true,
                        ..state
                    },
                    vec![WizardAction::StopCamera],
                ))
            }
            WizardEvent::VerifyRequested => {
                if state.verifying {
                    return Err(WizardRejection::VerificationInProgress);
                }
                if state.verified {
                    return Err(WizardRejection::AlreadyVerified);
                }
                require_step(
                    &state,
                    &[VerificationStep::Verification, VerificationStep::Complete],
                )?;
                if !(state.has_id_card && state.has_face) {
                    return Err(WizardRejection::MissingImages);
                }
                let mut actions = Vec::new();
                if state.outcome.is_some() {
                    actions.push(WizardAction::CancelPendingNavigation);
                }
                actions.push(WizardAction::InvokeFaceMatch);
                Ok((
                    WizardState {
                        verifying: true,
                        ..state
                    },
                    actions,
                ))
            }
            WizardEvent::OutcomeRecorded { verified } => {
                if !state.verifying {
                    return Err(WizardRejection::NoVerificationPending);
                }
                let target = if verified {
                    NavigationTarget::Success
                } else {
                    NavigationTarget::Failed
                };
                Ok((
                    WizardState {
                        step: VerificationStep::Complete,
                        verifying: false,
                        verified,
                        outcome: Some(verified),
                        ..state
                    },
                    vec![WizardAction::NavigateAfterDelay { target }],
                ))
            }
            WizardEvent::VerificationErrored => {
                if !state.verifying {
                    return Err(WizardRejection::NoVerificationPending);
                }
                Ok((
                    WizardState {
                        verifying: false,
                        ..state
                    },
                    Vec::new(),
                ))
            }
            WizardEvent::RetryCapture => {
                if state.verified {
                    return Err(WizardRejection::AlreadyVerified);
                }
                if state.verifying {
                    return Err(WizardRejection::VerificationInProgress);
                }
                Ok((
                    WizardState {
                        step: VerificationStep::FaceCapture,
                        has_face: false,
                        outcome: None,
                        ..state
                    },
                    vec![
                        WizardAction::CancelPendingNavigation,
                        WizardAction::ClearFaceImage,
                        WizardAction::StartCamera,
                    ],
                ))
            }
            WizardEvent::Restart => {
                if state.verifying {
                    return Err(WizardRejection::VerificationInProgress);
                }
                Ok((
                    WizardState::initial(),
                    vec![
                        WizardAction::CancelPendingNavigation,
                        WizardAction::StopCamera,
                        WizardAction::ResetSession,
                    ],
                ))
            }
            WizardEvent::GoToStep { step } => Self::jump(state, step),
            WizardEvent::GoBack => {
                let current = state.wizard_number();
                if current <= 1 {
                    return Ok((
                        state,
                        vec![
                            WizardAction::StopCamera,
                            WizardAction::NavigateNow {
                                target: NavigationTarget::Check,
                            },
                        ],
                    ));
                }
                Self::jump(state, current - 1)
            }
            WizardEvent::RevisitVerified => {
                if state.verifying {
                    return Err(WizardRejection::VerificationInProgress);
                }
                Ok((
                    WizardState {
                        step: VerificationStep::Complete,
                        verified: true,
                        outcome: Some(true),
                        ..state
                    },
                    vec![WizardAction::StopCamera],
                ))
            }
        }
    }

    fn jump(state: WizardState, n: u8) -> Result<Transition, WizardRejection> {
        let target = VerificationStep::from_wizard_number(n).ok_or(WizardRejection::InvalidStep(n))?;
        if state.verifying {
            return Err(WizardRejection::VerificationInProgress);
        }
        if state.verified && target < VerificationStep::Verification {
            return Err(WizardRejection::AlreadyVerified);
        }
        if state.step.wizard_number() == n {
            return Ok((state, Vec::new()));
        }

        let mut actions = Vec::new();
        if state.outcome.is_some() {
            actions.push(WizardAction::CancelPendingNavigation);
        }
        if target == VerificationStep::FaceCapture {
            actions.push(WizardAction::StartCamera);
        } else if state.step == VerificationStep::FaceCapture {
            actions.push(WizardAction::StopCamera);
        }
        actions.push(WizardAction::JumpSessionTo { step: target });

        let outcome = if target < VerificationStep::Verification {
            None
        } else {
            state.outcome
        };
        Ok((
            WizardState {
                step: target,
                outcome,
                ..state
            },
            actions,
        ))
    }
}

fn require_step(state: &WizardState, allowed: &[VerificationStep]) -> Result<(), WizardRejection> {
    if allowed.contains(&state.step) {
        Ok(())
    } else {
        Err(WizardRejection::WrongStep {
            current: state.step,
        })
    }
}

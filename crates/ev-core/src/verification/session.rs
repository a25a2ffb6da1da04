//! Live verification session.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::image::ImageRef;
use super::result::VerificationResult;
use super::step::{VerificationProgress, VerificationStep};
use crate::ids::{VerificationSessionId, VoterId};

/// Coarse outcome of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    #[default]
    Pending,
    Verified,
    Failed,
}

/// Mutable state of one pass through the wizard.
///
/// `current_step` only moves forward through [`advance_to`](Self::advance_to);
/// backward moves go through [`rewind_to`](Self::rewind_to), which callers use
/// for retry, reset and explicit step jumps. `overall_verified` is only ever
/// set together with the result it mirrors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSession {
    national_id: String,
    #[serde(default)]
    voter_id: VoterId,
    #[serde(default)]
    id_card_image: Option<ImageRef>,
    #[serde(default)]
    face_image: Option<ImageRef>,
    current_step: VerificationStep,
    #[serde(default)]
    steps_completed: BTreeSet<VerificationStep>,
    #[serde(default)]
    verification_result: Option<VerificationResult>,
    #[serde(default)]
    overall_verified: bool,
    #[serde(default)]
    verification_status: SessionOutcome,
    #[serde(default)]
    face_match_percentage: Option<f64>,
    session_id: VerificationSessionId,
    started_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl VerificationSession {
    pub fn new(national_id: impl Into<String>, voter_id: VoterId, now: DateTime<Utc>) -> Self {
        Self {
            national_id: national_id.into(),
            voter_id,
            id_card_image: None,
            face_image: None,
            current_step: VerificationStep::IdCard,
            steps_completed: BTreeSet::new(),
            verification_result: None,
            overall_verified: false,
            verification_status: SessionOutcome::Pending,
            face_match_percentage: None,
            session_id: VerificationSessionId::generate(now.timestamp_millis()),
            started_at: now,
            last_updated: now,
        }
    }

    pub fn national_id(&self) -> &str {
        &self.national_id
    }

    pub fn voter_id(&self) -> VoterId {
        self.voter_id
    }

    pub fn session_id(&self) -> &VerificationSessionId {
        &self.session_id
    }

    pub fn id_card_image(&self) -> Option<&ImageRef> {
        self.id_card_image.as_ref()
    }

    pub fn face_image(&self) -> Option<&ImageRef> {
        self.face_image.as_ref()
    }

    pub fn current_step(&self) -> VerificationStep {
        self.current_step
    }

    pub fn steps_completed(&self) -> &BTreeSet<VerificationStep> {
        &self.steps_completed
    }

    pub fn is_step_completed(&self, step: VerificationStep) -> bool {
        self.steps_completed.contains(&step)
    }

    pub fn verification_result(&self) -> Option<&VerificationResult> {
        self.verification_result.as_ref()
    }

    pub fn overall_verified(&self) -> bool {
        self.overall_verified
    }

    pub fn outcome(&self) -> SessionOutcome {
        self.verification_status
    }

    pub fn face_match_percentage(&self) -> Option<f64> {
        self.face_match_percentage
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn has_both_images(&self) -> bool {
        self.id_card_image.is_some() && self.face_image.is_some()
    }

    pub fn progress(&self) -> VerificationProgress {
        self.current_step.progress()
    }

    pub fn set_identity(&mut self, national_id: impl Into<String>, voter_id: VoterId, now: DateTime<Utc>) {
        self.national_id = national_id.into();
        self.voter_id = voter_id;
        self.last_updated = now;
    }

    /// Move forward to `step`. Returns `false` and changes nothing when
    /// `step` is not ahead of the current one.
    pub fn advance_to(&mut self, step: VerificationStep, now: DateTime<Utc>) -> bool {
        if step <= self.current_step {
            return false;
        }
        for earlier in VerificationStep::ALL.iter().copied().filter(|s| *s < step) {
            self.steps_completed.insert(earlier);
        }
        self.current_step = step;
        self.last_updated = now;
        true
    }

    /// Explicit jump back (or sideways) to `step`. Completion marks at or
    /// after the target are dropped.
    pub fn rewind_to(&mut self, step: VerificationStep, now: DateTime<Utc>) {
        self.steps_completed.retain(|s| *s < step);
        self.current_step = step;
        self.last_updated = now;
    }

    /// Returns the replaced image so the caller can release its preview.
    pub fn set_id_card_image(&mut self, image: ImageRef, now: DateTime<Utc>) -> Option<ImageRef> {
        let previous = self.id_card_image.replace(image);
        self.steps_completed.insert(VerificationStep::IdCard);
        self.advance_to(VerificationStep::FaceCapture, now);
        self.last_updated = now;
        previous
    }

    pub fn set_face_image(&mut self, image: ImageRef, now: DateTime<Utc>) -> Option<ImageRef> {
        let previous = self.face_image.replace(image);
        self.steps_completed.insert(VerificationStep::FaceCapture);
        self.advance_to(VerificationStep::Verification, now);
        self.last_updated = now;
        previous
    }

    pub fn clear_id_card_image(&mut self, now: DateTime<Utc>) -> Option<ImageRef> {
        self.steps_completed.remove(&VerificationStep::IdCard);
        self.last_updated = now;
        self.id_card_image.take()
    }

    pub fn clear_face_image(&mut self, now: DateTime<Utc>) -> Option<ImageRef> {
        self.steps_completed.remove(&VerificationStep::FaceCapture);
        self.last_updated = now;
        self.face_image.take()
    }

    /// Attach a new outcome, superseding any earlier one.
    pub fn apply_result(&mut self, result: VerificationResult, now: DateTime<Utc>) {
        self.overall_verified = result.verified();
        self.verification_status = if result.verified() {
            SessionOutcome::Verified
        } else {
            SessionOutcome::Failed
        };
        self.face_match_percentage = result.confidence();
        self.verification_result = Some(result);
        self.steps_completed.insert(VerificationStep::Verification);
        if self.current_step < VerificationStep::Complete {
            self.advance_to(VerificationStep::Complete, now);
        }
        if self.overall_verified {
            self.steps_completed.insert(VerificationStep::Complete);
        }
        self.last_updated = now;
    }

    /// Drop the outcome, e.g. before a retry.
    pub fn clear_result(&mut self, now: DateTime<Utc>) {
        self.verification_result = None;
        self.overall_verified = false;
        self.verification_status = SessionOutcome::Pending;
        self.face_match_percentage = None;
        self.steps_completed.remove(&VerificationStep::Verification);
        self.steps_completed.remove(&VerificationStep::Complete);
        self.last_updated = now;
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            national_id: self.national_id.clone(),
            voter_id: self.voter_id,
            has_id_card_image: self.id_card_image.is_some(),
            has_face_image: self.face_image.is_some(),
            current_step: self.current_step,
            steps_completed: self.steps_completed.clone(),
            overall_verified: self.overall_verified,
            verification_status: self.verification_status,
            face_match_percentage: self.face_match_percentage,
            session_id: self.session_id.clone(),
            started_at: self.started_at,
            last_updated: self.last_updated,
        }
    }
}

/// Reduced projection kept in durable storage: booleans instead of images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub national_id: String,
    pub voter_id: VoterId,
    pub has_id_card_image: bool,
    pub has_face_image: bool,
    pub current_step: VerificationStep,
    pub steps_completed: BTreeSet<VerificationStep>,
    pub overall_verified: bool,
    pub verification_status: SessionOutcome,
    pub face_match_percentage: Option<f64>,
    pub session_id: VerificationSessionId,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Snapshot written to session storage under `face_verification_data`.
///
/// Besides the session itself it carries the top-level `isVerified` flag and
/// the outcome `timestamp`, which is what the route guard reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub session: VerificationSession,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<&VerificationSession> for SessionSnapshot {
    fn from(session: &VerificationSession) -> Self {
        Self {
            session: session.clone(),
            is_verified: session.overall_verified(),
            timestamp: session.verification_result().map(|r| r.timestamp()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::result::VerificationSource;

    fn image(name: &str, now: DateTime<Utc>) -> ImageRef {
        ImageRef {
            name: name.into(),
            mime_type: "image/jpeg".into(),
            size: 2048,
            preview_url: format!("preview:{name}"),
            uploaded_at: now,
        }
    }

    #[test]
    fn test_new_session_starts_at_id_card() {
        let now = Utc::now();
        let session = VerificationSession::new("12345678901234", VoterId(3), now);
        assert_eq!(session.current_step(), VerificationStep::IdCard);
        assert!(session.steps_completed().is_empty());
        assert!(!session.overall_verified());
        assert!(session.session_id().as_str().starts_with("session_"));
    }

    #[test]
    fn test_images_advance_step() {
        let now = Utc::now();
        let mut session = VerificationSession::new("1", VoterId(1), now);
        session.set_id_card_image(image("id.jpg", now), now);
        assert_eq!(session.current_step(), VerificationStep::FaceCapture);
        session.set_face_image(image("face.jpg", now), now);
        assert_eq!(session.current_step(), VerificationStep::Verification);
        assert!(session.has_both_images());
        assert!(session.is_step_completed(VerificationStep::IdCard));
        assert!(session.is_step_completed(VerificationStep::FaceCapture));
    }

    #[test]
    fn test_advance_never_moves_backward() {
        let now = Utc::now();
        let mut session = VerificationSession::new("1", VoterId(1), now);
        assert!(session.advance_to(VerificationStep::Verification, now));
        assert!(!session.advance_to(VerificationStep::FaceCapture, now));
        assert_eq!(session.current_step(), VerificationStep::Verification);
    }

    #[test]
    fn test_replacing_image_returns_previous() {
        let now = Utc::now();
        let mut session = VerificationSession::new("1", VoterId(1), now);
        assert!(session.set_id_card_image(image("a.jpg", now), now).is_none());
        let old = session.set_id_card_image(image("b.jpg", now), now).unwrap();
        assert_eq!(old.name, "a.jpg");
    }

    #[test]
    fn test_apply_result_mirrors_verified_flag() {
        let now = Utc::now();
        let mut session = VerificationSession::new("1", VoterId(1), now);
        session.apply_result(
            VerificationResult::new(true, Some(92.3), None, now, VerificationSource::Remote),
            now,
        );
        assert!(session.overall_verified());
        assert_eq!(session.outcome(), SessionOutcome::Verified);
        assert_eq!(session.current_step(), VerificationStep::Complete);
        assert_eq!(session.face_match_percentage(), Some(92.3));

        session.apply_result(
            VerificationResult::new(false, Some(40.0), None, now, VerificationSource::Remote),
            now,
        );
        assert!(!session.overall_verified());
        assert_eq!(session.outcome(), SessionOutcome::Failed);
    }

    #[test]
    fn test_rewind_drops_later_completion_marks() {
        let now = Utc::now();
        let mut session = VerificationSession::new("1", VoterId(1), now);
        session.set_id_card_image(image("id.jpg", now), now);
        session.set_face_image(image("face.jpg", now), now);
        session.rewind_to(VerificationStep::FaceCapture, now);
        assert_eq!(session.current_step(), VerificationStep::FaceCapture);
        assert!(session.is_step_completed(VerificationStep::IdCard));
        assert!(!session.is_step_completed(VerificationStep::FaceCapture));
    }

    #[test]
    fn test_summary_replaces_images_with_flags() {
        let now = Utc::now();
        let mut session = VerificationSession::new("1", VoterId(1), now);
        session.set_id_card_image(image("id.jpg", now), now);
        let summary = serde_json::to_value(session.summary()).unwrap();
        assert_eq!(summary["hasIdCardImage"], true);
        assert_eq!(summary["hasFaceImage"], false);
        assert!(summary.get("idCardImage").is_none());
    }

    #[test]
    fn test_json_round_trip_keeps_step_and_images() {
        let now = Utc::now();
        let mut session = VerificationSession::new("12345678901234", VoterId(9), now);
        session.set_id_card_image(image("id.jpg", now), now);
        let json = serde_json::to_string(&session).unwrap();
        let back: VerificationSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_snapshot_exposes_guard_fields() {
        let now = Utc::now();
        let mut session = VerificationSession::new("12345678901234", VoterId(9), now);
        session.apply_result(
            VerificationResult::new(true, Some(92.3), None, now, VerificationSource::Remote),
            now,
        );
        let json = serde_json::to_value(SessionSnapshot::from(&session)).unwrap();
        assert_eq!(json["isVerified"], true);
        assert_eq!(json["nationalId"], "12345678901234");
        assert!(json.get("timestamp").is_some());

        let back: SessionSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back.session, session);
    }
}

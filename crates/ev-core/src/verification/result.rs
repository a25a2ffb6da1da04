use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Where a verification outcome came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationSource {
    #[default]
    Remote,
    /// Produced locally because the face-match service was unreachable.
    Simulated,
}

/// Clamp a confidence score into `[0, 100]`. `NaN` carries no information
/// and becomes `None`.
pub fn clamp_confidence(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(0.0, 100.0))
    }
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.and_then(clamp_confidence))
}

/// Outcome of one face-match attempt.
///
/// Immutable once produced; a later attempt supersedes it with a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    verified: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_confidence",
        skip_serializing_if = "Option::is_none"
    )]
    confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    source: VerificationSource,
}

impl VerificationResult {
    pub fn new(
        verified: bool,
        confidence: Option<f64>,
        message: Option<String>,
        timestamp: DateTime<Utc>,
        source: VerificationSource,
    ) -> Self {
        Self {
            verified,
            confidence: confidence.and_then(clamp_confidence),
            message,
            timestamp,
            source,
        }
    }

    pub fn remote(
        verified: bool,
        confidence: Option<f64>,
        message: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(
            verified,
            confidence,
            message,
            timestamp,
            VerificationSource::Remote,
        )
    }

    pub fn verified(&self) -> bool {
        self.verified
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    /// Confidence as shown to the voter; `0` when the service sent none.
    pub fn match_percentage(&self) -> f64 {
        self.confidence.unwrap_or(0.0)
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> VerificationSource {
        self.source
    }

    pub fn is_simulated(&self) -> bool {
        self.source == VerificationSource::Simulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        let now = Utc::now();
        assert_eq!(
            VerificationResult::remote(true, Some(140.0), None, now).confidence(),
            Some(100.0)
        );
        assert_eq!(
            VerificationResult::remote(false, Some(-3.0), None, now).confidence(),
            Some(0.0)
        );
        assert_eq!(
            VerificationResult::remote(false, Some(f64::NAN), None, now).confidence(),
            None
        );
    }

    #[test]
    fn test_deserialize_clamps_confidence_and_defaults_source() {
        let json = r#"{"verified":true,"confidence":250.0,"timestamp":"2024-05-01T10:00:00Z"}"#;
        let result: VerificationResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.confidence(), Some(100.0));
        assert_eq!(result.source(), VerificationSource::Remote);
        assert!(result.message().is_none());
    }

    #[test]
    fn test_simulated_source_round_trips_in_json() {
        let result = VerificationResult::new(
            false,
            Some(55.5),
            Some("Faces do not match".into()),
            Utc::now(),
            VerificationSource::Simulated,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source"], "simulated");
        assert_eq!(json["confidence"], 55.5);
    }
}

//! Normalization of the face-match service responses.
//!
//! Deployed services answer in one of three shapes. They are tried in a
//! fixed priority order and the first that matches wins; anything else is an
//! explicit [`ResponseParseError`].

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use super::result::VerificationResult;

pub const DEFAULT_MATCH_MESSAGE: &str = "Faces match successfully";
pub const DEFAULT_MISMATCH_MESSAGE: &str = "Faces do not match";
pub const DEFAULT_COMPLETED_MESSAGE: &str = "Verification completed";
pub const UNPARSEABLE_MESSAGE: &str = "Unable to parse verification response";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseParseError {
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response body is not a JSON object")]
    NotAnObject,

    #[error("response matches no known verification shape")]
    UnknownShape,
}

/// Known response schemas, in priority order.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceMatchResponse {
    /// `{verified, confidence|similarity, message}`
    Verified {
        verified: bool,
        confidence: Option<f64>,
        message: Option<String>,
    },
    /// `{success, score|confidence, message|reason}`
    Success {
        success: bool,
        score: Option<f64>,
        message: Option<String>,
    },
    /// `{match, confidence|probability, status}`
    Match {
        matched: bool,
        confidence: Option<f64>,
        status: Option<String>,
    },
}

impl FaceMatchResponse {
    pub fn parse_bytes(body: &[u8]) -> Result<Self, ResponseParseError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ResponseParseError::InvalidJson(e.to_string()))?;
        Self::parse(&value)
    }

    pub fn parse(value: &Value) -> Result<Self, ResponseParseError> {
        let obj = value.as_object().ok_or(ResponseParseError::NotAnObject)?;

        if let Some(verified) = obj.get("verified").and_then(Value::as_bool) {
            return Ok(Self::Verified {
                verified,
                confidence: first_score(value, &["confidence", "similarity"]),
                message: first_text(value, &["message"]),
            });
        }
        if let Some(success) = obj.get("success").and_then(Value::as_bool) {
            return Ok(Self::Success {
                success,
                score: first_score(value, &["score", "confidence"]),
                message: first_text(value, &["message", "reason"]),
            });
        }
        if let Some(matched) = obj.get("match").and_then(Value::as_bool) {
            return Ok(Self::Match {
                matched,
                confidence: first_score(value, &["confidence", "probability"]),
                status: first_text(value, &["status"]),
            });
        }
        Err(ResponseParseError::UnknownShape)
    }

    pub fn into_result(self, timestamp: DateTime<Utc>) -> VerificationResult {
        match self {
            Self::Verified {
                verified,
                confidence,
                message,
            } => {
                let message = message.unwrap_or_else(|| {
                    if verified {
                        DEFAULT_MATCH_MESSAGE.to_string()
                    } else {
                        DEFAULT_MISMATCH_MESSAGE.to_string()
                    }
                });
                VerificationResult::remote(verified, confidence, Some(message), timestamp)
            }
            Self::Success {
                success,
                score,
                message,
            } => VerificationResult::remote(success, score, message, timestamp),
            Self::Match {
                matched,
                confidence,
                status,
            } => VerificationResult::remote(
                matched,
                confidence,
                Some(status.unwrap_or_else(|| DEFAULT_COMPLETED_MESSAGE.to_string())),
                timestamp,
            ),
        }
    }
}

/// Parse a response body into a result. Never fails: unrecognized bodies
/// become an unverified result carrying a diagnostic message.
pub fn normalize_response(body: &[u8], timestamp: DateTime<Utc>) -> VerificationResult {
    match FaceMatchResponse::parse_bytes(body) {
        Ok(response) => response.into_result(timestamp),
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "Face-match response not recognized");
            VerificationResult::remote(false, None, Some(UNPARSEABLE_MESSAGE.to_string()), timestamp)
        }
    }
}

/// Fields reported as a ratio in `[0, 1]` rather than a percentage.
const RATIO_FIELDS: &[&str] = &["similarity", "probability"];

/// First present, non-zero numeric field. Ratio fields are scaled to
/// percent; `confidence` and `score` already are percentages.
fn first_score(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_f64).map(|v| (*k, v)))
        .find(|(_, v)| *v != 0.0 && !v.is_nan())
        .map(|(key, v)| {
            if RATIO_FIELDS.contains(&key) && (0.0..=1.0).contains(&v) {
                v * 100.0
            } else {
                v
            }
        })
}

fn first_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_verified_shape_uses_similarity_fallback() {
        let parsed = FaceMatchResponse::parse(&json!({"verified": true, "similarity": 0.923}))
            .unwrap();
        let result = parsed.into_result(now());
        assert!(result.verified());
        let confidence = result.confidence().unwrap();
        assert!((confidence - 92.3).abs() < 1e-9);
        assert_eq!(result.message(), Some(DEFAULT_MATCH_MESSAGE));
    }

    #[test]
    fn test_verified_shape_default_mismatch_message() {
        let body = br#"{"verified": false, "confidence": 41.0}"#;
        let result = normalize_response(body, now());
        assert!(!result.verified());
        assert_eq!(result.confidence(), Some(41.0));
        assert_eq!(result.message(), Some(DEFAULT_MISMATCH_MESSAGE));
    }

    #[test]
    fn test_success_shape_prefers_score_and_reason() {
        let body = br#"{"success": true, "score": 88, "confidence": 12, "reason": "ok"}"#;
        let result = normalize_response(body, now());
        assert!(result.verified());
        assert_eq!(result.confidence(), Some(88.0));
        assert_eq!(result.message(), Some("ok"));
    }

    #[test]
    fn test_match_shape_defaults_status() {
        let body = br#"{"match": false, "probability": 0.4}"#;
        let result = normalize_response(body, now());
        assert!(!result.verified());
        assert_eq!(result.confidence(), Some(40.0));
        assert_eq!(result.message(), Some(DEFAULT_COMPLETED_MESSAGE));
    }

    #[test]
    fn test_priority_order_verified_wins() {
        let parsed =
            FaceMatchResponse::parse(&json!({"match": false, "success": false, "verified": true}))
                .unwrap();
        assert!(matches!(parsed, FaceMatchResponse::Verified { verified: true, .. }));

        let parsed = FaceMatchResponse::parse(&json!({"match": true, "success": false})).unwrap();
        assert!(matches!(parsed, FaceMatchResponse::Success { success: false, .. }));
    }

    #[test]
    fn test_unknown_shape_is_explicit_error() {
        assert_eq!(
            FaceMatchResponse::parse(&json!({"result": "ok"})),
            Err(ResponseParseError::UnknownShape)
        );
        assert_eq!(
            FaceMatchResponse::parse(&json!([1, 2])),
            Err(ResponseParseError::NotAnObject)
        );
        assert!(matches!(
            FaceMatchResponse::parse_bytes(b"<html>"),
            Err(ResponseParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_unparseable_body_normalizes_to_unverified() {
        let result = normalize_response(b"not json", now());
        assert!(!result.verified());
        assert_eq!(result.confidence(), None);
        assert_eq!(result.message(), Some(UNPARSEABLE_MESSAGE));
    }

    #[test]
    fn test_percentage_fields_are_not_scaled() {
        let result = normalize_response(br#"{"verified": false, "confidence": 1}"#, now());
        assert_eq!(result.confidence(), Some(1.0));

        let result = normalize_response(br#"{"success": true, "score": 0.5}"#, now());
        assert_eq!(result.confidence(), Some(0.5));

        let result = normalize_response(br#"{"match": true, "confidence": 0.9}"#, now());
        assert_eq!(result.confidence(), Some(0.9));
    }

    #[test]
    fn test_out_of_range_confidence_is_clamped() {
        let result = normalize_response(br#"{"verified": true, "confidence": 180}"#, now());
        assert_eq!(result.confidence(), Some(100.0));
    }
}

//! Extraction of verification facts from loosely shaped stored JSON.
//!
//! Stored verification data has been written by several generations of the
//! client, so the verified flag and timestamp can sit in different places.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Flag locations, in priority order.
const VERIFIED_PATHS: &[&[&str]] = &[&["verificationData", "verified"], &["isVerified"], &["verified"]];

/// Timestamp locations, in priority order.
const TIMESTAMP_PATHS: &[&[&str]] = &[
    &["timestamp"],
    &["verificationData", "timestamp"],
    &["verificationTime"],
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEvidence {
    pub verified: bool,
    pub timestamp: Option<DateTime<Utc>>,
}

impl VerificationEvidence {
    /// Only a literal `true` counts as verified; strings such as `"true"`
    /// do not.
    pub fn from_value(value: &Value) -> Self {
        let verified = VERIFIED_PATHS
            .iter()
            .filter_map(|path| lookup(value, path))
            .any(|v| v.as_bool() == Some(true));
        let timestamp = TIMESTAMP_PATHS
            .iter()
            .filter_map(|path| lookup(value, path))
            .find_map(parse_timestamp);
        Self {
            verified,
            timestamp,
        }
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .filter(|v| !v.is_null())
}

/// RFC 3339 strings or Unix milliseconds. Anything else is treated as absent.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

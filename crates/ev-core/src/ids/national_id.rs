use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id_macro::impl_id;

/// Number of digits in a national ID.
pub const NATIONAL_ID_LEN: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NationalIdError {
    #[error("national id is empty")]
    Empty,

    #[error("national id must be exactly {expected} digits, got {actual} characters")]
    InvalidLength { expected: usize, actual: usize },

    #[error("national id must contain digits only")]
    NonDigit,
}

impl NationalIdError {
    pub fn user_message(&self) -> &'static str {
        "Please enter a valid 14-digit National ID"
    }
}

/// 14-digit identifier used to look up a voter's registration record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NationalId(String);

impl NationalId {
    /// Parse user input. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, NationalIdError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(NationalIdError::Empty);
        }
        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(NationalIdError::NonDigit);
        }
        if trimmed.len() != NATIONAL_ID_LEN {
            return Err(NationalIdError::InvalidLength {
                expected: NATIONAL_ID_LEN,
                actual: trimmed.chars().count(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl_id!(NationalId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_fourteen_digits() {
        let id = NationalId::parse(" 12345678901234 ").unwrap();
        assert_eq!(id.as_str(), "12345678901234");
    }

    #[test]
    fn test_parse_rejects_short_input() {
        assert_eq!(
            NationalId::parse("123"),
            Err(NationalIdError::InvalidLength {
                expected: 14,
                actual: 3
            })
        );
    }

    #[test]
    fn test_parse_rejects_letters() {
        assert_eq!(
            NationalId::parse("1234567890123a"),
            Err(NationalIdError::NonDigit)
        );
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(NationalId::parse("   "), Err(NationalIdError::Empty));
    }
}

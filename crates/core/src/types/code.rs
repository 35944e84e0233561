//! Redemption code type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`RedemptionCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// Nothing was entered.
    #[error("code cannot be empty")]
    Empty,
    /// Fewer than [`RedemptionCode::MIN_LENGTH`] characters.
    #[error("code must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// More than [`RedemptionCode::MAX_LENGTH`] characters.
    #[error("code must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// A character outside `A-Z`, `0-9` and `-`.
    #[error("code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A code printed on (or encoded into the QR of) a claimed coupon.
///
/// Codes are case-insensitive: input is trimmed and upper-cased, so
/// `" abc123 "` and `"ABC123"` are the same code.
///
/// ```
/// use dealdesk_core::RedemptionCode;
///
/// let code = RedemptionCode::parse(" abc123 ").unwrap();
/// assert_eq!(code.as_str(), "ABC123");
/// assert!(RedemptionCode::parse("ab").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RedemptionCode(String);

impl RedemptionCode {
    /// Shortest code the backend issues.
    pub const MIN_LENGTH: usize = 4;
    /// Longest code the backend issues.
    pub const MAX_LENGTH: usize = 32;

    /// Parse and normalize a code.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, outside the length
    /// bounds, or contains characters other than letters, digits and `-`.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CodeError::Empty);
        }

        let normalized = s.to_ascii_uppercase();
        if let Some(bad) = normalized
            .chars()
            .find(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(CodeError::InvalidCharacter(bad));
        }

        let len = normalized.len();
        if len < Self::MIN_LENGTH {
            return Err(CodeError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if len > Self::MAX_LENGTH {
            return Err(CodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(normalized))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RedemptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RedemptionCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RedemptionCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RedemptionCode> for String {
    fn from(code: RedemptionCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(
            RedemptionCode::parse("  zz-999a ").map(|c| c.to_string()),
            Ok("ZZ-999A".to_string())
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(RedemptionCode::parse(" "), Err(CodeError::Empty));
        assert_eq!(
            RedemptionCode::parse("ab1"),
            Err(CodeError::TooShort { min: 4 })
        );
        assert_eq!(
            RedemptionCode::parse(&"A".repeat(33)),
            Err(CodeError::TooLong { max: 32 })
        );
        assert_eq!(
            RedemptionCode::parse("ABC 123"),
            Err(CodeError::InvalidCharacter(' '))
        );
        assert_eq!(
            RedemptionCode::parse("ABC_123"),
            Err(CodeError::InvalidCharacter('_'))
        );
    }
}

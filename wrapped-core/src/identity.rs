//! Identity types for wallet summaries

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Length of a Stellar account ID (`G...`, base32, 56 characters).
pub const ACCOUNT_ID_LEN: usize = 56;

static ACCOUNT_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    // Leading 'G' followed by the RFC 4648 base32 alphabet.
    Regex::new(r"^G[A-Z2-7]{55}$").unwrap_or_else(|_| unreachable!("static pattern is valid"))
});

/// Validated Stellar account identifier.
///
/// Construction goes through [`AccountId::parse`], so any value of this type
/// is exactly 56 characters, starts with `G`, and uses only `A-Z` and `2-7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(try_from = "String", into = "String")]
#[cfg_attr(feature = "openapi", schema(value_type = String, example = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7"))]
pub struct AccountId(String);

impl AccountId {
    /// Validate and wrap an account identifier.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.len() != ACCOUNT_ID_LEN {
            return Err(ValidationError::InvalidAccount {
                value,
                reason: format!("must be exactly {} characters long", ACCOUNT_ID_LEN),
            });
        }
        if !ACCOUNT_ID_PATTERN.is_match(&value) {
            return Err(ValidationError::InvalidAccount {
                value,
                reason: "must start with \"G\" and contain only base32 characters (A-Z, 2-7)"
                    .to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl std::str::FromStr for AccountId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

    #[test]
    fn test_parse_valid_account() {
        let id = AccountId::parse(VALID).expect("valid account");
        assert_eq!(id.as_str(), VALID);
        assert_eq!(id.to_string(), VALID);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let err = AccountId::parse("GABC").unwrap_err();
        assert!(err.to_string().contains("56"));
    }

    #[test]
    fn test_parse_rejects_wrong_prefix() {
        let mut bad = VALID.to_string();
        bad.replace_range(0..1, "M");
        let err = AccountId::parse(bad).unwrap_err();
        assert!(err.to_string().contains("base32"));
    }

    #[test]
    fn test_parse_rejects_lowercase_and_digits_outside_alphabet() {
        let lower = VALID.to_lowercase();
        assert!(AccountId::parse(lower).is_err());

        let mut with_one = VALID.to_string();
        with_one.replace_range(10..11, "1");
        assert!(AccountId::parse(with_one).is_err());
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let json = format!("\"{}\"", VALID);
        let id: AccountId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id.as_str(), VALID);

        assert!(serde_json::from_str::<AccountId>("\"GSHORT\"").is_err());
    }
}

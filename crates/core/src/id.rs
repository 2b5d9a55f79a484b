//! Strongly-typed identifiers for records and collections.
//!
//! Identifiers are opaque lowercase strings (`[a-z0-9_]`, at most 64 chars),
//! matching what the record platform accepts in filters and relations.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a record within a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

/// Identifier of a collection (stable across renames).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(String);

const MAX_ID_LEN: usize = 64;

fn validate(kind: &str, s: &str) -> Result<(), DomainError> {
    if s.is_empty() {
        return Err(DomainError::invalid_id(format!("{kind}: empty")));
    }
    if s.len() > MAX_ID_LEN {
        return Err(DomainError::invalid_id(format!(
            "{kind}: longer than {MAX_ID_LEN} characters"
        )));
    }
    if !s
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    {
        return Err(DomainError::invalid_id(format!(
            "{kind}: '{s}' must match [a-z0-9_]+"
        )));
    }
    Ok(())
}

macro_rules! impl_string_id {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Generate a fresh identifier.
            ///
            /// Uses UUIDv7 (time-ordered) rendered as 32 lowercase hex chars.
            /// Prefer passing IDs explicitly in tests for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7().simple().to_string())
            }

            /// Parse and validate an identifier.
            pub fn parse(s: impl AsRef<str>) -> Result<Self, DomainError> {
                let s = s.as_ref();
                validate($name, s)?;
                Ok(Self(s.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_string_id!(RecordId, "RecordId");
impl_string_id!(CollectionId, "CollectionId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_valid_and_unique() {
        let a = RecordId::new();
        let b = RecordId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(RecordId::parse(a.as_str()).is_ok());
    }

    #[test]
    fn parse_accepts_platform_style_ids() {
        assert!(RecordId::parse("abc123").is_ok());
        assert!(CollectionId::parse("pbc_4092854851").is_ok());
    }

    #[test]
    fn parse_rejects_empty_uppercase_and_punctuation() {
        assert!(matches!(RecordId::parse(""), Err(DomainError::InvalidId(_))));
        assert!(matches!(RecordId::parse("ABC"), Err(DomainError::InvalidId(_))));
        assert!(matches!(RecordId::parse("a' || 1"), Err(DomainError::InvalidId(_))));
        assert!(RecordId::parse("x".repeat(65)).is_err());
    }
}

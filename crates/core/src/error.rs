//! Errors raised by the record primitives themselves.

use thiserror::Error;

/// Storage and schema failures live in `shopfront-infra`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("bad id ({0})")]
    InvalidId(String),

    /// A stored record does not have the shape a typed view expects.
    #[error("malformed record: {0}")]
    Malformed(String),
}

impl DomainError {
    pub fn invalid_id(detail: impl Into<String>) -> Self {
        Self::InvalidId(detail.into())
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed(detail.into())
    }
}

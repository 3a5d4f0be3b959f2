//! # Error Types
//!
//! Errors raised while reading typed data out of bus payloads.

use thiserror::Error;

/// Failure to extract a typed value from a [`crate::Value`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    /// The value has a different variant than the one requested.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An identifier was present but empty.
    #[error("identifier must not be empty")]
    EmptyIdentifier,

    /// An integer identifier was negative.
    #[error("identifier must not be negative: {0}")]
    NegativeIdentifier(i64),

    /// A list entry could not be read as a permission code.
    #[error("invalid permission code: {0}")]
    InvalidPermission(String),
}

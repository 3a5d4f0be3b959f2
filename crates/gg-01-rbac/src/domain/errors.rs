//! # Domain Errors
//!
//! Failures of the stores behind the enforcer, and of the enforcer itself.
//! None of these is ever interpreted as a grant or a denial: callers decide
//! the fail-closed policy.

use super::role::{RoleId, RoleValidationError};
use super::target::TargetParseError;
use std::time::Duration;
use thiserror::Error;

/// Backing store unreachable or failed mid-operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Role store operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleStoreError {
    #[error("invalid role: {0}")]
    Validation(#[from] RoleValidationError),

    #[error("role {0} does not exist")]
    UnknownRole(RoleId),

    #[error("invalid target: {0}")]
    Target(#[from] TargetParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Enforcer check errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnforcerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The identity does not form a valid target (e.g. a non-numeric user id).
    #[error("invalid identity: {0}")]
    InvalidIdentity(#[from] TargetParseError),
}

impl EnforcerError {
    #[must_use]
    pub fn is_store(&self) -> bool {
        matches!(self, EnforcerError::Store(_))
    }
}

//! # Result Envelope
//!
//! Every outcome on the bus, successful or not, is expressed as positional
//! results, keyword results and an optional error code.

use shared_types::{Dict, List, Value};
use std::fmt;

/// Namespaced error codes.
pub mod codes {
    /// Generic, deliberately uninformative denial.
    pub const NOT_AUTHORIZED: &str = "bus.error.not_authorized";
    /// Malformed arguments.
    pub const INVALID_ARGUMENT: &str = "bus.error.invalid_argument";
    /// No callee registered for the procedure.
    pub const NO_SUCH_PROCEDURE: &str = "bus.error.no_such_procedure";
    /// Procedure already registered by another callee.
    pub const PROCEDURE_ALREADY_EXISTS: &str = "bus.error.procedure_already_exists";
    /// No such subscription.
    pub const NO_SUCH_SUBSCRIPTION: &str = "bus.error.no_such_subscription";
    /// The call was cancelled before it completed.
    pub const CANCELED: &str = "bus.error.canceled";

    /// Caller exceeded its request rate.
    pub const RATE_LIMITED: &str = "gate.error.rate_limit";
    /// Caller lacks the permissions the procedure requires.
    pub const FORBIDDEN: &str = "gate.error.forbidden";
    /// A service call did not carry the identity it acts for.
    pub const IDENTITY_MISSING: &str = "gate.error.identity_missing";
    /// Unclassified internal failure.
    pub const INTERNAL: &str = "gate.error.internal";
}

/// Uniform result envelope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvokeResult {
    pub args: List,
    pub kwargs: Dict,
    pub error: Option<String>,
}

impl InvokeResult {
    /// Successful result.
    #[must_use]
    pub fn ok(args: List, kwargs: Dict) -> Self {
        Self {
            args,
            kwargs,
            error: None,
        }
    }

    /// Error result with a code and no payload.
    #[must_use]
    pub fn error(code: impl Into<String>) -> Self {
        Self {
            args: List::new(),
            kwargs: Dict::new(),
            error: Some(code.into()),
        }
    }

    /// Error result with a code and positional diagnostics.
    #[must_use]
    pub fn error_with_args(code: impl Into<String>, args: List) -> Self {
        Self {
            args,
            kwargs: Dict::new(),
            error: Some(code.into()),
        }
    }

    /// Add a keyword value (builder style).
    #[must_use]
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl fmt::Display for InvokeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(code) => write!(f, "error {} ({} args)", code, self.args.len()),
            None => write!(f, "ok ({} args)", self.args.len()),
        }
    }
}

//! # Denials
//!
//! Why the gate refused a message, and how that reads on the wire.
//!
//! | Denial | Service session | User session |
//! |--------|-----------------|--------------|
//! | `RateLimited` | `gate.error.rate_limit` | `bus.error.not_authorized` |
//! | `Forbidden` | `gate.error.forbidden` + `permissions` | `bus.error.not_authorized` |
//! | `IdentityMissing` | `gate.error.identity_missing` + which half | `bus.error.not_authorized` |
//! | `NotAllowed` | `bus.error.not_authorized` | `bus.error.not_authorized` |
//! | `InvalidArgument` | `bus.error.invalid_argument` | `bus.error.not_authorized` |
//! | `Internal` | `gate.error.internal` + error, trace, event_id | `gate.error.internal` + event_id |
//!
//! User sessions are untrusted, so their denials carry nothing that could
//! reveal session state. Store failures are never a plain "no": both roles
//! see the internal error code and the failure is always reported.

use crate::identity::MissingIdentity;
use gg_03_invocation::{attach_event_id, internal_error_result, result_from_error, InvocationError};
use gg_telemetry::{ErrorReport, ErrorSink, TAG_STAGE};
use shared_bus::{codes, InvokeResult, SessionRole};
use shared_types::{permissions_to_value, Permission, Value};
use thiserror::Error;

/// Outcome of a refused authorization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Denial {
    #[error("rate limited")]
    RateLimited,

    #[error("missing one of permissions {0:?}")]
    Forbidden(Vec<Permission>),

    #[error("identity missing: {0}")]
    IdentityMissing(MissingIdentity),

    #[error("not allowed")]
    NotAllowed,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A check could not be completed.
    #[error("internal failure at {stage}: {message}")]
    Internal {
        stage: &'static str,
        message: String,
    },
}

impl Denial {
    pub fn internal(stage: &'static str, message: impl ToString) -> Self {
        Denial::Internal {
            stage,
            message: message.to_string(),
        }
    }

    /// Render for a session of `role`. Internal failures are reported to
    /// `sink` with `tags` on the way out.
    pub fn into_result(
        self,
        role: SessionRole,
        sink: &dyn ErrorSink,
        tags: &[(&str, String)],
    ) -> InvokeResult {
        match (self, role) {
            (Denial::Internal { stage, message }, SessionRole::User) => {
                let report = tags
                    .iter()
                    .fold(ErrorReport::new(message), |r, (k, v)| r.with_tag(*k, v))
                    .with_tag(TAG_STAGE, stage);
                attach_event_id(internal_error_result(vec![]), sink.capture(report))
            }
            (Denial::Internal { stage, message }, _) => {
                result_from_error(InvocationError::internal_at(stage, message), sink, tags)
            }
            (_, SessionRole::User) | (Denial::NotAllowed, _) => {
                InvokeResult::error(codes::NOT_AUTHORIZED)
            }
            (Denial::RateLimited, _) => InvokeResult::error(codes::RATE_LIMITED),
            (Denial::Forbidden(permissions), _) => InvokeResult::error(codes::FORBIDDEN)
                .with_kwarg("permissions", permissions_to_value(&permissions)),
            (Denial::IdentityMissing(missing), _) => InvokeResult::error_with_args(
                codes::IDENTITY_MISSING,
                vec![Value::from(missing.to_string())],
            ),
            (Denial::InvalidArgument(reason), _) => {
                InvokeResult::error_with_args(codes::INVALID_ARGUMENT, vec![Value::from(reason)])
            }
        }
    }
}

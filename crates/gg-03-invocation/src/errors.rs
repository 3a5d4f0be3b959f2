//! Invocation errors and their conversion into result envelopes.

use gg_telemetry::{ErrorReport, ErrorSink, EventId, TAG_STAGE};
use shared_bus::{codes, InvokeResult};
use shared_types::{Dict, List, Value};
use thiserror::Error;
use tracing::warn;

/// Keyword holding the error-report id on internal error envelopes.
pub const KWARG_EVENT_ID: &str = "event_id";
/// Keyword holding the failure description on internal error envelopes.
pub const KWARG_ERROR: &str = "error";
/// Keyword naming the pipeline step that failed.
pub const KWARG_TRACE: &str = "trace";

/// Failure raised by a procedure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvocationError {
    /// Pre-classified error, passed through verbatim.
    #[error("{code}")]
    Application { code: String, args: List, kwargs: Dict },

    /// Error returned by a downstream call the procedure made itself.
    #[error("remote error {code}")]
    Remote { code: String, args: List, kwargs: Dict },

    /// Anything else.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        stage: Option<&'static str>,
    },
}

impl InvocationError {
    /// Classified error with positional diagnostics.
    pub fn application(code: impl Into<String>, args: List) -> Self {
        InvocationError::Application {
            code: code.into(),
            args,
            kwargs: Dict::new(),
        }
    }

    /// Wrap a downstream error envelope.
    ///
    /// A successful envelope is not an error; it is mapped to an internal
    /// failure so it cannot be mistaken for one.
    pub fn remote(result: InvokeResult) -> Self {
        match result.error {
            Some(code) => InvocationError::Remote {
                code,
                args: result.args,
                kwargs: result.kwargs,
            },
            None => InvocationError::internal("remote call reported success as an error"),
        }
    }

    pub fn internal(message: impl ToString) -> Self {
        InvocationError::Internal {
            message: message.to_string(),
            stage: None,
        }
    }

    /// Unclassified failure raised by a named pipeline step.
    pub fn internal_at(stage: &'static str, message: impl ToString) -> Self {
        InvocationError::Internal {
            message: message.to_string(),
            stage: Some(stage),
        }
    }
}

/// Generic internal error envelope.
#[must_use]
pub fn internal_error_result(args: List) -> InvokeResult {
    InvokeResult::error_with_args(codes::INTERNAL, args)
}

/// Attach an error-report id. No-op when there is none.
#[must_use]
pub fn attach_event_id(result: InvokeResult, event_id: Option<EventId>) -> InvokeResult {
    match event_id {
        Some(id) => result.with_kwarg(KWARG_EVENT_ID, id.to_string()),
        None => result,
    }
}

/// Envelope mirroring a downstream error unchanged.
#[must_use]
pub fn remote_error_result(code: String, args: List, kwargs: Dict) -> InvokeResult {
    InvokeResult {
        args,
        kwargs,
        error: Some(code),
    }
}

/// Convert a procedure failure into its envelope.
///
/// Classified and remote errors pass through. Internal errors are reported
/// to `sink` with `tags` and become the generic internal error, carrying the
/// description and, if the sink stored the report, its id.
pub fn result_from_error(
    err: InvocationError,
    sink: &dyn ErrorSink,
    tags: &[(&str, String)],
) -> InvokeResult {
    match err {
        InvocationError::Application { code, args, kwargs } => InvokeResult {
            args,
            kwargs,
            error: Some(code),
        },
        InvocationError::Remote { code, args, kwargs } => remote_error_result(code, args, kwargs),
        InvocationError::Internal { message, stage } => {
            let mut report = ErrorReport::new(message.clone());
            for (key, value) in tags {
                report = report.with_tag(*key, value);
            }
            if let Some(stage) = stage {
                report = report.with_tag(TAG_STAGE, stage);
            }
            warn!(error = %message, stage = ?stage, "Internal invocation error");

            let mut result = internal_error_result(vec![Value::from("internal error")])
                .with_kwarg(KWARG_ERROR, message);
            if let Some(stage) = stage {
                result = result.with_kwarg(KWARG_TRACE, stage);
            }
            attach_event_id(result, sink.capture(report))
        }
    }
}

//! # Fault Boundary
//!
//! Runs one procedure invocation and turns whatever happens into an
//! envelope:
//!
//! | Outcome | Envelope |
//! |---------|----------|
//! | `Ok(result)` | `result` |
//! | `Err(Application / Remote)` | passed through |
//! | `Err(Internal)` | internal error, reported |
//! | panic | internal error, reported |
//!
//! Reports are tagged with the invocation's request id, registration id and
//! calling session id. A panicking procedure only fails its own invocation.

use crate::errors::{attach_event_id, internal_error_result, result_from_error, InvocationError};
use async_trait::async_trait;
use futures::FutureExt;
use gg_telemetry::{ErrorReport, ErrorSink, TAG_REGISTRATION_ID, TAG_REQUEST_ID, TAG_SESSION_ID};
use shared_bus::{Invocation, InvocationHandler, InvokeResult};
use shared_types::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::error;

/// Procedure implementation that may fail.
#[async_trait]
pub trait Procedure: Send + Sync {
    async fn call(&self, invocation: Invocation) -> Result<InvokeResult, InvocationError>;
}

/// Adapter turning an async closure into a [`Procedure`].
pub struct ProcedureFn<F> {
    f: F,
}

/// Wrap an async closure as a [`Procedure`].
pub fn procedure_fn<F, Fut>(f: F) -> ProcedureFn<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<InvokeResult, InvocationError>> + Send,
{
    ProcedureFn { f }
}

#[async_trait]
impl<F, Fut> Procedure for ProcedureFn<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<InvokeResult, InvocationError>> + Send,
{
    async fn call(&self, invocation: Invocation) -> Result<InvokeResult, InvocationError> {
        (self.f)(invocation).await
    }
}

/// A plain [`InvocationHandler`] seen as a procedure that never errors.
struct HandlerProcedure(Arc<dyn InvocationHandler>);

#[async_trait]
impl Procedure for HandlerProcedure {
    async fn call(&self, invocation: Invocation) -> Result<InvokeResult, InvocationError> {
        Ok(self.0.invoke(invocation).await)
    }
}

/// Per-invocation crash containment around a [`Procedure`].
pub struct FaultBoundary {
    procedure: Arc<dyn Procedure>,
    sink: Arc<dyn ErrorSink>,
}

impl FaultBoundary {
    pub fn new(procedure: Arc<dyn Procedure>, sink: Arc<dyn ErrorSink>) -> Self {
        Self { procedure, sink }
    }

    /// Contain panics of a handler that already answers with envelopes.
    pub fn for_handler(handler: Arc<dyn InvocationHandler>, sink: Arc<dyn ErrorSink>) -> Self {
        Self::new(Arc::new(HandlerProcedure(handler)), sink)
    }
}

fn invocation_tags(invocation: &Invocation) -> [(&'static str, String); 3] {
    [
        (TAG_REQUEST_ID, invocation.request.to_string()),
        (TAG_REGISTRATION_ID, invocation.registration.to_string()),
        (TAG_SESSION_ID, invocation.caller.to_string()),
    ]
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[async_trait]
impl InvocationHandler for FaultBoundary {
    async fn invoke(&self, invocation: Invocation) -> InvokeResult {
        let tags = invocation_tags(&invocation);

        let outcome = AssertUnwindSafe(self.procedure.call(invocation))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => result_from_error(err, self.sink.as_ref(), &tags),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    request_id = %tags[0].1,
                    registration_id = %tags[1].1,
                    session_id = %tags[2].1,
                    panic = %message,
                    "Procedure panicked"
                );
                let report = tags
                    .iter()
                    .fold(ErrorReport::new(format!("panic: {message}")), |r, (k, v)| {
                        r.with_tag(*k, v)
                    });
                attach_event_id(
                    internal_error_result(vec![Value::from("internal error")]),
                    self.sink.capture(report),
                )
            }
        }
    }
}

//! # Invocation Subsystem (gg-03)
//!
//! The result/fault boundary around procedure code.
//!
//! Every outcome leaves as an [`InvokeResult`](shared_bus::InvokeResult)
//! envelope. Three error shapes exist:
//!
//! 1. a pre-classified application error, passed through verbatim;
//! 2. an error from a downstream call the procedure made, propagated unchanged;
//! 3. anything else, mapped to the internal error code with the description
//!    attached and, when the error sink stored a report, its `event_id`.
//!
//! [`FaultBoundary`] applies this per invocation and also contains panics.
//! [`guard_user`] re-checks rate limit and permissions on the callee side.

pub mod boundary;
pub mod errors;
pub mod guard;

pub use boundary::{procedure_fn, FaultBoundary, Procedure, ProcedureFn};
pub use errors::{
    attach_event_id, internal_error_result, remote_error_result, result_from_error,
    InvocationError, KWARG_ERROR, KWARG_EVENT_ID, KWARG_TRACE,
};
pub use guard::{guard_user, UserGuard, STAGE_PERMISSION, STAGE_RATE_LIMIT};

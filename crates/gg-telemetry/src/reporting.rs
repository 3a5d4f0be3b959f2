//! # Error Reporting
//!
//! Internal failures at the gate are reported to an [`ErrorSink`] together
//! with the identifiers needed to find the request again. The sink hands back
//! an [`EventId`] that callers attach to the error envelope, so an operator
//! can correlate a client-visible failure with the stored report.
//!
//! | Sink | Use |
//! |------|-----|
//! | [`TracingErrorSink`] | Production: emits the report as an `error!` event |
//! | [`MemoryErrorSink`] | Tests: keeps reports for inspection |
//! | [`DisabledErrorSink`] | Reporting turned off: never yields an id |

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Tag holding the bus request id.
pub const TAG_REQUEST_ID: &str = "request_id";
/// Tag holding the procedure registration id.
pub const TAG_REGISTRATION_ID: &str = "registration_id";
/// Tag holding the session id.
pub const TAG_SESSION_ID: &str = "session_id";
/// Tag naming the pipeline step that failed.
pub const TAG_STAGE: &str = "stage";

/// Identifier of a stored error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reference ids are shown without dashes.
        write!(f, "{}", self.0.simple())
    }
}

/// One captured failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    pub tags: BTreeMap<String, String>,
}

impl ErrorReport {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Add a tag (builder style).
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.tags.insert(key.into(), value.to_string());
        self
    }

    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Destination for internal failure reports.
pub trait ErrorSink: Send + Sync {
    /// Store a report. Returns its id, or `None` if nothing was stored.
    fn capture(&self, report: ErrorReport) -> Option<EventId>;
}

impl<S: ErrorSink + ?Sized> ErrorSink for Arc<S> {
    fn capture(&self, report: ErrorReport) -> Option<EventId> {
        (**self).capture(report)
    }
}

/// Emits every report as a structured `error!` event.
#[derive(Debug, Clone)]
pub struct TracingErrorSink {
    service: String,
}

impl TracingErrorSink {
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl ErrorSink for TracingErrorSink {
    fn capture(&self, report: ErrorReport) -> Option<EventId> {
        let id = EventId::new();
        tracing::error!(
            service = %self.service,
            event_id = %id,
            request_id = report.tag(TAG_REQUEST_ID),
            registration_id = report.tag(TAG_REGISTRATION_ID),
            session_id = report.tag(TAG_SESSION_ID),
            stage = report.tag(TAG_STAGE),
            tags = ?report.tags,
            "{}",
            report.message
        );
        Some(id)
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemoryErrorSink {
    reports: Mutex<Vec<(EventId, ErrorReport)>>,
}

impl MemoryErrorSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything captured so far.
    #[must_use]
    pub fn reports(&self) -> Vec<(EventId, ErrorReport)> {
        self.reports.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl ErrorSink for MemoryErrorSink {
    fn capture(&self, report: ErrorReport) -> Option<EventId> {
        let id = EventId::new();
        self.reports.lock().push((id, report));
        Some(id)
    }
}

/// Drops every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledErrorSink;

impl ErrorSink for DisabledErrorSink {
    fn capture(&self, report: ErrorReport) -> Option<EventId> {
        tracing::debug!(message = %report.message, "Error reporting disabled");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_reports() {
        let sink = MemoryErrorSink::new();
        let report = ErrorReport::new("store unreachable")
            .with_tag(TAG_SESSION_ID, 7)
            .with_tag(TAG_STAGE, "rate_limit_check");

        let id = sink.capture(report).expect("id");
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, id);
        assert_eq!(reports[0].1.tag(TAG_SESSION_ID), Some("7"));
        assert_eq!(reports[0].1.tag(TAG_STAGE), Some("rate_limit_check"));
    }

    #[test]
    fn test_event_ids_are_unique() {
        let sink = MemoryErrorSink::new();
        let a = sink.capture(ErrorReport::new("a"));
        let b = sink.capture(ErrorReport::new("b"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_disabled_sink_yields_nothing() {
        assert!(DisabledErrorSink.capture(ErrorReport::new("x")).is_none());
    }

    #[test]
    fn test_tracing_sink_yields_id() {
        let sink = TracingErrorSink::new("guild-gate");
        let id = sink.capture(ErrorReport::new("boom")).expect("id");
        assert_eq!(id.to_string().len(), 32);
    }

    #[test]
    fn test_report_serializes() {
        let report = ErrorReport::new("boom").with_tag(TAG_REQUEST_ID, 3);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["tags"]["request_id"], "3");
    }
}

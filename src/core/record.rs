//! Log record structure

use super::fields::FieldValue;
use super::severity::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Structured exception capture attached to a record.
///
/// Present only when the call site was inside an error-handling scope
/// that chose to attach one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    /// Error kind or type name
    pub kind: String,
    /// Error message
    pub message: String,
    /// Rendered trace, if one was captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl ExceptionInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            trace: None,
        }
    }

    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Capture an error and its source chain as the trace.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut trace = String::new();
        let mut source = error.source();
        while let Some(cause) = source {
            if !trace.is_empty() {
                trace.push_str("; ");
            }
            trace.push_str(&cause.to_string());
            source = cause.source();
        }

        let info = Self::new("error", error.to_string());
        if trace.is_empty() {
            info
        } else {
            info.with_trace(trace)
        }
    }

    /// Render as a single-line `kind: message` string for output fields.
    pub fn render(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

/// Immutable snapshot of one logging event.
///
/// A record is constructed at the call site and never mutated afterwards:
/// the formatter and sinks only observe it, so the listener can hand the
/// same record to every sink without copying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    /// Hierarchical name of the emitting subsystem, e.g. `etl.extract`
    pub logger: String,
    /// Pre-rendered message text; arguments are interpolated before the
    /// record is built, never re-parsed by the formatter
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
    /// Open caller-supplied context; colliding keys never override the
    /// fixed attributes above (enforced by the formatter merge order)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, FieldValue>,
}

impl Record {
    /// Sanitize the message so one record always renders as one line.
    ///
    /// Replaces newlines, carriage returns, and tabs with escape
    /// sequences to prevent injected fake log entries.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    /// Create a record; the timestamp is captured now, not at format time.
    pub fn new(severity: Severity, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            logger: logger.into(),
            message: Self::sanitize_message(&message.into()),
            exception: None,
            fields: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    #[must_use]
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: HashMap<String, FieldValue>) -> Self {
        self.fields.extend(fields);
        self
    }
}

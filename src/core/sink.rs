//! Sink trait for record destinations

use super::error::Result;
use super::record::Record;
use super::severity::Severity;

/// One output destination with its own formatter, threshold, and filter.
///
/// Sinks are only ever written to from the listener thread, so the write
/// path needs no internal locking. `accepts` must be pure: the listener
/// consults it per record, per sink, before calling `write`.
pub trait Sink: Send {
    fn write(&mut self, record: &Record) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;

    /// Whether this sink wants records of the given severity
    /// (minimum level and optional filter combined).
    fn accepts(&self, severity: Severity) -> bool;
}

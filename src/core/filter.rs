//! Severity filters for sinks

use super::severity::Severity;
use std::fmt;
use std::str::FromStr;

/// Pure predicate over a record's severity.
///
/// A sink may carry both a minimum level and a filter; a record must pass
/// both to be written. `BelowError` is the stdout/stderr split: it keeps
/// non-error records out of the error stream's sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFilter {
    /// Pass only Debug, Info, and Warning
    BelowError,
    /// Pass records at or above the given severity
    AtOrAbove(Severity),
}

impl SinkFilter {
    pub fn accept(&self, severity: Severity) -> bool {
        match self {
            SinkFilter::BelowError => severity < Severity::Error,
            SinkFilter::AtOrAbove(threshold) => severity >= *threshold,
        }
    }
}

impl fmt::Display for SinkFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkFilter::BelowError => write!(f, "below_error"),
            SinkFilter::AtOrAbove(severity) => write!(f, "at_or_above:{}", severity),
        }
    }
}

impl FromStr for SinkFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized == "below_error" {
            return Ok(SinkFilter::BelowError);
        }
        if let Some(level) = normalized.strip_prefix("at_or_above:") {
            let severity = level
                .parse::<Severity>()
                .map_err(|e| format!("Invalid filter threshold: {}", e))?;
            return Ok(SinkFilter::AtOrAbove(severity));
        }
        Err(format!("Unknown filter: '{}'", s))
    }
}

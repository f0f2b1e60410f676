//! Console sink implementation
//!
//! One sink per stream: the conventional setup is a stdout sink filtered
//! to non-error severities and a stderr sink for ERROR and above, so the
//! two streams split cleanly.

use crate::core::{JsonFormatter, Record, Result, Severity, Sink, SinkFilter};
use colored::Colorize;
use std::io::Write;

/// Which standard stream this sink owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

impl ConsoleTarget {
    fn as_str(&self) -> &'static str {
        match self {
            ConsoleTarget::Stdout => "console:stdout",
            ConsoleTarget::Stderr => "console:stderr",
        }
    }
}

pub struct ConsoleSink {
    target: ConsoleTarget,
    formatter: JsonFormatter,
    min_level: Severity,
    filter: Option<SinkFilter>,
    /// Human-readable colored text instead of JSONL
    text_mode: bool,
    use_colors: bool,
}

impl ConsoleSink {
    /// JSONL sink on the given stream, accepting every severity.
    pub fn new(target: ConsoleTarget) -> Self {
        Self {
            target,
            formatter: JsonFormatter::new(),
            min_level: Severity::Debug,
            filter: None,
            text_mode: false,
            use_colors: true,
        }
    }

    /// The conventional low-severity stream: stdout, non-errors only.
    pub fn stdout_below_error() -> Self {
        Self::new(ConsoleTarget::Stdout).with_filter(SinkFilter::BelowError)
    }

    /// The conventional high-severity stream: stderr, ERROR and above.
    pub fn stderr_errors() -> Self {
        Self::new(ConsoleTarget::Stderr).with_filter(SinkFilter::AtOrAbove(Severity::Error))
    }

    #[must_use]
    pub fn with_min_level(mut self, min_level: Severity) -> Self {
        self.min_level = min_level;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: SinkFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: JsonFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Switch to human-readable text output with optional colors.
    #[must_use]
    pub fn with_text_format(mut self, use_colors: bool) -> Self {
        self.text_mode = true;
        self.use_colors = use_colors;
        self
    }

    fn format_text(&self, record: &Record) -> String {
        let level_str = if self.use_colors {
            format!("{:8}", record.severity.to_str())
                .color(record.severity.color_code())
                .to_string()
        } else {
            format!("{:8}", record.severity.to_str())
        };

        let mut line = format!(
            "[{}] [{}] {} - {}",
            record.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            level_str,
            record.logger,
            record.message
        );

        if let Some(ref exception) = record.exception {
            line.push_str(&format!(" ({})", exception.render()));
        }

        if !record.fields.is_empty() {
            let fields = record
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            line.push(' ');
            line.push_str(&fields);
        }

        line
    }
}

impl Sink for ConsoleSink {
    fn write(&mut self, record: &Record) -> Result<()> {
        let line = if self.text_mode {
            self.format_text(record)
        } else {
            self.formatter.format(record)
        };

        match self.target {
            ConsoleTarget::Stdout => writeln!(std::io::stdout().lock(), "{}", line)?,
            ConsoleTarget::Stderr => writeln!(std::io::stderr().lock(), "{}", line)?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.target {
            ConsoleTarget::Stdout => std::io::stdout().flush()?,
            ConsoleTarget::Stderr => std::io::stderr().flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        self.target.as_str()
    }

    fn accepts(&self, severity: Severity) -> bool {
        severity >= self.min_level && self.filter.map_or(true, |f| f.accept(severity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_split_rejects_errors() {
        let sink = ConsoleSink::stdout_below_error();
        assert!(sink.accepts(Severity::Debug));
        assert!(sink.accepts(Severity::Info));
        assert!(sink.accepts(Severity::Warning));
        assert!(!sink.accepts(Severity::Error));
        assert!(!sink.accepts(Severity::Critical));
    }

    #[test]
    fn test_stderr_split_rejects_non_errors() {
        let sink = ConsoleSink::stderr_errors();
        assert!(!sink.accepts(Severity::Warning));
        assert!(sink.accepts(Severity::Error));
        assert!(sink.accepts(Severity::Critical));
    }

    #[test]
    fn test_min_level_and_filter_combine() {
        // Filter passes Warning but the threshold is Error: both must pass.
        let sink = ConsoleSink::new(ConsoleTarget::Stdout)
            .with_min_level(Severity::Error)
            .with_filter(SinkFilter::AtOrAbove(Severity::Warning));
        assert!(!sink.accepts(Severity::Warning));
        assert!(sink.accepts(Severity::Error));
    }

    #[test]
    fn test_text_format_contains_fields() {
        let sink = ConsoleSink::new(ConsoleTarget::Stdout).with_text_format(false);
        let record = Record::new(Severity::Warning, "etl.transform", "issue").with_field("row", 42);
        let line = sink.format_text(&record);
        assert!(line.contains("WARNING"));
        assert!(line.contains("etl.transform"));
        assert!(line.contains("issue"));
        assert!(line.contains("row=42"));
    }

    #[test]
    fn test_sink_names() {
        assert_eq!(ConsoleSink::stdout_below_error().name(), "console:stdout");
        assert_eq!(ConsoleSink::stderr_errors().name(), "console:stderr");
    }
}

//! Structured line formatter
//!
//! Serializes a [`Record`] into one self-contained JSON line (JSONL).
//! Fixed record attributes always win over caller-supplied extras, and a
//! serialization fault degrades to a minimal text rendering instead of
//! losing the record.

use super::record::Record;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Canonical output keys for the fixed record attributes.
const KEY_MESSAGE: &str = "message";
const KEY_TIMESTAMP: &str = "timestamp";
const KEY_LEVEL: &str = "level";
const KEY_LOGGER: &str = "logger";
const KEY_EXC_INFO: &str = "exc_info";
const KEY_STACK_INFO: &str = "stack_info";

/// ISO-8601 UTC with millisecond precision, e.g. `2025-01-08T10:30:45.123Z`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// JSONL formatter with configurable output-key remapping.
///
/// `with_key("severity", "levelname")` renames the level field to the
/// output key `severity`; the default `level` key is then not emitted.
///
/// # Example
///
/// ```
/// use log_pipeline::core::{JsonFormatter, Record, Severity};
///
/// let formatter = JsonFormatter::new();
/// let record = Record::new(Severity::Warning, "etl", "issue").with_field("row", 42);
/// let line = formatter.format(&record);
/// let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
/// assert_eq!(parsed["message"], "issue");
/// assert_eq!(parsed["row"], 42);
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    /// output key -> record attribute name
    key_map: HashMap<String, String>,
}

impl JsonFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a record attribute to a different output key.
    ///
    /// Recognized attribute names: `message`, `timestamp`, `level` (alias
    /// `levelname`), `logger` (alias `name`). Unknown attributes emit
    /// JSON `null` under the requested key.
    #[must_use]
    pub fn with_key(mut self, output_key: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.key_map.insert(output_key.into(), attribute.into());
        self
    }

    /// Resolve an attribute name to its canonical fixed key, if known.
    fn canonical_key(attribute: &str) -> Option<&'static str> {
        match attribute {
            "message" => Some(KEY_MESSAGE),
            "timestamp" => Some(KEY_TIMESTAMP),
            "level" | "levelname" => Some(KEY_LEVEL),
            "logger" | "name" => Some(KEY_LOGGER),
            _ => None,
        }
    }

    /// Format a record as one JSON line.
    ///
    /// Never fails: if the payload cannot be serialized, a minimal
    /// `SEVERITY message` text line is returned instead so the record is
    /// not lost.
    pub fn format(&self, record: &Record) -> String {
        let mut payload = Map::new();

        // Fixed attribute values, keyed by canonical output key. Entries
        // are removed as remapping consumes them so the default key is
        // never duplicated.
        let mut fixed: HashMap<&'static str, Value> = HashMap::from([
            (KEY_MESSAGE, Value::String(record.message.clone())),
            (
                KEY_TIMESTAMP,
                Value::String(record.timestamp.format(TIMESTAMP_FORMAT).to_string()),
            ),
            (KEY_LEVEL, Value::String(record.severity.to_str().to_string())),
            (KEY_LOGGER, Value::String(record.logger.clone())),
        ]);

        if let Some(ref exception) = record.exception {
            payload.insert(KEY_EXC_INFO.to_string(), Value::String(exception.render()));
            if let Some(ref trace) = exception.trace {
                payload.insert(KEY_STACK_INFO.to_string(), Value::String(trace.clone()));
            }
        }

        // Remapped fields first: each consumes its default key.
        for (output_key, attribute) in &self.key_map {
            let value = match Self::canonical_key(attribute) {
                Some(key) => fixed
                    .remove(key)
                    .unwrap_or_else(|| Self::fixed_value(record, key)),
                None => Value::Null,
            };
            payload.insert(output_key.clone(), value);
        }

        // Remaining fixed fields under their default keys.
        for (key, value) in fixed {
            payload.insert(key.to_string(), value);
        }

        // Extras last: a key already present (fixed or remapped) is never
        // overridden, so caller fields cannot shadow the schema.
        for (key, value) in &record.fields {
            if !payload.contains_key(key) {
                payload.insert(key.clone(), value.to_json_value());
            }
        }

        match serde_json::to_string(&Value::Object(payload)) {
            Ok(line) => line,
            Err(_) => format!("{} {}", record.severity, record.message),
        }
    }

    /// Recompute a fixed attribute value after its default entry was
    /// already consumed (two output keys mapping the same attribute).
    fn fixed_value(record: &Record, key: &str) -> Value {
        match key {
            KEY_MESSAGE => Value::String(record.message.clone()),
            KEY_TIMESTAMP => Value::String(record.timestamp.format(TIMESTAMP_FORMAT).to_string()),
            KEY_LEVEL => Value::String(record.severity.to_str().to_string()),
            KEY_LOGGER => Value::String(record.logger.clone()),
            _ => Value::Null,
        }
    }
}

//! Declarative pipeline configuration
//!
//! Mirrors the builder API as a serde document so deployments can keep
//! their sink layout in a JSON file instead of code:
//!
//! ```json
//! {
//!   "queue": { "capacity": 10000, "overflow": "drop_newest" },
//!   "sinks": [
//!     { "type": "console", "target": "stdout", "filter": "below_error" },
//!     { "type": "console", "target": "stderr", "filter": "at_or_above:ERROR" },
//!     { "type": "rotating_file", "path": "logs/app.log.jsonl",
//!       "max_bytes": 10485760, "backup_count": 5 }
//!   ]
//! }
//! ```

use crate::core::{
    JsonFormatter, OverflowPolicy, PipelineBuilder, PipelineError, Result, Severity, Sink,
    SinkFilter,
};
use crate::sinks::{ConsoleSink, ConsoleTarget, RotatingFileSink, RotationPolicy};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub queue: QueueConfig,
    pub sinks: Vec<SinkConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    /// Omit for an unbounded queue.
    pub capacity: Option<usize>,
    /// "block" or "drop_newest"; only meaningful with a capacity.
    pub overflow: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    Console {
        /// "stdout" or "stderr"
        target: String,
        /// "json" (default) or "text"
        format: Option<String>,
        min_level: Option<Severity>,
        filter: Option<String>,
        key_map: Option<HashMap<String, String>>,
    },
    RotatingFile {
        path: String,
        max_bytes: Option<u64>,
        backup_count: Option<usize>,
        min_level: Option<Severity>,
        filter: Option<String>,
        key_map: Option<HashMap<String, String>>,
    },
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sinks.is_empty() {
            return Err(PipelineError::config("pipeline", "at least one sink is required"));
        }
        if self.queue.capacity.is_none() && self.queue.overflow.is_some() {
            return Err(PipelineError::config(
                "queue",
                "overflow policy requires a capacity",
            ));
        }
        Ok(())
    }

    /// Build the configured sinks, in declaration order.
    pub fn build_sinks(&self) -> Result<Vec<Box<dyn Sink>>> {
        self.sinks.iter().map(|sink| sink.build()).collect()
    }

    /// Apply this config to a builder: sinks plus queue bounds.
    pub fn apply(&self, mut builder: PipelineBuilder) -> Result<PipelineBuilder> {
        builder = builder.sinks(self.build_sinks()?);
        if let Some(capacity) = self.queue.capacity {
            builder = builder.bounded(capacity, self.overflow_policy()?);
        }
        Ok(builder)
    }

    fn overflow_policy(&self) -> Result<OverflowPolicy> {
        match self.queue.overflow.as_deref() {
            None | Some("drop_newest") => Ok(OverflowPolicy::DropNewest),
            Some("block") => Ok(OverflowPolicy::Block),
            Some(other) => Err(PipelineError::config(
                "queue",
                format!("unknown overflow policy '{}'", other),
            )),
        }
    }
}

impl SinkConfig {
    fn build(&self) -> Result<Box<dyn Sink>> {
        match self {
            SinkConfig::Console {
                target,
                format,
                min_level,
                filter,
                key_map,
            } => {
                let target = match target.as_str() {
                    "stdout" => ConsoleTarget::Stdout,
                    "stderr" => ConsoleTarget::Stderr,
                    other => {
                        return Err(PipelineError::config(
                            "console",
                            format!("unknown target '{}'", other),
                        ))
                    }
                };

                let mut sink = ConsoleSink::new(target);
                match format.as_deref() {
                    None | Some("json") => {
                        sink = sink.with_formatter(build_formatter(key_map));
                    }
                    Some("text") => sink = sink.with_text_format(true),
                    Some(other) => {
                        return Err(PipelineError::config(
                            "console",
                            format!("unknown format '{}'", other),
                        ))
                    }
                }
                if let Some(min_level) = min_level {
                    sink = sink.with_min_level(*min_level);
                }
                if let Some(filter) = filter {
                    sink = sink.with_filter(parse_filter("console", filter)?);
                }
                Ok(Box::new(sink))
            }
            SinkConfig::RotatingFile {
                path,
                max_bytes,
                backup_count,
                min_level,
                filter,
                key_map,
            } => {
                let defaults = RotationPolicy::default();
                let policy = RotationPolicy {
                    max_bytes: max_bytes.unwrap_or(defaults.max_bytes),
                    backup_count: backup_count.unwrap_or(defaults.backup_count),
                };

                let mut sink = RotatingFileSink::with_policy(path, policy)?
                    .with_formatter(build_formatter(key_map));
                if let Some(min_level) = min_level {
                    sink = sink.with_min_level(*min_level);
                }
                if let Some(filter) = filter {
                    sink = sink.with_filter(parse_filter("rotating_file", filter)?);
                }
                Ok(Box::new(sink))
            }
        }
    }
}

fn build_formatter(key_map: &Option<HashMap<String, String>>) -> JsonFormatter {
    let mut formatter = JsonFormatter::new();
    if let Some(key_map) = key_map {
        for (output_key, attribute) in key_map {
            formatter = formatter.with_key(output_key, attribute);
        }
    }
    formatter
}

fn parse_filter(component: &str, raw: &str) -> Result<SinkFilter> {
    raw.parse()
        .map_err(|e: String| PipelineError::config(component, e))
}

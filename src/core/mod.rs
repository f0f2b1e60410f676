//! Core pipeline types and traits

pub mod error;
pub mod fields;
pub mod filter;
pub mod formatter;
pub mod handler;
pub mod listener;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod severity;
pub mod sink;

pub use error::{PipelineError, Result};
pub use fields::FieldValue;
pub use filter::SinkFilter;
pub use formatter::JsonFormatter;
pub use handler::{OverflowPolicy, QueueHandler};
pub use listener::{ListenerState, QueueListener};
pub use metrics::PipelineMetrics;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineHandle};
pub use record::{ExceptionInfo, Record};
pub use registry::HandlerRegistry;
pub use severity::Severity;
pub use sink::Sink;

//! # Log Pipeline
//!
//! An asynchronous structured logging pipeline: producers enqueue immutable
//! records through a non-blocking handler, a single background worker
//! drains the queue and dispatches each record to every attached sink.
//!
//! ## Features
//!
//! - **Non-blocking Producers**: `enqueue` never does IO on the caller's thread
//! - **Structured Output**: one self-contained JSON line per record (JSONL)
//! - **Severity Split**: stdout for routine output, stderr for errors
//! - **Rotating Files**: size-based rotation with numbered backups
//! - **Clean Shutdown**: `stop` drains every enqueued record before returning
//!
//! ## Example
//!
//! ```no_run
//! use log_pipeline::prelude::*;
//!
//! fn main() -> log_pipeline::core::Result<()> {
//!     let mut handle = Pipeline::builder()
//!         .sink(ConsoleSink::stdout_below_error())
//!         .sink(ConsoleSink::stderr_errors())
//!         .sink(RotatingFileSink::new("logs/app.log.jsonl")?)
//!         .install("queue_handler");
//!     handle.start();
//!
//!     let handler = HandlerRegistry::lookup("queue_handler")
//!         .ok_or_else(|| PipelineError::other("pipeline not installed"))?;
//!     handler.enqueue(
//!         Record::new(Severity::Info, "app", "started").with_field("pid", 4242),
//!     )?;
//!
//!     handle.stop();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::config::{PipelineConfig, QueueConfig, SinkConfig};
    pub use crate::core::{
        ExceptionInfo, FieldValue, HandlerRegistry, JsonFormatter, ListenerState, OverflowPolicy,
        Pipeline, PipelineBuilder, PipelineError, PipelineHandle, PipelineMetrics, QueueHandler,
        QueueListener, Record, Result, Severity, Sink, SinkFilter,
    };
    pub use crate::sinks::{ConsoleSink, ConsoleTarget, RotatingFileSink, RotationPolicy};
}

pub use config::PipelineConfig;
pub use core::{
    ExceptionInfo, FieldValue, HandlerRegistry, JsonFormatter, ListenerState, OverflowPolicy,
    Pipeline, PipelineBuilder, PipelineError, PipelineHandle, PipelineMetrics, QueueHandler,
    QueueListener, Record, Result, Severity, Sink, SinkFilter,
};
pub use sinks::{ConsoleSink, ConsoleTarget, RotatingFileSink, RotationPolicy};

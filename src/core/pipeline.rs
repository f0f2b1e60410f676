//! Pipeline assembly and lifecycle
//!
//! A pipeline is built explicitly from sinks and a queue, installed under
//! a registry name, started once, and stopped once at process exit. There
//! is no ambient global pipeline; the registry is the only intentional
//! global, and it only stores handles that were installed through here.

use super::error::Result;
use super::handler::{OverflowPolicy, QueueHandler, QueueMessage};
use super::listener::{ListenerState, QueueListener};
use super::metrics::PipelineMetrics;
use super::registry::HandlerRegistry;
use super::sink::Sink;
use crossbeam_channel::{bounded, unbounded, Receiver};
use std::sync::Arc;

/// Entry point for building a logging pipeline.
///
/// # Example
///
/// ```no_run
/// use log_pipeline::prelude::*;
///
/// let mut handle = Pipeline::builder()
///     .sink(ConsoleSink::stdout_below_error())
///     .sink(ConsoleSink::stderr_errors())
///     .install("queue_handler");
/// handle.start();
///
/// let handler = HandlerRegistry::lookup("queue_handler").unwrap();
/// let _ = handler.enqueue(Record::new(Severity::Info, "app", "started"));
///
/// handle.stop();
/// ```
pub struct Pipeline;

impl Pipeline {
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }
}

/// Fluent builder collecting sinks and queue options.
pub struct PipelineBuilder {
    sinks: Vec<Box<dyn Sink>>,
    capacity: Option<usize>,
    overflow_policy: OverflowPolicy,
}

impl PipelineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            capacity: None,
            overflow_policy: OverflowPolicy::default(),
        }
    }

    /// Attach a sink. Records are dispatched to sinks in the order they
    /// were attached.
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Attach an already-boxed sink (e.g. from config loading).
    #[must_use = "builder methods return a new value"]
    pub fn boxed_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Attach several boxed sinks at once, preserving order.
    #[must_use = "builder methods return a new value"]
    pub fn sinks(mut self, sinks: Vec<Box<dyn Sink>>) -> Self {
        self.sinks.extend(sinks);
        self
    }

    /// Use a bounded queue with an explicit overflow policy.
    ///
    /// Without this the queue is unbounded and `enqueue` never blocks.
    #[must_use = "builder methods return a new value"]
    pub fn bounded(mut self, capacity: usize, policy: OverflowPolicy) -> Self {
        self.capacity = Some(capacity);
        self.overflow_policy = policy;
        self
    }

    /// Build the pipeline and register its handler under `name`.
    ///
    /// Registration is last-writer-wins; an existing handler under the
    /// same name is replaced. The listener is not running until
    /// [`PipelineHandle::start`] is called.
    #[must_use]
    pub fn install(self, name: impl Into<String>) -> PipelineHandle {
        let mut handle = self.build();
        let name = name.into();
        HandlerRegistry::register(&name, handle.handler());
        handle.name = Some(name);
        handle
    }

    /// Build the pipeline without registering the handler.
    #[must_use]
    pub fn build(self) -> PipelineHandle {
        let metrics = Arc::new(PipelineMetrics::new());
        let (sender, receiver) = match self.capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };
        let handler = QueueHandler::new(
            sender,
            self.capacity,
            self.overflow_policy,
            Arc::clone(&metrics),
        );

        PipelineHandle {
            name: None,
            handler,
            pending: Some((receiver, self.sinks)),
            listener: None,
            metrics,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of a pipeline's lifecycle.
///
/// `start` spawns the listener worker; `stop` closes the handler, drains
/// every record enqueued before the stop request, flushes the sinks, and
/// joins the worker. Both are idempotent; `stop` before `start` is a
/// no-op. Dropping the handle stops it, so records are not lost if the
/// caller forgets.
pub struct PipelineHandle {
    name: Option<String>,
    handler: QueueHandler,
    pending: Option<(Receiver<QueueMessage>, Vec<Box<dyn Sink>>)>,
    listener: Option<QueueListener>,
    metrics: Arc<PipelineMetrics>,
}

impl PipelineHandle {
    /// Clone of the producer-side handler.
    #[must_use]
    pub fn handler(&self) -> QueueHandler {
        self.handler.clone()
    }

    /// The registry name this pipeline was installed under, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Start the background listener. Records enqueued before `start`
    /// are sitting in the queue and get dispatched first.
    pub fn start(&mut self) {
        if let Some((receiver, sinks)) = self.pending.take() {
            self.listener = Some(QueueListener::start(
                receiver,
                sinks,
                Arc::clone(&self.metrics),
            ));
        }
    }

    /// Stop the pipeline: close the handler, drain the queue, flush the
    /// sinks, and join the worker.
    ///
    /// After `stop` returns, every record enqueued before the call has
    /// reached every sink that accepts it. Subsequent `enqueue` calls
    /// fail fast with `HandlerClosed`. The registry entry is left in
    /// place (the registry is a discovery mechanism, not an ownership
    /// authority); lookups after stop find a closed handler.
    pub fn stop(&mut self) {
        // Never started: nothing to drain, nothing to join.
        if self.pending.take().is_some() {
            self.handler.close();
            return;
        }

        if !self.handler.close() {
            // Already stopped; make repeated calls harmless.
            return;
        }

        if let Some(ref listener) = self.listener {
            listener.request_drain();
        }
        if let Some(ref mut listener) = self.listener {
            listener.join();
        }

        let dropped = self.metrics.dropped();
        if dropped > 0 {
            eprintln!(
                "[PIPELINE WARNING] pipeline stopped with {} dropped records (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
    }

    /// Current listener state (`Stopped` before `start`).
    pub fn state(&self) -> ListenerState {
        match self.listener {
            Some(ref listener) => listener.state(),
            None => ListenerState::Stopped,
        }
    }

    /// Shared pipeline counters.
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Convenience: enqueue through the owned handler.
    pub fn enqueue(&self, record: super::record::Record) -> Result<()> {
        self.handler.enqueue(record)
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

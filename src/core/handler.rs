//! Producer-side queue handler
//!
//! The handler is the only thing application threads touch: it accepts a
//! [`Record`] and enqueues it. Formatting, filtering, and I/O all happen
//! on the listener thread.

use super::error::{PipelineError, Result};
use super::metrics::PipelineMetrics;
use super::record::Record;
use crossbeam_channel::{Sender, TrySendError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What to do when a bounded queue is full.
///
/// The unbounded default never hits this; choosing a bounded queue forces
/// choosing one of these, so the full-queue behavior is always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Block the producer until space is available
    Block,
    /// Drop the new record, count the loss, and alert on stderr
    #[default]
    DropNewest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
        }
    }
}

/// Message on the pipeline queue. The shutdown sentinel is enqueued
/// behind all prior records, which is what makes drain-on-stop ordered.
pub(crate) enum QueueMessage {
    Record(Record),
    Shutdown,
}

struct HandlerInner {
    sender: Sender<QueueMessage>,
    closed: AtomicBool,
    capacity: Option<usize>,
    overflow_policy: OverflowPolicy,
    metrics: Arc<PipelineMetrics>,
}

/// Cheap-to-clone producer handle feeding the pipeline queue.
///
/// `enqueue` is constant-time and callable from any number of threads.
/// Records enqueued by one thread are delivered to sinks in enqueue
/// order; cross-thread interleaving is whatever order the queue sees.
#[derive(Clone)]
pub struct QueueHandler {
    inner: Arc<HandlerInner>,
}

impl QueueHandler {
    pub(crate) fn new(
        sender: Sender<QueueMessage>,
        capacity: Option<usize>,
        overflow_policy: OverflowPolicy,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(HandlerInner {
                sender,
                closed: AtomicBool::new(false),
                capacity,
                overflow_policy,
                metrics,
            }),
        }
    }

    /// Enqueue a record for asynchronous dispatch.
    ///
    /// Never performs I/O. With the default unbounded queue this does not
    /// block; with a bounded queue the configured [`OverflowPolicy`]
    /// applies. Overflow drops return `Ok`; the loss is counted in
    /// [`metrics`](Self::metrics) and alerted on stderr, per the
    /// documented DropNewest policy.
    ///
    /// # Errors
    ///
    /// Fails fast with [`PipelineError::HandlerClosed`] after the
    /// pipeline has been stopped; a record enqueued then would never be
    /// drained, and silent loss is worse than a visible error.
    pub fn enqueue(&self, record: Record) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(PipelineError::HandlerClosed);
        }

        match self.inner.sender.try_send(QueueMessage::Record(record)) {
            Ok(()) => {
                self.inner.metrics.record_enqueued();
                Ok(())
            }
            Err(TrySendError::Full(message)) => self.handle_overflow(message),
            Err(TrySendError::Disconnected(_)) => Err(PipelineError::HandlerClosed),
        }
    }

    /// Apply the configured overflow policy to a record that found the
    /// bounded queue full.
    fn handle_overflow(&self, message: QueueMessage) -> Result<()> {
        self.inner.metrics.record_queue_full();

        match self.inner.overflow_policy {
            OverflowPolicy::Block => {
                self.inner
                    .sender
                    .send(message)
                    .map_err(|_| PipelineError::HandlerClosed)?;
                self.inner.metrics.record_enqueued();
                Ok(())
            }
            OverflowPolicy::DropNewest => {
                let dropped = self.inner.metrics.record_dropped();

                // Alert on the first drop and every 1000th thereafter.
                if dropped == 0 || (dropped + 1) % 1000 == 0 {
                    eprintln!(
                        "[PIPELINE WARNING] Queue full (capacity {}), {} records dropped. \
                         Consider a larger queue or the Block policy.",
                        self.inner.capacity.unwrap_or(0),
                        dropped + 1
                    );
                }
                Ok(())
            }
        }
    }

    /// Close the handler and enqueue the shutdown sentinel.
    ///
    /// Returns `false` if the handler was already closed.
    pub(crate) fn close(&self) -> bool {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        // The sentinel sits behind every record enqueued before close, so
        // the listener drains them all before exiting. Blocking send: on
        // a bounded queue the sentinel must get through.
        let _ = self.inner.sender.send(QueueMessage::Shutdown);
        true
    }

    /// Whether the handler has been closed by a stop request.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Shared pipeline counters.
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.inner.metrics
    }
}

impl fmt::Debug for QueueHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueHandler")
            .field("closed", &self.is_closed())
            .field("capacity", &self.inner.capacity)
            .field("overflow_policy", &self.inner.overflow_policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::severity::Severity;
    use crossbeam_channel::{bounded, unbounded};

    fn test_record(message: &str) -> Record {
        Record::new(Severity::Info, "test", message)
    }

    #[test]
    fn test_enqueue_unbounded() {
        let (sender, receiver) = unbounded();
        let metrics = Arc::new(PipelineMetrics::new());
        let handler = QueueHandler::new(sender, None, OverflowPolicy::default(), metrics);

        for i in 0..100 {
            handler.enqueue(test_record(&format!("m{}", i))).unwrap();
        }

        assert_eq!(handler.metrics().enqueued(), 100);
        assert_eq!(receiver.len(), 100);
    }

    #[test]
    fn test_enqueue_after_close_fails_fast() {
        let (sender, _receiver) = unbounded();
        let metrics = Arc::new(PipelineMetrics::new());
        let handler = QueueHandler::new(sender, None, OverflowPolicy::default(), metrics);

        assert!(handler.close());
        assert!(!handler.close(), "second close is a no-op");

        let err = handler.enqueue(test_record("late")).unwrap_err();
        assert!(matches!(err, PipelineError::HandlerClosed));
    }

    #[test]
    fn test_drop_newest_counts_losses() {
        let (sender, receiver) = bounded(2);
        let metrics = Arc::new(PipelineMetrics::new());
        let handler = QueueHandler::new(sender, Some(2), OverflowPolicy::DropNewest, metrics);

        for i in 0..10 {
            handler.enqueue(test_record(&format!("m{}", i))).unwrap();
        }

        assert_eq!(handler.metrics().enqueued(), 2);
        assert_eq!(handler.metrics().dropped(), 8);
        assert_eq!(handler.metrics().queue_full_events(), 8);
        assert_eq!(receiver.len(), 2);
    }

    #[test]
    fn test_fifo_order_preserved() {
        let (sender, receiver) = unbounded();
        let metrics = Arc::new(PipelineMetrics::new());
        let handler = QueueHandler::new(sender, None, OverflowPolicy::default(), metrics);

        for i in 0..5 {
            handler.enqueue(test_record(&format!("m{}", i))).unwrap();
        }

        for i in 0..5 {
            match receiver.recv().unwrap() {
                QueueMessage::Record(record) => assert_eq!(record.message, format!("m{}", i)),
                QueueMessage::Shutdown => panic!("unexpected sentinel"),
            }
        }
    }
}

//! Pipeline counters for observability
//!
//! Tracks enqueue/dispatch volume, overflow drops, and per-sink write
//! failures so operators can see when the pipeline is degrading.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between the handler (producer side) and the listener
/// (consumer side).
///
/// # Example
///
/// ```
/// use log_pipeline::core::PipelineMetrics;
///
/// let metrics = PipelineMetrics::new();
/// metrics.record_enqueued();
/// metrics.record_dispatched();
/// assert_eq!(metrics.enqueued(), 1);
/// assert_eq!(metrics.dispatched(), 1);
/// ```
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Records accepted by the handler
    enqueued: AtomicU64,

    /// Records fully dispatched by the listener
    dispatched: AtomicU64,

    /// Records dropped (queue overflow, or every sink failed)
    dropped: AtomicU64,

    /// Per-sink write or format failures
    sink_errors: AtomicU64,

    /// Times a bounded queue was found full on enqueue
    queue_full_events: AtomicU64,
}

impl PipelineMetrics {
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            sink_errors: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_errors(&self) -> u64 {
        self.sink_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_error(&self) -> u64 {
        self.sink_errors.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Drop rate as a percentage of all records offered to the handler.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped() as f64;
        let total = self.enqueued() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }
}

impl Clone for PipelineMetrics {
    /// Snapshot of the current counter values
    fn clone(&self) -> Self {
        Self {
            enqueued: AtomicU64::new(self.enqueued()),
            dispatched: AtomicU64::new(self.dispatched()),
            dropped: AtomicU64::new(self.dropped()),
            sink_errors: AtomicU64::new(self.sink_errors()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
        }
    }
}

//! Consumer-side queue listener
//!
//! A single dedicated worker thread owns every sink and the dequeue loop.
//! Because it is the sole writer, sinks need no locking on the write
//! path, and records from one producer are dispatched in enqueue order.

use super::handler::QueueMessage;
use super::metrics::PipelineMetrics;
use super::record::Record;
use super::sink::Sink;
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

/// Listener lifecycle: `Stopped -> Running -> Draining -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Stopped = 0,
    Running = 1,
    Draining = 2,
}

impl ListenerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ListenerState::Running,
            2 => ListenerState::Draining,
            _ => ListenerState::Stopped,
        }
    }
}

/// Background worker that fans records out to the attached sinks.
pub struct QueueListener {
    state: Arc<AtomicU8>,
    handle: Option<thread::JoinHandle<()>>,
}

impl QueueListener {
    /// Spawn the worker thread over the queue's receiving end.
    ///
    /// Sinks are dispatched to in the order given here, for every record.
    pub(crate) fn start(
        receiver: Receiver<QueueMessage>,
        mut sinks: Vec<Box<dyn Sink>>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let state = Arc::new(AtomicU8::new(ListenerState::Running as u8));
        let worker_state = Arc::clone(&state);

        let handle = thread::spawn(move || {
            loop {
                match receiver.recv() {
                    Ok(QueueMessage::Record(record)) => {
                        Self::dispatch(&mut sinks, &record, &metrics);
                        // Flush when the queue goes idle so lines hit
                        // their destinations without per-record cost.
                        if receiver.is_empty() {
                            Self::flush_all(&mut sinks);
                        }
                    }
                    Ok(QueueMessage::Shutdown) => {
                        worker_state.store(ListenerState::Draining as u8, Ordering::Release);
                        // Everything enqueued before the stop request
                        // sits ahead of the sentinel and was already
                        // dispatched above; this sweep only catches
                        // racers that slipped past the closed check.
                        while let Ok(message) = receiver.try_recv() {
                            if let QueueMessage::Record(record) = message {
                                Self::dispatch(&mut sinks, &record, &metrics);
                            }
                        }
                        break;
                    }
                    // All senders dropped without a sentinel.
                    Err(_) => break,
                }
            }

            Self::flush_all(&mut sinks);
            worker_state.store(ListenerState::Stopped as u8, Ordering::Release);
        });

        Self {
            state,
            handle: Some(handle),
        }
    }

    /// Dispatch one record to every sink whose threshold and filter
    /// accept it.
    ///
    /// Failures are isolated per sink, per record: a write error or a
    /// panic in one sink is reported on stderr and counted, and dispatch
    /// continues with the remaining sinks.
    fn dispatch(sinks: &mut [Box<dyn Sink>], record: &Record, metrics: &PipelineMetrics) {
        let mut delivered = false;
        let mut failed = false;

        for sink in sinks.iter_mut() {
            if !sink.accepts(record.severity) {
                continue;
            }

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                sink.write(record)
            }));

            match result {
                Ok(Ok(())) => delivered = true,
                Ok(Err(e)) => {
                    eprintln!("[PIPELINE ERROR] sink '{}' failed: {}", sink.name(), e);
                    metrics.record_sink_error();
                    failed = true;
                }
                Err(panic_info) => {
                    let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "unknown panic".to_string()
                    };
                    eprintln!(
                        "[PIPELINE CRITICAL] sink '{}' panicked: {}. \
                         Other sinks continue to function.",
                        sink.name(),
                        panic_msg
                    );
                    metrics.record_sink_error();
                    failed = true;
                }
            }
        }

        metrics.record_dispatched();
        if failed && !delivered {
            metrics.record_dropped();
        }
    }

    fn flush_all(sinks: &mut [Box<dyn Sink>]) {
        for sink in sinks.iter_mut() {
            let result =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.flush()));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!("[PIPELINE ERROR] sink '{}' flush failed: {}", sink.name(), e);
                }
                Err(_) => {
                    eprintln!("[PIPELINE CRITICAL] sink '{}' panicked during flush", sink.name());
                }
            }
        }
    }

    /// Current state of the worker.
    pub fn state(&self) -> ListenerState {
        ListenerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Mark the stop request; the worker itself moves to Stopped when the
    /// drain completes.
    pub(crate) fn request_drain(&self) {
        // Only meaningful while running; a finished worker already wrote
        // its terminal state.
        let _ = self.state.compare_exchange(
            ListenerState::Running as u8,
            ListenerState::Draining as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Wait for the worker to finish draining and exit.
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                eprintln!("[PIPELINE ERROR] listener thread panicked during shutdown");
                self.state
                    .store(ListenerState::Stopped as u8, Ordering::Release);
            }
        }
    }
}

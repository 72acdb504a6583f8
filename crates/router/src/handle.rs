//! SinkHandle - one sink behind its own bounded queue and worker task
//!
//! The publisher thread never waits on a sink: a full queue rejects the
//! message and the rejection is counted against its body kind.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace, warn};

use contracts::{DataSink, OutboundMessage};

use crate::metrics::{MetricsSnapshot, SinkMetrics};

/// Outcome of a non-blocking handoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Queued,
    /// Queue full, message dropped
    Dropped,
    /// Worker has stopped
    Closed,
}

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    queue: mpsc::Sender<Arc<OutboundMessage>>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker task for `sink`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: DataSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (queue, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker = SinkWorker {
            sink,
            rx,
            metrics: Arc::clone(&metrics),
        };
        let worker = tokio::spawn(worker.run());

        Self {
            name,
            queue,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current counters for this sink
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Queue a message without blocking
    ///
    /// Safe to call from threads outside the runtime.
    pub fn try_send(&self, message: Arc<OutboundMessage>) -> SendOutcome {
        match self.queue.try_send(message) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.queue.max_capacity() - self.queue.capacity());
                SendOutcome::Queued
            }
            Err(mpsc::error::TrySendError::Full(message)) => {
                self.metrics.record_dropped(&message);
                trace!(
                    sink = %self.name,
                    seq = message.seq,
                    channel = %message.channel,
                    kind = message.kind(),
                    "queue full, message dropped"
                );
                SendOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(message)) => {
                self.metrics.record_dropped(&message);
                error!(sink = %self.name, kind = message.kind(), "sink worker closed unexpectedly");
                SendOutcome::Closed
            }
        }
    }

    /// Drain the queue, stop the worker and return the final counters
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) -> MetricsSnapshot {
        drop(self.queue);
        if let Err(e) = self.worker.await {
            error!(sink = %self.name, error = ?e, "worker task panicked");
        }

        let snapshot = self.metrics.snapshot();
        if snapshot.dropped.total() > 0 {
            warn!(sink = %self.name, dropped = %snapshot.dropped, "sink dropped messages");
        }
        debug!(sink = %self.name, written = %snapshot.written, "sink handle shutdown complete");
        snapshot
    }
}

/// Consumer side of a sink queue
struct SinkWorker<S> {
    sink: S,
    rx: mpsc::Receiver<Arc<OutboundMessage>>,
    metrics: Arc<SinkMetrics>,
}

impl<S: DataSink> SinkWorker<S> {
    #[instrument(name = "sink_worker_loop", skip(self), fields(sink = %self.sink.name()))]
    async fn run(mut self) {
        debug!("sink worker started");

        while let Some(message) = self.rx.recv().await {
            self.metrics.set_queue_len(self.rx.len());
            self.deliver(&message).await;
        }

        if let Err(e) = self.sink.flush().await {
            error!(error = %e, "flush failed on shutdown");
        }
        if let Err(e) = self.sink.close().await {
            error!(error = %e, "close failed on shutdown");
        }

        debug!("sink worker stopped");
    }

    async fn deliver(&mut self, message: &OutboundMessage) {
        match self.sink.write(message).await {
            Ok(()) => self.metrics.record_written(message),
            Err(e) => {
                // Keep serving the queue after a failed write
                self.metrics.record_failed(message);
                error!(
                    seq = message.seq,
                    channel = %message.channel,
                    kind = message.kind(),
                    error = %e,
                    "write failed"
                );
            }
        }
    }
}

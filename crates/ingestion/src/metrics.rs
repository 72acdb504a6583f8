//! In-process ingestion counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared between the device bridge and the consumer task
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Frame events received from the device
    pub frames_received: AtomicU64,

    /// Frame events dropped at the device boundary (queue full)
    pub frames_dropped: AtomicU64,

    /// Point frames handed to the publication sink
    pub frames_published: AtomicU64,

    pub points_published: AtomicU64,

    pub status_published: AtomicU64,

    pub status_failures: AtomicU64,

    pub publish_failures: AtomicU64,

    /// Routes created for unexpected sensors
    pub routes_synthesized: AtomicU64,

    /// Current event queue length
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_published(&self, points: usize) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
        self.points_published
            .fetch_add(points as u64, Ordering::Relaxed);
    }

    pub fn record_status_published(&self) {
        self.status_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_status_failure(&self) {
        self.status_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_route_synthesized(&self) {
        self.routes_synthesized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_published: self.frames_published.load(Ordering::Relaxed),
            points_published: self.points_published.load(Ordering::Relaxed),
            status_published: self.status_published.load(Ordering::Relaxed),
            status_failures: self.status_failures.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            routes_synthesized: self.routes_synthesized.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub frames_published: u64,
    pub points_published: u64,
    pub status_published: u64,
    pub status_failures: u64,
    pub publish_failures: u64,
    pub routes_synthesized: u64,
    pub queue_len: usize,
}

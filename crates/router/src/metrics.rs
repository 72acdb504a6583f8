//! Per-sink delivery counters, split by message body kind

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::{MessageBody, OutboundMessage};

/// Index of a message body kind in the counter arrays
fn slot(message: &OutboundMessage) -> usize {
    match message.body {
        MessageBody::PointCloud(_) => 0,
        MessageBody::Status(_) => 1,
        MessageBody::Transform(_) => 2,
    }
}

/// Counters for one outcome, one cell per body kind
#[derive(Debug, Default)]
struct KindCells([AtomicU64; 3]);

impl KindCells {
    fn bump(&self, message: &OutboundMessage) {
        self.0[slot(message)].fetch_add(1, Ordering::Relaxed);
    }

    fn load(&self) -> KindCounts {
        KindCounts {
            point_cloud: self.0[0].load(Ordering::Relaxed),
            status: self.0[1].load(Ordering::Relaxed),
            transform: self.0[2].load(Ordering::Relaxed),
        }
    }
}

/// Live counters shared between a `SinkHandle` and its worker
#[derive(Debug, Default)]
pub struct SinkMetrics {
    queue_len: AtomicUsize,
    written: KindCells,
    failed: KindCells,
    dropped: KindCells,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub(crate) fn record_written(&self, message: &OutboundMessage) {
        self.written.bump(message);
    }

    pub(crate) fn record_failed(&self, message: &OutboundMessage) {
        self.failed.bump(message);
    }

    pub(crate) fn record_dropped(&self, message: &OutboundMessage) {
        self.dropped.bump(message);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len.load(Ordering::Relaxed),
            written: self.written.load(),
            failed: self.failed.load(),
            dropped: self.dropped.load(),
        }
    }
}

/// Message counts for a single outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub point_cloud: u64,
    pub status: u64,
    pub transform: u64,
}

impl KindCounts {
    pub fn total(&self) -> u64 {
        self.point_cloud + self.status + self.transform
    }
}

impl std::fmt::Display for KindCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (points={}, status={}, transform={})",
            self.total(),
            self.point_cloud,
            self.status,
            self.transform
        )
    }
}

/// Point-in-time copy of a sink's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Queue depth last seen by the producer or worker
    pub queue_len: usize,
    pub written: KindCounts,
    pub failed: KindCounts,
    /// Rejected at a full queue
    pub dropped: KindCounts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Quaternion, SensorStatusMessage, StaticTransform};

    fn transform() -> OutboundMessage {
        OutboundMessage {
            seq: 0,
            channel: "/tf_static".into(),
            body: MessageBody::Transform(StaticTransform {
                frame_id: "cepton".to_string(),
                child_frame_id: "cepton_0".to_string(),
                translation: [0.0; 3],
                rotation: Quaternion::IDENTITY,
            }),
        }
    }

    fn status() -> OutboundMessage {
        OutboundMessage {
            seq: 1,
            channel: "cepton/status".into(),
            body: MessageBody::Status(SensorStatusMessage::default()),
        }
    }

    #[test]
    fn test_counts_split_by_kind() {
        let metrics = SinkMetrics::new();
        metrics.record_written(&transform());
        metrics.record_written(&status());
        metrics.record_written(&status());
        metrics.record_dropped(&status());
        metrics.record_failed(&transform());
        metrics.set_queue_len(4);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.queue_len, 4);
        assert_eq!(
            snapshot.written,
            KindCounts {
                point_cloud: 0,
                status: 2,
                transform: 1,
            }
        );
        assert_eq!(snapshot.written.total(), 3);
        assert_eq!(snapshot.dropped.status, 1);
        assert_eq!(snapshot.failed.transform, 1);
        assert_eq!(snapshot.failed.total(), 1);
    }

    #[test]
    fn test_kind_counts_display() {
        let counts = KindCounts {
            point_cloud: 5,
            status: 2,
            transform: 1,
        };
        assert_eq!(counts.to_string(), "8 (points=5, status=2, transform=1)");
    }
}

//! Publisher - fans publications out to sink workers
//!
//! `publish` never blocks: each payload is copied once into an owned
//! `OutboundMessage` and handed to every sink queue with `try_send`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use contracts::{
    ChannelKey, ChannelKind, ContractError, MessageBody, OutboundMessage, PointCloudMessage,
    Publication, PublicationSink, SinkConfig,
};
use metrics::counter;
use tracing::{debug, info, instrument};

use crate::error::RouterError;
use crate::factory::create_sink_handle;
use crate::handle::{SendOutcome, SinkHandle};
use crate::metrics::MetricsSnapshot;

/// Publication hub backed by a set of sink workers
pub struct Publisher {
    handles: Vec<SinkHandle>,
    seq: AtomicU64,
    advertised: RwLock<BTreeMap<ChannelKey, ChannelKind>>,
}

impl Publisher {
    /// Build a publisher with custom sink handles
    pub fn with_handles(handles: Vec<SinkHandle>) -> Self {
        Self {
            handles,
            seq: AtomicU64::new(0),
            advertised: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build sinks from configuration and start their workers
    #[instrument(name = "publisher_from_configs", skip(configs), fields(sink_count = configs.len()))]
    pub async fn from_configs(configs: &[SinkConfig]) -> Result<Self, RouterError> {
        let mut handles = Vec::with_capacity(configs.len());
        for config in configs {
            handles.push(create_sink_handle(config).await?);
        }
        info!(sinks = handles.len(), "publisher started");
        Ok(Self::with_handles(handles))
    }

    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    /// Messages handed out so far
    pub fn published(&self) -> u64 {
        self.seq.load(Ordering::Relaxed)
    }

    /// Per-sink counters, split by message kind
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.snapshot()))
            .collect()
    }

    /// Channels announced so far
    pub fn advertised(&self) -> Vec<(ChannelKey, ChannelKind)> {
        self.advertised
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(channel, kind)| (channel.clone(), *kind))
            .collect()
    }

    /// Drain every sink queue and stop the workers
    ///
    /// Returns the per-sink counters after the last write.
    #[instrument(name = "publisher_shutdown", skip(self))]
    pub async fn shutdown(self) -> Vec<(String, MetricsSnapshot)> {
        let mut metrics = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let name = handle.name().to_string();
            let snapshot = handle.shutdown().await;
            debug!(
                sink = %name,
                points = snapshot.written.point_cloud,
                status = snapshot.written.status,
                transform = snapshot.written.transform,
                "sink drained"
            );
            metrics.push((name, snapshot));
        }
        info!("publisher shutdown complete");
        metrics
    }

    fn to_message(&self, channel: &ChannelKey, publication: Publication<'_>) -> OutboundMessage {
        let body = match publication {
            Publication::PointCloud(frame) => {
                MessageBody::PointCloud(PointCloudMessage::from_frame(frame))
            }
            Publication::Status(status) => MessageBody::Status(status.clone()),
            Publication::Transform(transform) => MessageBody::Transform(transform.clone()),
        };
        OutboundMessage {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            channel: channel.clone(),
            body,
        }
    }
}

impl PublicationSink for Publisher {
    fn advertise(&self, channel: &ChannelKey, kind: ChannelKind) {
        let mut advertised = self
            .advertised
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if advertised.insert(channel.clone(), kind).is_none() {
            debug!(channel = %channel, kind = ?kind, "channel advertised");
        }
    }

    fn publish(
        &self,
        channel: &ChannelKey,
        publication: Publication<'_>,
    ) -> Result<(), ContractError> {
        if self.handles.is_empty() {
            return Ok(());
        }

        let message = Arc::new(self.to_message(channel, publication));
        let mut queued = 0usize;
        for handle in &self.handles {
            match handle.try_send(Arc::clone(&message)) {
                SendOutcome::Queued => queued += 1,
                SendOutcome::Dropped | SendOutcome::Closed => {
                    counter!(
                        "cepton_router_queue_dropped_total",
                        "sink" => handle.name().to_string(),
                        "kind" => message.kind()
                    )
                    .increment(1);
                }
            }
        }

        if queued == 0 {
            return Err(ContractError::publish(
                channel.to_string(),
                "every sink refused the message",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::LogSink;
    use crate::metrics::KindCounts;
    use contracts::{
        AssembledFrame, CartesianPoint, DataSink, Quaternion, SensorStatusMessage, StaticTransform,
    };
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration};

    #[derive(Clone, Default)]
    struct CollectingSink {
        received: Arc<Mutex<Vec<OutboundMessage>>>,
        delay_ms: u64,
    }

    impl DataSink for CollectingSink {
        fn name(&self) -> &str {
            "collecting"
        }

        async fn write(&mut self, message: &OutboundMessage) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            self.received.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn frame() -> AssembledFrame {
        AssembledFrame {
            timestamp: 10,
            frame_id: "cepton_0".to_string(),
            points: vec![CartesianPoint {
                x: 1.0,
                ..Default::default()
            }],
        }
    }

    #[tokio::test]
    async fn test_publisher_fanout_and_sequence() {
        let first = CollectingSink::default();
        let second = CollectingSink::default();
        let publisher = Publisher::with_handles(vec![
            SinkHandle::spawn(first.clone(), 10),
            SinkHandle::spawn(second.clone(), 10),
        ]);

        let channel = ChannelKey::from("cepton/points");
        publisher.advertise(&channel, ChannelKind::Points);
        publisher.advertise(&channel, ChannelKind::Points);
        let frame = frame();
        for _ in 0..3 {
            publisher
                .publish(&channel, Publication::PointCloud(&frame))
                .unwrap();
        }
        assert_eq!(publisher.published(), 3);
        assert_eq!(publisher.advertised().len(), 1);

        publisher.shutdown().await;

        for sink in [first, second] {
            let received = sink.received.lock().unwrap();
            let seqs: Vec<u64> = received.iter().map(|m| m.seq).collect();
            assert_eq!(seqs, vec![0, 1, 2]);
            assert!(received.iter().all(|m| m.channel == "cepton/points"));
            match &received[0].body {
                MessageBody::PointCloud(cloud) => assert_eq!(cloud.width, 1),
                other => panic!("unexpected body {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_publisher_reports_total_drop() {
        let sink = CollectingSink {
            delay_ms: 200,
            ..Default::default()
        };
        let publisher = Publisher::with_handles(vec![SinkHandle::spawn(sink, 1)]);
        let channel = ChannelKey::from("cepton/points");
        let frame = frame();

        let failures = (0..10)
            .map(|_| publisher.publish(&channel, Publication::PointCloud(&frame)))
            .filter(Result::is_err)
            .count();
        assert!(failures > 0);

        publisher.shutdown().await;
    }

    #[tokio::test]
    async fn test_publisher_without_sinks() {
        let publisher = Publisher::with_handles(vec![]);
        let frame = frame();
        assert!(publisher
            .publish(&"cepton/points".into(), Publication::PointCloud(&frame))
            .is_ok());
    }

    #[tokio::test]
    async fn test_publisher_with_log_sink() {
        let publisher = Publisher::with_handles(vec![SinkHandle::spawn(LogSink::new("log"), 4)]);
        let frame = frame();
        publisher
            .publish(&"cepton/points".into(), Publication::PointCloud(&frame))
            .unwrap();
        let metrics = publisher.metrics();
        publisher.shutdown().await;
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].0, "log");
    }

    #[tokio::test]
    async fn test_shutdown_reports_writes_per_kind() {
        let publisher = Publisher::with_handles(vec![SinkHandle::spawn(
            CollectingSink::default(),
            16,
        )]);
        let frame = frame();
        let status = SensorStatusMessage {
            serial_number: 7,
            ..Default::default()
        };
        let transform = StaticTransform {
            frame_id: "cepton".to_string(),
            child_frame_id: "cepton_0".to_string(),
            translation: [0.0; 3],
            rotation: Quaternion::IDENTITY,
        };

        publisher
            .publish(&"/tf_static".into(), Publication::Transform(&transform))
            .unwrap();
        for _ in 0..2 {
            publisher
                .publish(&"cepton/points".into(), Publication::PointCloud(&frame))
                .unwrap();
            publisher
                .publish(&"cepton/status".into(), Publication::Status(&status))
                .unwrap();
        }

        let sinks = publisher.shutdown().await;
        assert_eq!(sinks.len(), 1);
        let (name, snapshot) = &sinks[0];
        assert_eq!(name, "collecting");
        assert_eq!(
            snapshot.written,
            KindCounts {
                point_cloud: 2,
                status: 2,
                transform: 1,
            }
        );
        assert_eq!(snapshot.failed.total(), 0);
        assert_eq!(snapshot.dropped.total(), 0);
    }
}

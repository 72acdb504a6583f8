//! Ingestion callback
//!
//! Runs once per completed device frame:
//!
//! 1. query the sensor status; on failure warn and skip the status message
//! 2. publish the status on the channel resolved for the reported serial
//! 3. copy the batch into the frame assembly buffer
//! 4. finalize and publish the point frame on the resolved point channel
//! 5. reset the buffer
//!
//! Nothing here blocks or retries. Failed publications are logged and counted.

use std::sync::Arc;

use contracts::{
    ChannelKind, DeviceInterface, FrameEvent, Publication, PublicationSink, ResolvedChannel,
    RouteTier, SensorStatusMessage, SerialNumber, DEFAULT_SERIAL_NUMBER,
};
use metrics::counter;
use router::SensorRouteRegistry;
use tracing::{debug, error, trace, warn};

use crate::buffer::FrameAssemblyBuffer;
use crate::metrics::IngestionMetrics;

/// Host clock in microseconds
pub type Clock = fn() -> i64;

/// Microseconds since the Unix epoch
pub fn host_now_usec() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

/// What one invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Serial the frame was routed by
    pub serial_number: SerialNumber,
    /// Status message handed to the sink
    pub status_published: bool,
    /// Point frame handed to the sink
    pub points_published: bool,
    pub point_count: usize,
    pub point_tier: RouteTier,
}

pub struct IngestionCallback<S: PublicationSink> {
    registry: Arc<SensorRouteRegistry>,
    device: Arc<dyn DeviceInterface>,
    sink: S,
    buffer: FrameAssemblyBuffer,
    metrics: Arc<IngestionMetrics>,
    clock: Clock,
}

impl<S: PublicationSink> IngestionCallback<S> {
    pub fn new(
        registry: Arc<SensorRouteRegistry>,
        device: Arc<dyn DeviceInterface>,
        sink: S,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        Self {
            registry,
            device,
            sink,
            buffer: FrameAssemblyBuffer::new(),
            metrics,
            clock: host_now_usec,
        }
    }

    /// Replace the host clock used for message stamps
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &Arc<SensorRouteRegistry> {
        &self.registry
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn on_frame(&mut self, event: &FrameEvent) -> FrameOutcome {
        let handle = event.handle;

        let (serial_number, status_published) = match self.device.get_status(handle) {
            Ok(record) => {
                let serial_number = record.serial_number;
                let message = SensorStatusMessage::from_record(&record, (self.clock)());
                let channel = self.resolve(ChannelKind::Status, serial_number);
                let published = match self
                    .sink
                    .publish(&channel.channel, Publication::Status(&message))
                {
                    Ok(()) => {
                        self.metrics.record_status_published();
                        true
                    }
                    Err(e) => {
                        self.record_publish_failure(&e);
                        false
                    }
                };
                (serial_number, published)
            }
            Err(e) => {
                self.metrics.record_status_failure();
                counter!("cepton_router_status_failures_total").increment(1);
                let serial_number = self
                    .device
                    .serial_number(handle)
                    .unwrap_or(DEFAULT_SERIAL_NUMBER);
                warn!(
                    handle = %handle,
                    serial_number,
                    error = %e,
                    "status query failed, skipping status publication"
                );
                (serial_number, false)
            }
        };

        self.buffer.begin_frame();
        self.buffer.extend(&event.points);

        let point_channel = self.resolve(ChannelKind::Points, serial_number);
        let frame_id = self.registry.frame_id(serial_number);
        let frame = self
            .buffer
            .convert_and_finalize(&frame_id, (self.clock)());
        let point_count = frame.len();

        let points_published = match self
            .sink
            .publish(&point_channel.channel, Publication::PointCloud(frame))
        {
            Ok(()) => {
                self.metrics.record_frame_published(point_count);
                counter!("cepton_router_frames_published_total").increment(1);
                counter!("cepton_router_points_published_total").increment(point_count as u64);
                trace!(
                    serial_number,
                    channel = %point_channel.channel,
                    points = point_count,
                    "point frame published"
                );
                true
            }
            Err(e) => {
                self.record_publish_failure(&e);
                false
            }
        };

        self.buffer.reset();

        FrameOutcome {
            serial_number,
            status_published,
            points_published,
            point_count,
            point_tier: point_channel.tier,
        }
    }

    fn resolve(&self, kind: ChannelKind, serial_number: SerialNumber) -> ResolvedChannel {
        let resolved = match kind {
            ChannelKind::Points => self.registry.resolve_points(serial_number),
            ChannelKind::Status => self.registry.resolve_status(serial_number),
        };
        if resolved.tier == RouteTier::Synthesized {
            self.metrics.record_route_synthesized();
            self.sink.advertise(&resolved.channel, kind);
            debug!(
                serial_number,
                channel = %resolved.channel,
                "advertised channel for unexpected sensor"
            );
        }
        resolved
    }

    fn record_publish_failure(&self, e: &contracts::ContractError) {
        self.metrics.record_publish_failure();
        counter!("cepton_router_publish_failures_total").increment(1);
        error!(error = %e, "publish failed, message dropped");
    }
}

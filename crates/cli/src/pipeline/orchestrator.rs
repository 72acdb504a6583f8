//! Pipeline orchestrator - wires the device to the routing core.
//!
//! Startup order: metrics exporter, transforms, route registry, sinks,
//! static transforms, multicast join, device, event loop. Shutdown runs in
//! reverse once a signal, the timeout or the end of a replay is seen.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use config_loader::{LoadedTransforms, TransformConfigLoader};
use contracts::{
    ChannelKey, ChannelKind, DeviceInterface, DeviceOptions, Publication, PublicationSink,
    SinkConfig,
};
use device::{MockDevice, MockDeviceConfig, ReplayConfig, ReplayDevice};
use ingestion::{FrameEventLoop, IngestionCallback, IngestionMetrics};
use observability::RunningStats;
use router::{Publisher, RouteNaming, SensorRouteRegistry};
use tokio::net::UdpSocket;
use tracing::{error, info, instrument, warn};

use super::PipelineStats;
use crate::error::CliError;
use crate::net::{join_multicast, MulticastConfig};

/// Channel carrying the parent -> sensor transforms
pub const TF_STATIC_CHANNEL: &str = "/tf_static";

/// Interval of the end-of-replay watchdog
const WATCHDOG_INTERVAL: Duration = Duration::from_millis(100);

/// How long sinks get to flush on shutdown
const SINK_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Where frames come from
#[derive(Debug, Clone)]
pub enum DeviceSource {
    /// Capture file replay
    Replay { path: PathBuf, config: ReplayConfig },
    /// Simulated sensors
    Mock(MockDeviceConfig),
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Transforms file (None = default route only)
    pub transforms_path: Option<PathBuf>,

    pub parent_frame_id: String,

    pub device_options: DeviceOptions,

    pub source: DeviceSource,

    /// Multicast group to join (ignored when the network is disabled)
    pub multicast: Option<MulticastConfig>,

    pub sinks: Vec<SinkConfig>,

    /// Capacity of the device event queue
    pub event_capacity: usize,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Why the pipeline stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown signal received
    Signal,
    /// Run timeout elapsed
    Timeout,
    /// Device reported the end of its capture
    EndOfCapture,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the timeout elapses or the device ends
    #[instrument(name = "pipeline_run", skip_all)]
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let config = self.config;

        if let Some(port) = config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Transforms and routes
        let loaded = TransformConfigLoader::load(
            config.transforms_path.as_deref(),
            &config.parent_frame_id,
        )
        .context("Failed to load sensor transforms")?;
        log_loaded(&loaded);

        let registry = Arc::new(SensorRouteRegistry::from_entries(
            RouteNaming::default(),
            loaded.entries.values(),
            loaded.is_default(),
        ));

        // Sinks
        let publisher = Arc::new(
            Publisher::from_configs(&config.sinks)
                .await
                .map_err(CliError::from)
                .context("Failed to create sinks")?,
        );
        for route in registry.routes() {
            publisher.advertise(&route.point_channel, ChannelKind::Points);
            publisher.advertise(&route.status_channel, ChannelKind::Status);
        }
        observability::record_route_count(registry.routes().len());
        broadcast_transforms(publisher.as_ref(), &loaded);

        // Network
        let _membership = join_network(&config).await;

        // Device
        let device = open_device(&config)?;
        info!(device = %device.name(), "device initialized");

        let mut event_loop = FrameEventLoop::new(Arc::clone(&device), config.event_capacity);
        let metrics = event_loop.metrics();
        let callback = IngestionCallback::new(
            Arc::clone(&registry),
            Arc::clone(&device),
            Arc::clone(&publisher),
            Arc::clone(&metrics),
        );
        let consumer = event_loop
            .spawn_consumer(callback)
            .context("Failed to spawn frame consumer")?;
        event_loop.start().context("Failed to start device")?;

        info!(
            routes = registry.routes().len(),
            sinks = publisher.sink_count(),
            "Pipeline running"
        );

        // Wait for a stop condition
        let mut queue_depth = RunningStats::default();
        let timeout = config.timeout;
        let stop_reason = tokio::select! {
            _ = shutdown => StopReason::Signal,
            _ = sleep_or_pending(timeout) => {
                warn!(timeout_secs = timeout.map(|t| t.as_secs()), "Pipeline timed out");
                StopReason::Timeout
            }
            _ = watchdog(device.as_ref(), &metrics, &registry, &publisher, &mut queue_depth) => {
                info!("capture replay done");
                StopReason::EndOfCapture
            }
        };

        // Shutdown
        info!(reason = ?stop_reason, "Shutting down pipeline...");
        event_loop.stop();
        let frames_handled = match consumer.await {
            Ok(handled) => handled,
            Err(e) => {
                error!(error = %e, "frame consumer task failed");
                0
            }
        };
        drop(event_loop);

        let routes = registry.routes().len();
        let advertised = publisher.advertised().len();
        let sink_metrics = match Arc::try_unwrap(publisher) {
            Ok(publisher) => {
                match tokio::time::timeout(SINK_FLUSH_TIMEOUT, publisher.shutdown()).await {
                    Ok(sink_metrics) => sink_metrics,
                    Err(_) => {
                        warn!("Timed out waiting for sinks to flush");
                        Vec::new()
                    }
                }
            }
            Err(publisher) => {
                warn!("Publisher still shared at shutdown, skipping flush");
                publisher.metrics()
            }
        };

        let stats = PipelineStats {
            stop_reason,
            duration: start_time.elapsed(),
            frames_handled,
            ingestion: metrics.snapshot(),
            routes,
            advertised_channels: advertised,
            rejected_entries: loaded.rejected.len(),
            sinks: sink_metrics,
            queue_depth: (&queue_depth).into(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            sink_dropped = stats.sink_drops(),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

fn log_loaded(loaded: &LoadedTransforms) {
    if loaded.is_default() {
        info!("No transforms file given, using the default route");
    }
    for rejected in &loaded.rejected {
        warn!(key = %rejected.key, error = %rejected.error, "transform entry skipped");
    }
    info!(
        source = ?loaded.source,
        sensors = loaded.entries.len(),
        rejected = loaded.rejected.len(),
        "Transforms loaded"
    );
}

/// Publish every static transform once
fn broadcast_transforms<S: PublicationSink>(sink: &S, loaded: &LoadedTransforms) {
    let channel = ChannelKey::new(TF_STATIC_CHANNEL);
    for transform in &loaded.transforms {
        if let Err(e) = sink.publish(&channel, Publication::Transform(transform)) {
            error!(
                child_frame_id = %transform.child_frame_id,
                error = %e,
                "static transform publish failed"
            );
        }
    }
    info!(count = loaded.transforms.len(), "Static transforms published");
}

/// Join the sensor multicast group when the network is in use
///
/// A failed join is logged and the run continues.
async fn join_network(config: &PipelineConfig) -> Option<UdpSocket> {
    if config.device_options.network_disabled() {
        return None;
    }
    let multicast = config.multicast?;
    match join_multicast(multicast).await {
        Ok(socket) => Some(socket),
        Err(e) => {
            warn!(error = %e, "multicast join failed");
            None
        }
    }
}

fn open_device(config: &PipelineConfig) -> Result<Arc<dyn DeviceInterface>> {
    match &config.source {
        DeviceSource::Replay {
            path,
            config: replay,
        } => {
            info!(path = %path.display(), "Running in REPLAY mode");
            let device = ReplayDevice::open(path, replay.clone())
                .with_context(|| format!("Failed to open capture {}", path.display()))?;
            device.set_enable_loop(replay.loop_playback);
            device.resume();
            Ok(Arc::new(device))
        }
        DeviceSource::Mock(mock) => {
            info!(
                sensors = ?mock.serial_numbers,
                frame_mode = ?config.device_options.frame_mode,
                "Running in MOCK mode (no sensor required)"
            );
            let device = MockDevice::new(mock.clone()).context("Failed to create mock device")?;
            Ok(Arc::new(device))
        }
    }
}

async fn sleep_or_pending(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}

/// Poll gauges and the device end-of-capture flag until the device ends
async fn watchdog(
    device: &dyn DeviceInterface,
    metrics: &IngestionMetrics,
    registry: &SensorRouteRegistry,
    publisher: &Publisher,
    queue_depth: &mut RunningStats,
) {
    let mut interval = tokio::time::interval(WATCHDOG_INTERVAL);
    loop {
        interval.tick().await;

        let queue_len = metrics.snapshot().queue_len;
        queue_depth.push(queue_len as f64);
        observability::record_event_queue_len(queue_len);
        observability::record_route_count(registry.routes().len());
        for (sink, snapshot) in publisher.metrics() {
            observability::record_sink_queue_len(&sink, snapshot.queue_len);
        }

        if device.is_end() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FrameMode, SinkType};
    use std::collections::HashMap;
    use std::io::Write;

    fn base_config(source: DeviceSource) -> PipelineConfig {
        PipelineConfig {
            transforms_path: None,
            parent_frame_id: "cepton".to_string(),
            device_options: DeviceOptions::new(0, FrameMode::Cycle, false),
            source,
            multicast: None,
            sinks: vec![SinkConfig {
                name: "log_0".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 100,
                params: HashMap::new(),
            }],
            event_capacity: 16,
            timeout: Some(Duration::from_secs(10)),
            metrics_port: None,
        }
    }

    #[tokio::test]
    async fn test_mock_run_ends_after_max_frames() {
        let mut mock = MockDeviceConfig::new(vec![0]);
        mock.points_per_frame = 10;
        mock.frame_period = Duration::from_millis(5);
        mock.max_frames = Some(3);

        let stats = Pipeline::new(base_config(DeviceSource::Mock(mock)))
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::EndOfCapture);
        assert_eq!(stats.frames_handled, 3);
        assert_eq!(stats.ingestion.points_published, 30);
        assert_eq!(stats.routes, 1);
        assert_eq!(stats.ingestion.routes_synthesized, 0);
        let written = stats.sinks[0].1.written;
        assert_eq!(written.transform, 1);
        assert_eq!(written.status, 3);
        assert_eq!(written.point_cloud, 3);
    }

    #[tokio::test]
    async fn test_replay_run_without_loop_ends() {
        let mut capture = tempfile::NamedTempFile::new().unwrap();
        for (i, serial) in [5u64, 9, 5].iter().enumerate() {
            writeln!(
                capture,
                r#"{{"timestamp":{},"handle":{},"serial_number":{},"points":[{{"timestamp":1,"image_x":0.0,"distance":1.0,"image_z":0.0,"intensity":0.5,"return_type":0,"flags":0}}],"status":{{"serial_number":{}}}}}"#,
                i * 1000,
                serial,
                serial,
                serial
            )
            .unwrap();
        }

        let mut transforms = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            transforms,
            r#"{{"5": {{"translation": [0, 0, 1], "rotation": [0, 0, 0]}}}}"#
        )
        .unwrap();

        let mut config = base_config(DeviceSource::Replay {
            path: capture.path().to_path_buf(),
            config: ReplayConfig {
                speed_multiplier: 10.0,
                loop_playback: false,
            },
        });
        config.transforms_path = Some(transforms.path().to_path_buf());
        config.device_options = DeviceOptions::new(0, FrameMode::Cycle, true);

        let stats = Pipeline::new(config).run(std::future::pending()).await.unwrap();

        assert_eq!(stats.stop_reason, StopReason::EndOfCapture);
        assert_eq!(stats.frames_handled, 3);
        // serial 9 has no route and no default: one point and one status channel
        assert_eq!(stats.ingestion.routes_synthesized, 2);
        assert_eq!(stats.routes, 2);
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_mock_run() {
        let mut mock = MockDeviceConfig::new(vec![1, 2]);
        mock.frame_period = Duration::from_millis(10);

        let stats = Pipeline::new(base_config(DeviceSource::Mock(mock)))
            .run(tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::Signal);
        assert!(stats.frames_handled > 0);
    }

    #[tokio::test]
    async fn test_missing_capture_is_fatal() {
        let config = base_config(DeviceSource::Replay {
            path: PathBuf::from("/nonexistent/capture.jsonl"),
            config: ReplayConfig::default(),
        });
        assert!(Pipeline::new(config).run(std::future::pending()).await.is_err());
    }
}

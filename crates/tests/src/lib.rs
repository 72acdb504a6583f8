//! # Integration Tests
//!
//! End-to-end tests across crates, no sensor hardware required.
//!
//! - Transforms file → route registry → ingestion callback → sink
//! - Mock and replay devices driving the frame event loop
//! - Fan-out into real sink backends

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::TransformConfigLoader;
    use contracts::{
        ChannelKey, ChannelKind, ContractError, DeviceInterface, Publication, PublicationSink,
        SensorHandle, SinkConfig, SinkType,
    };
    use device::{MockDevice, MockDeviceConfig, ReplayConfig, ReplayDevice};
    use ingestion::{FrameEventLoop, IngestionCallback, MetricsSnapshot};
    use router::{Publisher, RouteNaming, SensorRouteRegistry};

    #[derive(Debug, Clone, PartialEq)]
    enum Recorded {
        Points { channel: String, frame_id: String, len: usize },
        Status { channel: String, serial_number: u64 },
        Transform { child_frame_id: String },
    }

    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<Recorded>>,
        advertised: Mutex<Vec<(String, ChannelKind)>>,
    }

    impl RecordingSink {
        fn published(&self) -> Vec<Recorded> {
            self.published.lock().unwrap().clone()
        }

        fn points(&self) -> Vec<(String, String, usize)> {
            self.published()
                .into_iter()
                .filter_map(|r| match r {
                    Recorded::Points { channel, frame_id, len } => Some((channel, frame_id, len)),
                    _ => None,
                })
                .collect()
        }

        fn statuses(&self) -> Vec<(String, u64)> {
            self.published()
                .into_iter()
                .filter_map(|r| match r {
                    Recorded::Status { channel, serial_number } => Some((channel, serial_number)),
                    _ => None,
                })
                .collect()
        }
    }

    impl PublicationSink for RecordingSink {
        fn advertise(&self, channel: &ChannelKey, kind: ChannelKind) {
            self.advertised
                .lock()
                .unwrap()
                .push((channel.to_string(), kind));
        }

        fn publish(
            &self,
            channel: &ChannelKey,
            publication: Publication<'_>,
        ) -> Result<(), ContractError> {
            let record = match publication {
                Publication::PointCloud(frame) => Recorded::Points {
                    channel: channel.to_string(),
                    frame_id: frame.frame_id.clone(),
                    len: frame.len(),
                },
                Publication::Status(status) => Recorded::Status {
                    channel: channel.to_string(),
                    serial_number: status.serial_number,
                },
                Publication::Transform(transform) => Recorded::Transform {
                    child_frame_id: transform.child_frame_id.clone(),
                },
            };
            self.published.lock().unwrap().push(record);
            Ok(())
        }
    }

    fn mock_device(serials: &[u64], points: usize, frames: u64) -> Arc<MockDevice> {
        let mut config = MockDeviceConfig::new(serials.to_vec());
        config.points_per_frame = points;
        config.frame_period = Duration::from_millis(2);
        config.max_frames = Some(frames);
        Arc::new(MockDevice::new(config).unwrap())
    }

    async fn wait_for_end(device: &dyn DeviceInterface) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !device.is_end() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("device did not finish in time");
    }

    /// Run one device to its end through the event loop, returning the counters
    async fn drive<S>(
        device: Arc<dyn DeviceInterface>,
        registry: Arc<SensorRouteRegistry>,
        sink: S,
    ) -> MetricsSnapshot
    where
        S: PublicationSink + 'static,
    {
        let mut event_loop = FrameEventLoop::new(Arc::clone(&device), 64);
        let metrics = event_loop.metrics();
        let callback = IngestionCallback::new(registry, Arc::clone(&device), sink, Arc::clone(&metrics));
        let consumer = event_loop.spawn_consumer(callback).unwrap();
        event_loop.start().unwrap();

        wait_for_end(device.as_ref()).await;
        event_loop.stop();
        consumer.await.unwrap();
        metrics.snapshot()
    }

    fn write_transforms(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    /// No transforms file: every sensor lands on the default channels
    #[tokio::test]
    async fn test_default_route_serves_every_sensor() {
        let loaded = TransformConfigLoader::load(None, "cepton").unwrap();
        assert!(loaded.is_default());
        assert_eq!(loaded.transforms.len(), 1);
        assert_eq!(loaded.transforms[0].child_frame_id, "cepton_0");

        let registry = Arc::new(SensorRouteRegistry::from_entries(
            RouteNaming::default(),
            loaded.entries.values(),
            true,
        ));
        let sink = Arc::new(RecordingSink::default());

        let device = mock_device(&[0, 42], 16, 2);
        let snapshot = drive(device, Arc::clone(&registry), Arc::clone(&sink)).await;

        assert_eq!(snapshot.frames_published, 4);
        assert_eq!(snapshot.points_published, 64);
        assert_eq!(snapshot.routes_synthesized, 0);

        let points = sink.points();
        assert_eq!(points.len(), 4);
        for (channel, frame_id, len) in &points {
            assert_eq!(channel, "cepton/points");
            assert_eq!(frame_id, "cepton_0");
            assert_eq!(*len, 16);
        }
        let statuses = sink.statuses();
        assert_eq!(
            statuses,
            vec![
                ("cepton/sensor_information".to_string(), 0),
                ("cepton/sensor_information".to_string(), 42),
                ("cepton/sensor_information".to_string(), 0),
                ("cepton/sensor_information".to_string(), 42),
            ]
        );
        assert_eq!(registry.routes().len(), 1);
        assert!(sink.advertised.lock().unwrap().is_empty());
    }

    /// Configured {5, 9}; serial 7 shows up unannounced
    #[tokio::test]
    async fn test_unexpected_sensor_gets_its_own_route() {
        let file = write_transforms(
            r#"{
                "5": {"translation": [0, 0, 1], "rotation": [0, 0, 0], "frame_id": "front"},
                "9": {"translation": [0, 0, 1], "rotation": [0, 0, 0, 1], "topic_name": "rear"}
            }"#,
        );
        let loaded = TransformConfigLoader::load(Some(file.path()), "cepton").unwrap();
        assert_eq!(loaded.entries.len(), 2);
        let registry = Arc::new(SensorRouteRegistry::from_entries(
            RouteNaming::default(),
            loaded.entries.values(),
            false,
        ));
        let sink = Arc::new(RecordingSink::default());

        let device = mock_device(&[5, 7], 4, 2);
        let snapshot = drive(device, Arc::clone(&registry), Arc::clone(&sink)).await;

        assert_eq!(snapshot.frames_published, 4);
        // one point and one status channel, created once
        assert_eq!(snapshot.routes_synthesized, 2);

        let points = sink.points();
        assert_eq!(points[0], ("cepton/points_5".to_string(), "front".to_string(), 4));
        assert_eq!(points[1], ("cepton/points_7".to_string(), "cepton_0".to_string(), 4));
        assert_eq!(points[3], points[1]);

        let advertised = sink.advertised.lock().unwrap().clone();
        assert_eq!(advertised.len(), 2);
        assert!(advertised.contains(&("cepton/points_7".to_string(), ChannelKind::Points)));
        assert!(advertised.contains(&("cepton/sensor_info_7".to_string(), ChannelKind::Status)));

        let route = registry.route(7).unwrap();
        assert_eq!(route.point_channel, "cepton/points_7");
        assert_eq!(registry.route(9).unwrap().point_channel, "cepton/rear");
    }

    /// A malformed entry has no route and falls back like any unknown sensor
    #[tokio::test]
    async fn test_malformed_entry_is_skipped() {
        let file = write_transforms(
            r#"{
                "0": {"translation": [0, 0, 0], "rotation": [0, 0, 0]},
                "9": {"translation": [1, 2], "rotation": [0, 0, 0]}
            }"#,
        );
        let loaded = TransformConfigLoader::load(Some(file.path()), "cepton").unwrap();
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.transforms.len(), 1);

        let registry = Arc::new(SensorRouteRegistry::from_entries(
            RouteNaming::default(),
            loaded.entries.values(),
            false,
        ));
        let sink = Arc::new(RecordingSink::default());

        let device = mock_device(&[9], 2, 1);
        let snapshot = drive(device, Arc::clone(&registry), Arc::clone(&sink)).await;

        assert_eq!(snapshot.routes_synthesized, 0);
        assert_eq!(
            sink.points(),
            vec![("cepton/points_0".to_string(), "cepton_0".to_string(), 2)]
        );
        assert_eq!(
            sink.statuses(),
            vec![("cepton/sensor_information_0".to_string(), 9)]
        );
    }

    /// Status query failure skips only the status message
    #[tokio::test]
    async fn test_status_failure_still_publishes_points() {
        let registry = Arc::new(SensorRouteRegistry::default());
        registry.register_default("cepton_0");
        let sink = Arc::new(RecordingSink::default());

        let device = mock_device(&[3], 8, 3);
        device.set_status_failure(SensorHandle(1), true);
        let snapshot = drive(device, registry, Arc::clone(&sink)).await;

        assert_eq!(snapshot.status_failures, 3);
        assert_eq!(snapshot.status_published, 0);
        assert_eq!(snapshot.frames_published, 3);
        assert!(sink.statuses().is_empty());
        assert_eq!(sink.points().len(), 3);
    }

    /// Capture replay into the publisher and a file sink
    #[tokio::test]
    async fn test_replay_into_file_sink() {
        let mut capture = tempfile::NamedTempFile::new().unwrap();
        for i in 0..3 {
            writeln!(
                capture,
                r#"{{"timestamp":{},"handle":1,"serial_number":5,"points":[{{"timestamp":{},"image_x":0.1,"distance":4.0,"image_z":-0.1,"intensity":0.5}},{{"timestamp":{},"image_x":-0.1,"distance":6.0,"image_z":0.2,"intensity":0.9}}],"status":{{"serial_number":5,"model_name":"VISTA_P60"}}}}"#,
                i * 1000,
                i * 1000,
                i * 1000 + 1
            )
            .unwrap();
        }
        let replay = ReplayDevice::open(
            capture.path(),
            ReplayConfig {
                speed_multiplier: 10.0,
                loop_playback: false,
            },
        )
        .unwrap();
        assert_eq!(replay.frame_count(), 3);
        let device: Arc<dyn DeviceInterface> = Arc::new(replay);

        let out = tempfile::tempdir().unwrap();
        let publisher = Arc::new(
            Publisher::from_configs(&[SinkConfig {
                name: "file_0".to_string(),
                sink_type: SinkType::File,
                queue_capacity: 16,
                params: HashMap::from([(
                    "base_path".to_string(),
                    out.path().display().to_string(),
                )]),
            }])
            .await
            .unwrap(),
        );

        let file = write_transforms(r#"{"5": {"translation": [0, 0, 1], "rotation": [0, 0, 0]}}"#);
        let loaded = TransformConfigLoader::load(Some(file.path()), "cepton").unwrap();
        let registry = Arc::new(SensorRouteRegistry::from_entries(
            RouteNaming::default(),
            loaded.entries.values(),
            false,
        ));

        let snapshot = drive(device, registry, Arc::clone(&publisher)).await;
        assert_eq!(snapshot.frames_published, 3);
        assert_eq!(snapshot.points_published, 6);
        assert_eq!(snapshot.status_published, 3);

        let publisher = Arc::try_unwrap(publisher).ok().unwrap();
        assert_eq!(publisher.published(), 6);
        let sinks = publisher.shutdown().await;
        let file_sink = &sinks[0].1;
        assert_eq!(file_sink.written.total(), 6);
        assert_eq!(file_sink.written.point_cloud, 3);
        assert_eq!(file_sink.written.status, 3);
        assert_eq!(file_sink.dropped.total(), 0);

        let count = |dir: &str, ext: &str| {
            std::fs::read_dir(out.path().join(dir))
                .unwrap()
                .filter(|e| {
                    e.as_ref()
                        .unwrap()
                        .path()
                        .extension()
                        .is_some_and(|x| x == ext)
                })
                .count()
        };
        assert_eq!(count("cepton_points_5", "ply"), 3);
        assert_eq!(count("cepton_sensor_information_5", "json"), 3);

        let status_file = std::fs::read_dir(out.path().join("cepton_sensor_information_5"))
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let status: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(status_file).unwrap()).unwrap();
        assert_eq!(status["status"]["serial_number"], 5);
        assert_eq!(status["status"]["model_name"], "VISTA_P60");
    }
}

//! Frame event loop
//!
//! Bridges the device's frame callback (a device-owned thread) to a single
//! async consumer through a bounded `async-channel`. When the queue is full
//! the newest event is dropped and counted; the device thread never blocks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{DeviceInterface, FrameCallback, FrameEvent, PublicationSink};
use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::callback::IngestionCallback;
use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;

/// Default event queue capacity
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

pub struct FrameEventLoop {
    device: Arc<dyn DeviceInterface>,
    metrics: Arc<IngestionMetrics>,
    tx: Sender<FrameEvent>,
    rx: Option<Receiver<FrameEvent>>,
    running: Arc<AtomicBool>,
}

impl FrameEventLoop {
    pub fn new(device: Arc<dyn DeviceInterface>, capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            device,
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            rx: Some(rx),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn device(&self) -> &Arc<dyn DeviceInterface> {
        &self.device
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Event receiver; can only be taken once
    pub fn take_receiver(&mut self) -> Option<Receiver<FrameEvent>> {
        self.rx.take()
    }

    /// Register the bridge callback and start the device
    #[instrument(name = "frame_event_loop_start", skip(self), fields(device = %self.device.name()))]
    pub fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(IngestionError::AlreadyRunning);
        }

        let tx = self.tx.clone();
        let metrics = Arc::clone(&self.metrics);
        let running = Arc::clone(&self.running);

        let callback: FrameCallback = Arc::new(move |event| {
            if !running.load(Ordering::Relaxed) {
                return;
            }
            metrics.record_received();
            forward_event(&tx, event, &metrics);
        });

        if let Err(source) = self.device.listen(callback) {
            self.running.store(false, Ordering::SeqCst);
            return Err(IngestionError::DeviceStart {
                device: self.device.name().to_string(),
                source,
            });
        }

        info!(device = %self.device.name(), "device started");
        Ok(())
    }

    /// Stop the device and close the queue
    ///
    /// Events already queued are still delivered to the consumer.
    #[instrument(name = "frame_event_loop_stop", skip(self))]
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.device.stop();
            debug!(device = %self.device.name(), "device stopped");
        }
        self.tx.close();
    }

    /// Spawn the consumer task driving `callback`
    ///
    /// The task ends once the queue is closed and drained, returning the
    /// number of frames handled.
    pub fn spawn_consumer<S>(&mut self, mut callback: IngestionCallback<S>) -> Result<JoinHandle<u64>>
    where
        S: PublicationSink + 'static,
    {
        let rx = self.take_receiver().ok_or(IngestionError::ReceiverTaken)?;
        let metrics = Arc::clone(&self.metrics);

        Ok(tokio::spawn(async move {
            let mut handled = 0u64;
            while let Ok(event) = rx.recv().await {
                metrics.update_queue_len(rx.len());
                let outcome = callback.on_frame(&event);
                trace!(
                    serial_number = outcome.serial_number,
                    points = outcome.point_count,
                    "frame handled"
                );
                handled += 1;
            }
            debug!(frames = handled, "frame consumer finished");
            handled
        }))
    }
}

impl Drop for FrameEventLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[inline]
fn forward_event(tx: &Sender<FrameEvent>, event: FrameEvent, metrics: &IngestionMetrics) {
    match tx.try_send(event) {
        Ok(()) => metrics.update_queue_len(tx.len()),
        Err(TrySendError::Full(event)) => {
            metrics.record_dropped();
            counter!("cepton_router_frames_dropped_total").increment(1);
            trace!(handle = %event.handle, "event queue full, frame dropped");
        }
        Err(TrySendError::Closed(_)) => {
            warn!("event queue closed, frame discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ChannelKey, ContractError, Publication, RawImagePoint, SensorHandle, SensorStatusRecord,
        SerialNumber,
    };
    use router::SensorRouteRegistry;
    use std::sync::atomic::AtomicU64;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Emits `frames` events from its own thread on `listen`
    struct BurstDevice {
        frames: usize,
        listening: Arc<AtomicBool>,
        thread: Mutex<Option<std::thread::JoinHandle<()>>>,
        fail_listen: bool,
    }

    impl BurstDevice {
        fn new(frames: usize) -> Self {
            Self {
                frames,
                listening: Arc::new(AtomicBool::new(false)),
                thread: Mutex::new(None),
                fail_listen: false,
            }
        }

        fn join(&self) {
            if let Some(thread) = self.thread.lock().unwrap().take() {
                thread.join().unwrap();
            }
        }
    }

    impl DeviceInterface for BurstDevice {
        fn name(&self) -> &str {
            "burst"
        }

        fn get_status(&self, handle: SensorHandle) -> std::result::Result<SensorStatusRecord, ContractError> {
            Ok(SensorStatusRecord {
                handle,
                serial_number: 11,
                ..Default::default()
            })
        }

        fn serial_number(&self, _handle: SensorHandle) -> Option<SerialNumber> {
            Some(11)
        }

        fn listen(&self, callback: FrameCallback) -> std::result::Result<(), ContractError> {
            if self.fail_listen {
                return Err(ContractError::device_init("no interface"));
            }
            self.listening.store(true, Ordering::SeqCst);
            let frames = self.frames;
            *self.thread.lock().unwrap() = Some(std::thread::spawn(move || {
                for _ in 0..frames {
                    callback(FrameEvent::new(
                        SensorHandle(1),
                        vec![RawImagePoint::default(); 8],
                    ));
                }
            }));
            Ok(())
        }

        fn stop(&self) {
            self.listening.store(false, Ordering::SeqCst);
        }

        fn is_listening(&self) -> bool {
            self.listening.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct CountingSink {
        points: AtomicU64,
    }

    impl PublicationSink for CountingSink {
        fn publish(
            &self,
            _channel: &ChannelKey,
            publication: Publication<'_>,
        ) -> std::result::Result<(), ContractError> {
            if let Publication::PointCloud(_) = publication {
                self.points.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        }
    }

    fn consumer(device: &Arc<BurstDevice>, sink: &Arc<CountingSink>, metrics: Arc<IngestionMetrics>) -> IngestionCallback<Arc<CountingSink>> {
        let registry = Arc::new(SensorRouteRegistry::default());
        IngestionCallback::new(registry, device.clone(), Arc::clone(sink), metrics)
    }

    #[tokio::test]
    async fn test_events_reach_consumer() {
        let device = Arc::new(BurstDevice::new(10));
        let sink = Arc::new(CountingSink::default());
        let mut event_loop = FrameEventLoop::new(device.clone(), 32);
        let cb = consumer(&device, &sink, event_loop.metrics());
        let task = event_loop.spawn_consumer(cb).unwrap();

        event_loop.start().unwrap();
        device.join();
        event_loop.stop();

        let handled = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handled, 10);
        assert_eq!(sink.points.load(Ordering::Relaxed), 10);

        let snapshot = event_loop.metrics().snapshot();
        assert_eq!(snapshot.frames_received, 10);
        assert_eq!(snapshot.frames_published, 10);
        assert_eq!(snapshot.points_published, 80);
    }

    #[tokio::test]
    async fn test_full_queue_drops_newest() {
        let device = Arc::new(BurstDevice::new(50));
        let mut event_loop = FrameEventLoop::new(device.clone(), 4);
        let rx = event_loop.take_receiver().unwrap();

        event_loop.start().unwrap();
        device.join();

        let snapshot = event_loop.metrics().snapshot();
        assert_eq!(snapshot.frames_received, 50);
        assert_eq!(snapshot.frames_dropped, 46);
        assert_eq!(rx.len(), 4);
    }

    #[tokio::test]
    async fn test_start_twice_and_failed_listen() {
        let device = Arc::new(BurstDevice::new(0));
        let event_loop = FrameEventLoop::new(device.clone(), 4);
        event_loop.start().unwrap();
        assert!(matches!(event_loop.start(), Err(IngestionError::AlreadyRunning)));

        let failing = Arc::new(BurstDevice {
            fail_listen: true,
            ..BurstDevice::new(0)
        });
        let event_loop = FrameEventLoop::new(failing, 4);
        assert!(matches!(
            event_loop.start(),
            Err(IngestionError::DeviceStart { .. })
        ));
        assert!(!event_loop.is_running());
    }

    #[tokio::test]
    async fn test_receiver_taken_once() {
        let device = Arc::new(BurstDevice::new(0));
        let mut event_loop = FrameEventLoop::new(device.clone(), 4);
        let sink = Arc::new(CountingSink::default());
        assert!(event_loop.take_receiver().is_some());
        let cb = consumer(&device, &sink, event_loop.metrics());
        assert!(matches!(
            event_loop.spawn_consumer(cb),
            Err(IngestionError::ReceiverTaken)
        ));
    }
}

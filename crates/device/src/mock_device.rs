//! Mock device
//!
//! Emits synthetic frames for a fixed set of sensors from a background thread.
//! Used for development and tests without hardware or captures.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{
    ContractError, DeviceInterface, DeviceOptions, FrameCallback, FrameEvent, FrameMode,
    GpsTimestamp, RawImagePoint, SensorHandle, SensorStatusRecord, SerialNumber, POINT_VALID,
};
use tracing::{debug, trace};

use crate::error::{DeviceError, Result};

/// Frame period for cover/cycle modes
const SCAN_FRAME_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    pub serial_numbers: Vec<SerialNumber>,
    pub points_per_frame: usize,
    pub frame_period: Duration,
    pub model_name: String,
    /// Stop after this many frames per sensor; `None` runs until stopped
    pub max_frames: Option<u64>,
}

impl MockDeviceConfig {
    pub fn new(serial_numbers: Vec<SerialNumber>) -> Self {
        Self {
            serial_numbers,
            points_per_frame: 1000,
            frame_period: SCAN_FRAME_PERIOD,
            model_name: "MOCK".to_string(),
            max_frames: None,
        }
    }

    /// Frame period follows the frame mode
    pub fn from_options(serial_numbers: Vec<SerialNumber>, options: &DeviceOptions) -> Self {
        let frame_period = match (options.frame_mode, options.frame_length) {
            (FrameMode::Streaming, Some(length)) => Duration::from_secs_f32(length),
            _ => SCAN_FRAME_PERIOD,
        };
        Self {
            frame_period,
            ..Self::new(serial_numbers)
        }
    }
}

/// Simulated multi-sensor device
///
/// Handles are assigned in configuration order starting at 1.
pub struct MockDevice {
    config: MockDeviceConfig,
    sensors: Arc<Vec<(SensorHandle, SerialNumber)>>,
    failing: RwLock<HashSet<SensorHandle>>,
    listening: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    frames_sent: Arc<AtomicU64>,
    thread: Mutex<Option<JoinHandle<()>>>,
    started: Instant,
}

impl MockDevice {
    pub fn new(config: MockDeviceConfig) -> Result<Self> {
        if config.serial_numbers.is_empty() {
            return Err(DeviceError::NoSensors);
        }
        let sensors = config
            .serial_numbers
            .iter()
            .enumerate()
            .map(|(i, sn)| (SensorHandle(i as u64 + 1), *sn))
            .collect();

        Ok(Self {
            config,
            sensors: Arc::new(sensors),
            failing: RwLock::new(HashSet::new()),
            listening: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
            frames_sent: Arc::new(AtomicU64::new(0)),
            thread: Mutex::new(None),
            started: Instant::now(),
        })
    }

    pub fn handles(&self) -> Vec<SensorHandle> {
        self.sensors.iter().map(|(handle, _)| *handle).collect()
    }

    /// Make status queries for `handle` fail (or succeed again)
    pub fn set_status_failure(&self, handle: SensorHandle, failing: bool) {
        let mut set = self.failing.write().unwrap_or_else(PoisonError::into_inner);
        if failing {
            set.insert(handle);
        } else {
            set.remove(&handle);
        }
    }

    /// Frames delivered so far, all sensors
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Block until the emitter thread exits
    pub fn wait(&self) {
        let thread = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(thread) = thread {
            let _ = thread.join();
        }
    }

    fn status_record(&self, handle: SensorHandle, serial_number: SerialNumber) -> SensorStatusRecord {
        let age = self.started.elapsed().as_secs_f32();
        SensorStatusRecord {
            handle,
            serial_number,
            model_name: self.config.model_name.clone(),
            model: 0,
            firmware_version: 1,
            last_reported_temperature: 40.0 + (serial_number % 10) as f32,
            last_reported_humidity: 30.0,
            last_reported_age: age,
            measurement_period: self.config.frame_period.as_secs_f32(),
            gps_ts: GpsTimestamp::default(),
            return_count: 1,
            segment_count: 1,
            is_mocked: true,
            is_calibrated: true,
            ..Default::default()
        }
    }
}

/// Synthetic raster sweep; the range varies per sensor and frame
fn synthesize_frame(
    serial_number: SerialNumber,
    frame: u64,
    points: usize,
    timestamp: i64,
) -> Vec<RawImagePoint> {
    let columns = (points as f32).sqrt().ceil().max(1.0) as usize;
    let base = 5.0 + (serial_number % 7) as f32 + (frame % 10) as f32 * 0.1;
    (0..points)
        .map(|i| {
            let col = (i % columns) as f32 / columns as f32;
            let row = (i / columns) as f32 / columns as f32;
            RawImagePoint {
                timestamp: timestamp + i as i64,
                image_x: -0.6 + 1.2 * col,
                distance: base + row,
                image_z: -0.3 + 0.6 * row,
                intensity: col,
                return_type: 1,
                flags: POINT_VALID,
                segment_id: 0,
            }
        })
        .collect()
}

impl DeviceInterface for MockDevice {
    fn name(&self) -> &str {
        "mock"
    }

    fn get_status(&self, handle: SensorHandle) -> std::result::Result<SensorStatusRecord, ContractError> {
        let serial_number = self
            .serial_number(handle)
            .ok_or_else(|| ContractError::status_query(handle.0, "unknown handle"))?;
        if self
            .failing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&handle)
        {
            return Err(ContractError::status_query(handle.0, "injected failure"));
        }
        Ok(self.status_record(handle, serial_number))
    }

    fn serial_number(&self, handle: SensorHandle) -> Option<SerialNumber> {
        self.sensors
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, sn)| *sn)
    }

    fn listen(&self, callback: FrameCallback) -> std::result::Result<(), ContractError> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let config = self.config.clone();
        let sensors = Arc::clone(&self.sensors);
        let listening = Arc::clone(&self.listening);
        let finished = Arc::clone(&self.finished);
        let frames_sent = Arc::clone(&self.frames_sent);
        let started = self.started;

        let handle = thread::Builder::new()
            .name("mock-device".to_string())
            .spawn(move || {
                debug!(
                    sensors = sensors.len(),
                    period_ms = config.frame_period.as_millis() as u64,
                    "mock device started"
                );

                let mut frame = 0u64;
                while listening.load(Ordering::Relaxed) {
                    if config.max_frames.is_some_and(|max| frame >= max) {
                        finished.store(true, Ordering::SeqCst);
                        break;
                    }
                    let timestamp = started.elapsed().as_micros() as i64;
                    for (handle, serial_number) in sensors.iter() {
                        let points = synthesize_frame(
                            *serial_number,
                            frame,
                            config.points_per_frame,
                            timestamp,
                        );
                        callback(FrameEvent::new(*handle, points));
                        frames_sent.fetch_add(1, Ordering::Relaxed);
                    }
                    trace!(frame, "mock frame emitted");
                    frame += 1;
                    thread::sleep(config.frame_period);
                }

                listening.store(false, Ordering::SeqCst);
                debug!(frames = frame, "mock device stopped");
            })
            .map_err(|e| ContractError::device_init(format!("failed to spawn mock thread: {e}")))?;

        *self.thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
        self.wait();
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    fn is_end(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.listening.store(false, Ordering::SeqCst);
    }
}

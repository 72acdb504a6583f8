//! Replay device
//!
//! Plays back a JSONL capture: one frame per line, delivered at the recorded
//! pace (scaled by a speed multiplier), optionally looping.
//!
//! ```text
//! {"timestamp":1000000,"handle":1,"serial_number":5,"points":[...],"status":{...}}
//! ```
//!
//! `timestamp` is in microseconds. `serial_number` and `status` are optional;
//! the status snapshot of the most recently delivered frame is what
//! `get_status` reports for that handle.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{
    ContractError, DeviceInterface, FrameCallback, FrameEvent, RawImagePoint, SensorHandle,
    SensorStatusRecord, SerialNumber,
};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::error::{DeviceError, Result};

/// Longest single sleep, bounds stop/pause latency
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Playback speed (1.0 = recorded pace)
    pub speed_multiplier: f64,

    /// Restart from the first frame after the last one
    pub loop_playback: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            loop_playback: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CaptureFrame {
    timestamp: i64,
    handle: SensorHandle,
    #[serde(default)]
    serial_number: Option<SerialNumber>,
    #[serde(default)]
    points: Vec<RawImagePoint>,
    #[serde(default)]
    status: Option<SensorStatusRecord>,
}

type StatusTable = RwLock<HashMap<SensorHandle, SensorStatusRecord>>;

#[derive(Debug, Default)]
struct PlaybackState {
    listening: AtomicBool,
    paused: AtomicBool,
    loop_enabled: AtomicBool,
    ended: AtomicBool,
}

pub struct ReplayDevice {
    path: PathBuf,
    frames: Arc<Vec<CaptureFrame>>,
    serials: HashMap<SensorHandle, SerialNumber>,
    statuses: Arc<StatusTable>,
    speed: f64,
    state: Arc<PlaybackState>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayDevice {
    /// Load a capture file
    ///
    /// Fails if the file cannot be read or any line is not a frame record.
    #[instrument(name = "replay_device_open", skip(config), fields(path = %path.display()))]
    pub fn open(path: &Path, config: ReplayConfig) -> Result<Self> {
        let read_error = |source| DeviceError::CaptureRead {
            path: path.to_path_buf(),
            source,
        };
        let reader = BufReader::new(File::open(path).map_err(read_error)?);

        let mut frames = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(read_error)?;
            if line.trim().is_empty() {
                continue;
            }
            let frame: CaptureFrame =
                serde_json::from_str(&line).map_err(|e| DeviceError::CaptureParse {
                    path: path.to_path_buf(),
                    line: index + 1,
                    message: e.to_string(),
                })?;
            frames.push(frame);
        }
        frames.sort_by_key(|frame| frame.timestamp);

        let mut serials = HashMap::new();
        let mut statuses = HashMap::new();
        for frame in &frames {
            let serial_number = frame
                .serial_number
                .or_else(|| frame.status.as_ref().map(|s| s.serial_number));
            if let Some(serial_number) = serial_number {
                serials.entry(frame.handle).or_insert(serial_number);
            }
            if let Some(status) = &frame.status {
                statuses.entry(frame.handle).or_insert_with(|| status.clone());
            }
        }

        info!(
            frames = frames.len(),
            sensors = serials.len(),
            "capture loaded"
        );

        let state = PlaybackState::default();
        state
            .loop_enabled
            .store(config.loop_playback, Ordering::SeqCst);

        Ok(Self {
            path: path.to_path_buf(),
            frames: Arc::new(frames),
            serials,
            statuses: Arc::new(RwLock::new(statuses)),
            speed: config.speed_multiplier.max(0.01),
            state: Arc::new(state),
            thread: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Enable or disable looping; applies at the end of the current pass
    pub fn set_enable_loop(&self, enabled: bool) {
        self.state.loop_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.state.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.state.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::SeqCst)
    }

    /// Block until playback finishes or is stopped
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
}

/// Sleep until `deadline`, waking early if playback stops
fn sleep_until(deadline: Instant, state: &PlaybackState) -> bool {
    loop {
        if !state.listening.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(POLL_INTERVAL));
    }
}

/// Wait out a pause; returns how long playback was held
fn hold_while_paused(state: &PlaybackState) -> Duration {
    let held_from = Instant::now();
    while state.paused.load(Ordering::Relaxed) && state.listening.load(Ordering::Relaxed) {
        thread::sleep(POLL_INTERVAL);
    }
    held_from.elapsed()
}

fn play(
    frames: Arc<Vec<CaptureFrame>>,
    statuses: Arc<StatusTable>,
    state: Arc<PlaybackState>,
    speed: f64,
    callback: FrameCallback,
) {
    let Some(first_timestamp) = frames.first().map(|frame| frame.timestamp) else {
        state.ended.store(true, Ordering::SeqCst);
        state.listening.store(false, Ordering::SeqCst);
        return;
    };

    let mut passes = 0u64;
    'playback: loop {
        let mut start = Instant::now();
        for frame in frames.iter() {
            start += hold_while_paused(&state);

            let offset_usec = (frame.timestamp - first_timestamp).max(0) as f64;
            let deadline = start + Duration::from_secs_f64(offset_usec / 1e6 / speed);
            if !sleep_until(deadline, &state) {
                debug!("replay stopped");
                break 'playback;
            }

            if let Some(status) = &frame.status {
                statuses
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(frame.handle, status.clone());
            }
            callback(FrameEvent::new(frame.handle, frame.points.clone()));
        }

        passes += 1;
        if !state.loop_enabled.load(Ordering::SeqCst) {
            info!(passes, "replay completed");
            state.ended.store(true, Ordering::SeqCst);
            break;
        }
        debug!(passes, "looping replay");
    }

    state.listening.store(false, Ordering::SeqCst);
}

impl DeviceInterface for ReplayDevice {
    fn name(&self) -> &str {
        "replay"
    }

    fn get_status(
        &self,
        handle: SensorHandle,
    ) -> std::result::Result<SensorStatusRecord, ContractError> {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .cloned()
            .ok_or_else(|| ContractError::status_query(handle.0, "no status recorded in capture"))
    }

    fn serial_number(&self, handle: SensorHandle) -> Option<SerialNumber> {
        self.serials.get(&handle).copied()
    }

    fn listen(&self, callback: FrameCallback) -> std::result::Result<(), ContractError> {
        if self.state.listening.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.state.ended.store(false, Ordering::SeqCst);

        let frames = Arc::clone(&self.frames);
        let statuses = Arc::clone(&self.statuses);
        let state = Arc::clone(&self.state);
        let speed = self.speed;

        let handle = thread::Builder::new()
            .name("replay-device".to_string())
            .spawn(move || play(frames, statuses, state, speed, callback))
            .map_err(|e| {
                self.state.listening.store(false, Ordering::SeqCst);
                ContractError::device_init(format!("failed to spawn replay thread: {e}"))
            })?;

        *self.thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    fn stop(&self) {
        self.state.listening.store(false, Ordering::SeqCst);
        self.wait();
    }

    fn is_listening(&self) -> bool {
        self.state.listening.load(Ordering::Relaxed)
    }

    fn is_end(&self) -> bool {
        self.state.ended.load(Ordering::SeqCst)
    }
}

impl Drop for ReplayDevice {
    fn drop(&mut self) {
        self.state.listening.store(false, Ordering::SeqCst);
    }
}

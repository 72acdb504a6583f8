//! DeviceInterface trait - LiDAR device abstraction
//!
//! Decouples the routing core from the concrete device SDK. Live devices,
//! capture replay and mock devices all implement the same interface.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ContractError, FrameEvent, SensorHandle, SensorStatusRecord, SerialNumber};

/// Frame-ready callback type
///
/// Called from the device's own delivery context, once per completed frame.
pub type FrameCallback = Arc<dyn Fn(FrameEvent) + Send + Sync>;

/// Control flag: do not open any network socket (replay only)
pub const CONTROL_DISABLE_NETWORK: u32 = 1 << 1;

/// Frame length used in streaming mode (seconds)
pub const STREAMING_FRAME_LENGTH_SEC: f32 = 0.01;

/// How the device groups samples into frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameMode {
    /// Emit when the scan pattern covers the field of view
    Cover,
    /// Emit when the scan pattern repeats
    #[default]
    Cycle,
    /// Emit at a fixed time interval
    Streaming,
}

impl FromStr for FrameMode {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COVER" => Ok(Self::Cover),
            "CYCLE" => Ok(Self::Cycle),
            "STREAMING" => Ok(Self::Streaming),
            other => Err(ContractError::config_validation(
                "frame_mode",
                format!("unknown frame mode '{other}', expected COVER, CYCLE or STREAMING"),
            )),
        }
    }
}

/// Options handed to a device at initialization
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceOptions {
    /// Bitwise OR of `CONTROL_*` flags
    pub control_flags: u32,

    pub frame_mode: FrameMode,

    /// Frame length in seconds, only meaningful in streaming mode
    pub frame_length: Option<f32>,
}

impl DeviceOptions {
    /// Build options, forcing network off when replaying a capture
    pub fn new(control_flags: u32, frame_mode: FrameMode, replaying: bool) -> Self {
        let mut control_flags = control_flags;
        if replaying {
            control_flags |= CONTROL_DISABLE_NETWORK;
        }
        let frame_length = match frame_mode {
            FrameMode::Streaming => Some(STREAMING_FRAME_LENGTH_SEC),
            FrameMode::Cover | FrameMode::Cycle => None,
        };
        Self {
            control_flags,
            frame_mode,
            frame_length,
        }
    }

    pub fn network_disabled(&self) -> bool {
        self.control_flags & CONTROL_DISABLE_NETWORK != 0
    }
}

/// LiDAR device interface
///
/// The routing core depends only on this trait: status query, frame-callback
/// registration and end-of-capture detection.
///
/// # Example
///
/// ```ignore
/// let device: Arc<dyn DeviceInterface> = open_device();
/// device.listen(Arc::new(|event| {
///     println!("{} points from handle {}", event.len(), event.handle);
/// }))?;
/// // ...
/// device.stop();
/// ```
pub trait DeviceInterface: Send + Sync {
    /// Device name (used for logging)
    fn name(&self) -> &str;

    /// Query the current status snapshot of one sensor
    fn get_status(&self, handle: SensorHandle) -> Result<SensorStatusRecord, ContractError>;

    /// Serial number last seen for a handle, without a status round-trip
    fn serial_number(&self, handle: SensorHandle) -> Option<SerialNumber>;

    /// Register the frame callback and start delivery
    ///
    /// Repeated calls while listening are idempotent.
    fn listen(&self, callback: FrameCallback) -> Result<(), ContractError>;

    /// Stop delivery
    fn stop(&self);

    /// Check if currently delivering frames
    fn is_listening(&self) -> bool;

    /// True once a non-looping capture replay has been fully delivered
    fn is_end(&self) -> bool {
        false
    }
}

//! Sensor-side data: identities, image-space samples, status snapshots.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Stable numeric identity of a physical sensor
pub type SerialNumber = u64;

/// Serial number reserved for the default route
pub const DEFAULT_SERIAL_NUMBER: SerialNumber = 0;

/// Point flag: the sample is a valid return
pub const POINT_VALID: u8 = 1 << 0;

/// Point flag: the receiver was saturated
pub const POINT_SATURATED: u8 = 1 << 1;

/// Device-assigned handle of a connected (or replayed) sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorHandle(pub u64);

impl std::fmt::Display for SensorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One sensor-frame sample in image space
///
/// `image_x` / `image_z` are tangents of the horizontal and vertical angles,
/// `distance` is the range along the ray in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawImagePoint {
    /// Device timestamp (microseconds)
    pub timestamp: i64,
    pub image_x: f32,
    pub distance: f32,
    pub image_z: f32,
    /// Reflectivity, 0..1
    pub intensity: f32,
    #[serde(default)]
    pub return_type: u8,
    /// `POINT_VALID` | `POINT_SATURATED`
    #[serde(default = "default_point_flags")]
    pub flags: u8,
    #[serde(default)]
    pub segment_id: u8,
}

fn default_point_flags() -> u8 {
    POINT_VALID
}

impl RawImagePoint {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.flags & POINT_VALID != 0
    }

    #[inline]
    pub fn is_saturated(&self) -> bool {
        self.flags & POINT_SATURATED != 0
    }
}

/// Cartesian point in the sensor's own frame
///
/// Laid out as a packed 32-byte record in native byte order so a frame can be
/// handed to encoders as one byte slice.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct CartesianPoint {
    /// Device timestamp (microseconds)
    pub timestamp: i64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
    pub return_type: u8,
    pub flags: u8,
    pub segment_id: u8,
    #[serde(skip)]
    pub _reserved: [u8; 5],
}

impl CartesianPoint {
    /// Size of one point record in bytes
    pub const STRIDE: usize = std::mem::size_of::<CartesianPoint>();
}

/// GPS time as last reported by the sensor's NMEA input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GpsTimestamp {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub min: u8,
    pub sec: u8,
}

/// Device health/identity snapshot
///
/// Read once per frame callback and discarded after publication.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorStatusRecord {
    pub handle: SensorHandle,
    pub serial_number: SerialNumber,
    pub model_name: String,
    pub model: u16,
    pub firmware_version: u32,

    /// Celsius
    pub last_reported_temperature: f32,
    /// Relative humidity, percent
    pub last_reported_humidity: f32,
    /// Seconds since the last status report
    pub last_reported_age: f32,
    /// Seconds per measurement
    pub measurement_period: f32,

    /// PTP timestamp (microseconds)
    pub ptp_ts: i64,
    pub gps_ts: GpsTimestamp,

    pub return_count: u8,
    pub segment_count: u8,

    pub is_mocked: bool,
    pub is_pps_connected: bool,
    pub is_nmea_connected: bool,
    pub is_ptp_connected: bool,
    pub is_calibrated: bool,
    pub is_over_heated: bool,

    /// Raw status payload as delivered by the device
    #[serde(default, with = "serde_bytes")]
    pub raw: Vec<u8>,
}

//! Rigid-body transforms: configured entries and broadcast records.

use serde::{Deserialize, Serialize};

use crate::SerialNumber;

/// Unit quaternion (x, y, z, w)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Rotation as written in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    /// Passed through unchanged, not normalized
    Quaternion(Quaternion),
    /// Roll/pitch/yaw in radians, fixed axes X then Y then Z
    Rpy { roll: f64, pitch: f64, yaw: f64 },
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::Quaternion(Quaternion::IDENTITY)
    }
}

/// One configured sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformEntry {
    pub serial_number: SerialNumber,

    /// Output frame id of the sensor
    pub frame_id: String,

    /// Meters, in the parent frame
    pub translation: [f64; 3],

    pub rotation: Rotation,

    /// Base name for the output channels
    pub topic_name: Option<String>,
}

/// Static transform record broadcast once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTransform {
    /// Parent frame
    pub frame_id: String,

    /// Sensor frame
    pub child_frame_id: String,

    pub translation: [f64; 3],

    pub rotation: Quaternion,
}

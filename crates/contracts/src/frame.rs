//! Frame-level data: device events in, assembled frames out.

use serde::{Deserialize, Serialize};

use crate::{CartesianPoint, RawImagePoint, SensorHandle};

/// "Frame ready" event dispatched by the device interface
///
/// One event per completed device-reported frame for one sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEvent {
    /// Reporting sensor
    pub handle: SensorHandle,

    /// Image-space samples in device order
    pub points: Vec<RawImagePoint>,
}

impl FrameEvent {
    pub fn new(handle: SensorHandle, points: Vec<RawImagePoint>) -> Self {
        Self { handle, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One timestamped frame of Cartesian points
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledFrame {
    /// Host stamp (microseconds)
    pub timestamp: i64,

    /// Output frame id of the reporting sensor
    pub frame_id: String,

    /// Points in device order
    pub points: Vec<CartesianPoint>,
}

impl AssembledFrame {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points as one packed byte slice in native byte order
    ///
    /// Encoders that need a fixed byte order must convert each field.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_bytes_length() {
        let frame = AssembledFrame {
            timestamp: 10,
            frame_id: "cepton_0".to_string(),
            points: vec![CartesianPoint::default(); 3],
        };
        assert_eq!(frame.as_bytes().len(), 3 * CartesianPoint::STRIDE);
    }

    #[test]
    fn test_as_bytes_uses_native_field_order() {
        let frame = AssembledFrame {
            timestamp: 0,
            frame_id: "cepton_0".to_string(),
            points: vec![CartesianPoint {
                timestamp: 0x0102_0304_0506_0708,
                x: 1.5,
                y: -2.0,
                z: 0.25,
                intensity: 0.5,
                return_type: 1,
                flags: 2,
                segment_id: 3,
                ..Default::default()
            }],
        };
        let bytes = frame.as_bytes();

        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[0..8], &0x0102_0304_0506_0708i64.to_ne_bytes());
        assert_eq!(&bytes[8..12], &1.5f32.to_ne_bytes());
        assert_eq!(&bytes[12..16], &(-2.0f32).to_ne_bytes());
        assert_eq!(&bytes[16..20], &0.25f32.to_ne_bytes());
        assert_eq!(&bytes[20..24], &0.5f32.to_ne_bytes());
        assert_eq!(&bytes[24..27], &[1, 2, 3]);
    }
}

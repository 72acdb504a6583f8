//! Frame assembly buffer
//!
//! Accumulates one sensor frame of image-space samples and converts them into
//! a single reusable `AssembledFrame`. Storage is grow-only: `reset` drops the
//! logical contents but keeps both allocations for the next frame.

use contracts::{AssembledFrame, RawImagePoint};

use crate::projection::image_to_cartesian;

#[derive(Debug, Default)]
pub struct FrameAssemblyBuffer {
    raw: Vec<RawImagePoint>,
    frame: AssembledFrame,
}

impl FrameAssemblyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for frames of about `points` samples
    pub fn with_capacity(points: usize) -> Self {
        Self {
            raw: Vec::with_capacity(points),
            frame: AssembledFrame {
                points: Vec::with_capacity(points),
                ..Default::default()
            },
        }
    }

    /// Start a new frame, discarding any pending samples
    pub fn begin_frame(&mut self) {
        self.raw.clear();
    }

    #[inline]
    pub fn add_point(&mut self, point: RawImagePoint) {
        self.raw.push(point);
    }

    pub fn extend(&mut self, points: &[RawImagePoint]) {
        self.raw.extend_from_slice(points);
    }

    /// Pending samples
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Allocated sample capacity
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Convert pending samples and stamp the frame
    ///
    /// Calling this again before `reset` rebuilds the frame from the same
    /// samples, replacing the previous result.
    pub fn convert_and_finalize(&mut self, frame_id: &str, timestamp: i64) -> &AssembledFrame {
        let frame = &mut self.frame;
        frame.timestamp = timestamp;
        frame.frame_id.clear();
        frame.frame_id.push_str(frame_id);
        frame.points.clear();
        frame.points.extend(self.raw.iter().map(image_to_cartesian));
        &self.frame
    }

    /// The last finalized frame
    pub fn frame(&self) -> &AssembledFrame {
        &self.frame
    }

    /// Clear samples and the finalized frame
    pub fn reset(&mut self) {
        self.raw.clear();
        self.frame.points.clear();
        self.frame.frame_id.clear();
        self.frame.timestamp = 0;
    }
}

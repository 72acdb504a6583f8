//! Image-space to Cartesian projection
//!
//! A sample is a direction on the unit-depth image plane plus a range:
//! `(image_x, image_z)` is the tangent of the horizontal/vertical angle and
//! `distance` is the range along that ray.

use contracts::{CartesianPoint, RawImagePoint};

/// Project one image-space sample
///
/// Degenerate samples (zero or negative distance, NaN) are projected as-is;
/// nothing is filtered here.
#[inline]
pub fn image_to_cartesian(point: &RawImagePoint) -> CartesianPoint {
    let hypot = (point.image_x * point.image_x + point.image_z * point.image_z + 1.0).sqrt();
    let depth = point.distance / hypot;

    CartesianPoint {
        timestamp: point.timestamp,
        x: -point.image_x * depth,
        y: depth,
        z: -point.image_z * depth,
        intensity: point.intensity,
        return_type: point.return_type,
        flags: point.flags,
        segment_id: point.segment_id,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(image_x: f32, distance: f32, image_z: f32) -> RawImagePoint {
        RawImagePoint {
            image_x,
            distance,
            image_z,
            ..Default::default()
        }
    }

    #[test]
    fn test_straight_ahead() {
        let p = image_to_cartesian(&raw(0.0, 10.0, 0.0));
        assert_eq!((p.x, p.y, p.z), (0.0, 10.0, 0.0));
    }

    #[test]
    fn test_range_is_preserved() {
        let p = image_to_cartesian(&raw(0.5, 20.0, -0.25));
        let range = (p.x * p.x + p.y * p.y + p.z * p.z).sqrt();
        assert!((range - 20.0).abs() < 1e-4);
        // Positive image_x looks to the left (negative x)
        assert!(p.x < 0.0);
        assert!(p.z > 0.0);
    }

    #[test]
    fn test_attributes_carried_through() {
        let input = RawImagePoint {
            timestamp: 123,
            intensity: 0.7,
            return_type: 2,
            flags: 3,
            segment_id: 4,
            ..raw(0.1, 5.0, 0.1)
        };
        let p = image_to_cartesian(&input);
        assert_eq!(p.timestamp, 123);
        assert_eq!(p.intensity, 0.7);
        assert_eq!(p.return_type, 2);
        assert_eq!(p.flags, 3);
        assert_eq!(p.segment_id, 4);
    }

    #[test]
    fn test_degenerate_is_kept() {
        let p = image_to_cartesian(&raw(0.0, 0.0, 0.0));
        assert_eq!((p.x, p.y, p.z), (0.0, 0.0, 0.0));
        let p = image_to_cartesian(&raw(f32::NAN, 1.0, 0.0));
        assert!(p.x.is_nan());
    }
}

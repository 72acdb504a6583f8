//! Rotation conversion

use contracts::{Quaternion, Rotation};
use nalgebra::UnitQuaternion;

/// Resolve a configured rotation to a quaternion
///
/// Roll/pitch/yaw are fixed-axis rotations about X, Y then Z. Quaternions are
/// passed through unchanged, without normalization.
pub fn to_quaternion(rotation: &Rotation) -> Quaternion {
    match *rotation {
        Rotation::Quaternion(q) => q,
        Rotation::Rpy { roll, pitch, yaw } => {
            let q = UnitQuaternion::from_euler_angles(roll, pitch, yaw).into_inner();
            Quaternion {
                x: q.i,
                y: q.j,
                z: q.k,
                w: q.w,
            }
        }
    }
}

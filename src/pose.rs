//! Builds homogeneous target transforms from the requested position and orientation,
//! and moves the target from the tool tip to the robot flange.

use nalgebra::{Matrix3, Vector3};

use crate::instruction::Orientation;
use crate::kinematic_traits::Transform;

/// Rotation used when the instruction does not say how the tool should be oriented:
/// the tool points down, its working axis opposite to the base Z axis.
///
/// Tool axes in the base frame: x = [1, 0, 0], y = [0, -1, 0], z = [0, 0, -1].
pub fn default_rotation() -> Matrix3<f64> {
    Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, -1.0, 0.0,
        0.0, 0.0, -1.0,
    )
}

/// Rotation matrix of the unit quaternion (w, x, y, z). The quaternion is not renormalized.
pub fn rotation_from_quaternion(w: f64, x: f64, y: f64, z: f64) -> Matrix3<f64> {
    Matrix3::new(
        1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - z * w), 2.0 * (x * z + y * w),
        2.0 * (x * y + z * w), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - x * w),
        2.0 * (x * z - y * w), 2.0 * (y * z + x * w), 1.0 - 2.0 * (x * x + y * y),
    )
}

/// Build a rotation matrix from roll-pitch-yaw: `Rz(yaw) * Ry(pitch) * Rx(roll)`
/// (extrinsic XYZ, same as intrinsic ZYX).
pub fn rotation_from_rpy(roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();

    Matrix3::new(
        cy * cp, cy * sp * sr - sy * cr, cy * sp * cr + sy * sr,
        sy * cp, sy * sp * sr + cy * cr, sy * sp * cr - cy * sr,
        -sp, cp * sr, cp * cr,
    )
}

/// Rotation for the requested orientation. Named keywords are not interpreted and, like a
/// missing orientation, give [`default_rotation`].
pub fn rotation_from_orientation(orientation: Option<&Orientation>) -> Matrix3<f64> {
    match orientation {
        Some(Orientation::Quaternion { w, x, y, z }) => rotation_from_quaternion(*w, *x, *y, *z),
        Some(Orientation::Rpy { roll, pitch, yaw }) => rotation_from_rpy(*roll, *pitch, *yaw),
        Some(Orientation::Keyword(_)) | None => default_rotation(),
    }
}

/// Embed rotation and translation into a 4x4 homogeneous transform with bottom row [0 0 0 1].
pub fn make_transform(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Transform {
    let mut transform = Transform::identity();
    transform.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
    transform.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    transform
}

/// Inverse of [`make_transform`].
pub fn split_transform(transform: &Transform) -> (Matrix3<f64>, Vector3<f64>) {
    (
        transform.fixed_view::<3, 3>(0, 0).into_owned(),
        transform.fixed_view::<3, 1>(0, 3).into_owned(),
    )
}

/// Inverse of a rigid transform: rotation transposed, translation rotated back and negated.
pub fn rigid_inverse(transform: &Transform) -> Transform {
    let (rotation, translation) = split_transform(transform);
    let rotation_t = rotation.transpose();
    make_transform(&rotation_t, &(-(rotation_t * translation)))
}

/// Given where the tool tip must go and the flange to tip transform of the tool, find where
/// the flange must go: `target * inverse(tool)`.
pub fn remove_tool_offset(tcp_target: &Transform, tool: &Transform) -> Transform {
    tcp_target * rigid_inverse(tool)
}

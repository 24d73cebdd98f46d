extern crate nalgebra as na;

use na::{Isometry3, Matrix4, Matrix6, Vector3};

/// Pose is used as a pose of the robot flange or tool tip. It contains both Cartesian position
/// and rotation quaternion.
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion, Vector3};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(1.0, 0.0, 0.0);
/// // The quaternion should be normalized to represent a valid rotation.
/// let rotation = UnitQuaternion::from_quaternion(na::Quaternion::new(1.0, 0.0, 0.0, 1.0).normalize());
/// let transform = Pose::from_parts(translation, rotation);
/// ```
pub type Pose = Isometry3<f64>;

/// Homogeneous 4x4 transform as it comes from descriptor files and from the pose composer.
/// Unlike [`Pose`], it is not forced to be rigid, so it can carry an unnormalized
/// quaternion rotation exactly as requested.
pub type Transform = Matrix4<f64>;

/// Six joint angles in radians, one per row of the kinematic table.
pub type Joints = [f64; 6];

/// Starting guess of the numerical solver.
pub const JOINTS_AT_ZERO: Joints = [0.0; 6];

/// Position and rotation axis of every joint, expressed in the robot base frame,
/// together with the flange position. This is what the geometric Jacobian needs.
pub struct JointFrames {
    pub origins: [Vector3<f64>; 6],
    pub axes: [Vector3<f64>; 6],
    pub flange: Vector3<f64>,
}

pub trait Kinematics {
    /// Find the pose of the flange (or tool tip, for a [`crate::tool::Tool`]) for the given joints.
    fn forward(&self, qs: &Joints) -> Pose;

    /// Geometric Jacobian in the base frame: rows 0..3 linear velocity, rows 3..6 angular.
    fn jacobian(&self, qs: &Joints) -> Matrix6<f64>;
}

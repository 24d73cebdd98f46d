//! Provides the tool for the robot. The tool is itself an implementation of Kinematics,
//! so the pose it reports and accepts is the pose of the tool center point (TCP) rather than
//! the robot flange:
//! ```
//! use std::sync::Arc;
//! use nalgebra::{Isometry3, Translation3, UnitQuaternion};
//! use vibe_ik::kinematic_traits::{Joints, Kinematics, Pose};
//! use vibe_ik::kinematics_impl::DhKinematics;
//! use vibe_ik::parameters::{DhRow, KinematicTable};
//!
//! let link = DhRow { alpha: 0.0, a: 0.5, theta: 0.0, d: 0.0 };
//! let robot_alone = DhKinematics::new(KinematicTable { rows: [link; 6] });
//!
//! // Tool extends 0.2 meter in the Z direction of the flange, envisioning something like a drill
//! let drill = Isometry3::from_parts(
//!   Translation3::new(0.0, 0.0, 0.2).into(),
//!   UnitQuaternion::identity(),
//! );
//!
//! let robot_complete = vibe_ik::tool::Tool {
//!   robot: Arc::new(robot_alone),
//!   tool: drill,
//! };
//!
//! let joints: Joints = [0.0, 0.1, 0.2, 0.3, 0.0, 0.5];
//! let tcp_pose: Pose = robot_complete.forward(&joints);
//! println!("The drill tip is at: {:?}", tcp_pose);
//! ```

extern crate nalgebra as na;

use std::sync::Arc;
use na::{Isometry3, Matrix6, Vector3};
use crate::kinematic_traits::{Joints, Kinematics, Pose};

/// Defines the fixed tool that can be attached to the last joint (joint 6) of robot.
/// The tool moves with the robot, providing additional translation and, if needed,
/// rotation.
#[derive(Clone)]
pub struct Tool {
    pub robot: Arc<dyn Kinematics>,  // The robot

    /// Transformation from the robot's tip joint to the tool's TCP.
    pub tool: Isometry3<f64>,
}

impl Kinematics for Tool {
    fn forward(&self, qs: &Joints) -> Pose {
        // Calculate the pose of the tip joint using the robot's kinematics
        let tip_joint = self.robot.forward(qs);
        tip_joint * self.tool
    }

    /// The TCP moves like a point rigidly attached to the flange: angular rows are the same,
    /// linear rows gain the lever arm from the flange to the TCP.
    fn jacobian(&self, qs: &Joints) -> Matrix6<f64> {
        let mut jacobian = self.robot.jacobian(qs);
        let flange = self.robot.forward(qs);
        let lever: Vector3<f64> = flange.rotation * self.tool.translation.vector;
        for i in 0..6 {
            let omega = Vector3::new(jacobian[(3, i)], jacobian[(4, i)], jacobian[(5, i)]);
            let extra = omega.cross(&lever);
            jacobian[(0, i)] += extra.x;
            jacobian[(1, i)] += extra.y;
            jacobian[(2, i)] += extra.z;
        }
        jacobian
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Translation3, UnitQuaternion};
    use crate::kinematics_impl::DhKinematics;
    use crate::parameters::{DhRow, KinematicTable};
    use crate::pose::remove_tool_offset;

    /// Asserts that two `Translation3<f64>` instances are approximately equal within a given tolerance.
    pub(crate) fn assert_diff(a: &Translation3<f64>, b: &Translation3<f64>, expected_diff: [f64; 3], epsilon: f64) {
        let actual_diff = a.vector - b.vector;

        assert!(
            (actual_diff.x - expected_diff[0]).abs() <= epsilon,
            "X difference is not as expected: actual difference = {}, expected difference = {}",
            actual_diff.x, expected_diff[0]
        );
        assert!(
            (actual_diff.y - expected_diff[1]).abs() <= epsilon,
            "Y difference is not as expected: actual difference = {}, expected difference = {}",
            actual_diff.y, expected_diff[1]
        );
        assert!(
            (actual_diff.z - expected_diff[2]).abs() <= epsilon,
            "Z difference is not as expected: actual difference = {}, expected difference = {}",
            actual_diff.z, expected_diff[2]
        );
    }

    fn robot() -> Arc<DhKinematics> {
        let row = |alpha, a, theta, d| DhRow { alpha, a, theta, d };
        Arc::new(DhKinematics::new(KinematicTable {
            rows: [
                row(-std::f64::consts::FRAC_PI_2, 0.3, 0.0, 0.6),
                row(0.0, 1.0, 0.0, 0.0),
                row(std::f64::consts::FRAC_PI_2, 0.0, 0.0, 0.0),
                row(-std::f64::consts::FRAC_PI_2, 0.0, 0.0, 0.9),
                row(std::f64::consts::FRAC_PI_2, 0.0, 0.0, 0.0),
                row(0.0, 0.0, 0.0, 0.2),
            ],
        }))
    }

    #[test]
    fn test_tool_extends_along_flange_z() {
        let robot_alone = robot();
        let sword = Tool {
            robot: robot_alone.clone(),
            tool: Isometry3::from_parts(Translation3::new(0.0, 0.0, 1.0), UnitQuaternion::identity()),
        };
        let joints = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5];
        let flange = robot_alone.forward(&joints);
        let tcp = sword.forward(&joints);
        let flange_z = flange.rotation * Vector3::z();
        assert_diff(&tcp.translation, &flange.translation, [flange_z.x, flange_z.y, flange_z.z], 1e-9);
    }

    #[test]
    fn test_tool_offset_removal_agrees_with_tool() {
        let robot_alone = robot();
        let drill = Tool {
            robot: robot_alone.clone(),
            tool: Isometry3::from_parts(
                Translation3::new(0.01, -0.02, 0.15),
                UnitQuaternion::from_euler_angles(0.1, 0.0, 0.3),
            ),
        };
        let joints = [0.3, -0.2, 0.4, 0.1, 0.6, -0.5];
        let tcp = drill.forward(&joints).to_homogeneous();
        let flange = remove_tool_offset(&tcp, &drill.tool.to_homogeneous());
        let expected = robot_alone.forward(&joints).to_homogeneous();
        assert!((flange - expected).amax() < 1e-9, "{} vs {}", flange, expected);
    }

    #[test]
    fn test_tool_jacobian_moves_with_tcp() {
        let drill = Tool {
            robot: robot(),
            tool: Isometry3::from_parts(Translation3::new(0.0, 0.0, 0.3), UnitQuaternion::identity()),
        };
        let joints = [0.3, -0.2, 0.4, 0.1, 0.6, -0.5];
        let jacobian = drill.jacobian(&joints);
        let epsilon = 1e-7;
        for i in 0..6 {
            let mut perturbed = joints;
            perturbed[i] += epsilon;
            let velocity = (drill.forward(&perturbed).translation.vector
                - drill.forward(&joints).translation.vector) / epsilon;
            for k in 0..3 {
                assert!((velocity[k] - jacobian[(k, i)]).abs() < 1e-5,
                        "joint {} row {}: {} vs {}", i, k, velocity[k], jacobian[(k, i)]);
            }
        }
    }
}

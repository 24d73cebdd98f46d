//! Forward kinematics and the geometric Jacobian of a serial revolute chain
//! described by a Denavit-Hartenberg table.

use nalgebra::{Isometry3, Matrix6, Translation3, UnitQuaternion, Vector3};

use crate::kinematic_traits::{JointFrames, Joints, Kinematics, Pose};
use crate::parameters::{DhRow, KinematicTable};

#[derive(Debug, Clone)]
pub struct DhKinematics {
    table: KinematicTable,
}

impl DhKinematics {
    /// Creates a new `DhKinematics` instance, one revolute joint per table row.
    pub fn new(table: KinematicTable) -> Self {
        DhKinematics { table }
    }

    pub fn table(&self) -> &KinematicTable {
        &self.table
    }

    /// Axis and origin of every joint in the base frame, for the given joint values.
    /// Joint i turns around the z axis of the frame reached after the first i links.
    pub fn joint_frames(&self, qs: &Joints) -> JointFrames {
        let mut transform = Isometry3::identity();
        let mut origins = [Vector3::zeros(); 6];
        let mut axes = [Vector3::zeros(); 6];

        for (i, (row, &q)) in self.table.rows.iter().zip(qs.iter()).enumerate() {
            origins[i] = transform.translation.vector;
            axes[i] = transform.rotation * Vector3::z();
            transform *= link_transform(row, q);
        }

        JointFrames { origins, axes, flange: transform.translation.vector }
    }
}

/// Standard DH link transform `Rz(q + theta) * Tz(d) * Tx(a) * Rx(alpha)`.
fn link_transform(row: &DhRow, q: f64) -> Isometry3<f64> {
    let angle = q + row.theta;
    let (s, c) = angle.sin_cos();
    let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle)
        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), row.alpha);
    Isometry3::from_parts(Translation3::new(row.a * c, row.a * s, row.d), rotation)
}

impl Kinematics for DhKinematics {
    fn forward(&self, qs: &Joints) -> Pose {
        self.table
            .rows
            .iter()
            .zip(qs.iter())
            .fold(Isometry3::identity(), |pose, (row, &q)| pose * link_transform(row, q))
    }

    fn jacobian(&self, qs: &Joints) -> Matrix6<f64> {
        let frames = self.joint_frames(qs);
        let mut jacobian = Matrix6::zeros();
        for i in 0..6 {
            let z = frames.axes[i];
            let linear = z.cross(&(frames.flange - frames.origins[i]));
            jacobian.fixed_view_mut::<3, 1>(0, i).copy_from(&linear);
            jacobian.fixed_view_mut::<3, 1>(3, i).copy_from(&z);
        }
        jacobian
    }
}

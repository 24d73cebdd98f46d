extern crate nalgebra as na;
use na::Matrix6;
use na::linalg::SVD;
use crate::kinematic_traits::{Joints, Kinematics};

/// Struct representing the Jacobian matrix
pub struct Jacobian {
    /// A 6x6 matrix representing the Jacobian
    ///
    /// The Jacobian matrix maps the joint velocities to the end-effector velocities.
    /// Each column corresponds to a joint, and each row corresponds to a degree of freedom
    /// of the end-effector (linear and angular velocities).
    matrix: Matrix6<f64>,
}

impl Jacobian {
    /// Constructs a new Jacobian struct by computing the Jacobian matrix for the given robot and joint configuration
    ///
    /// # Arguments
    ///
    /// * `robot` - A reference to the robot implementing the Kinematics trait
    /// * `qs` - A reference to the joint configuration
    ///
    /// # Returns
    ///
    /// A new instance of `Jacobian`
    pub fn new(robot: &impl Kinematics, qs: &Joints) -> Self {
        Self { matrix: robot.jacobian(qs) }
    }

    pub fn matrix(&self) -> &Matrix6<f64> {
        &self.matrix
    }

    /// Singular values, largest first.
    pub fn singular_values(&self) -> [f64; 6] {
        let svd = SVD::new(self.matrix, false, false);
        let mut values: [f64; 6] = std::array::from_fn(|i| svd.singular_values[i]);
        values.sort_by(|a, b| b.total_cmp(a));
        values
    }

    /// Ratio of the largest to the smallest singular value (2-norm condition number).
    /// Infinite when the matrix is rank deficient, or when it contains non-finite values.
    ///
    /// Large values mean the robot is close to a configuration where small pose changes
    /// require disproportionate joint motion.
    pub fn condition_number(&self) -> f64 {
        if self.matrix.iter().any(|v| !v.is_finite()) {
            return f64::INFINITY;
        }
        let values = self.singular_values();
        let (largest, smallest) = (values[0], values[5]);
        if smallest <= 0.0 {
            f64::INFINITY
        } else {
            largest / smallest
        }
    }
}

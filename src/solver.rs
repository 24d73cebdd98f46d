//! Numerical inverse kinematics: damped least squares (Levenberg-Marquardt) from the zero
//! joint vector, followed by reachability and conditioning checks.
//!
//! The checks run in a fixed order. Convergence first, then the position residual, then the
//! Jacobian condition number, since each later check only means something once the earlier
//! one passed. Each failure has its own reason.

use std::fmt;

use nalgebra::{Matrix6, Rotation3, Translation3, UnitQuaternion, Vector3, Vector6};
use tracing::{debug, trace};

use crate::jacobian::Jacobian;
use crate::kinematic_traits::{JOINTS_AT_ZERO, Joints, Kinematics, Pose, Transform};
use crate::kinematics_impl::DhKinematics;
use crate::parameters::KinematicTable;
use crate::utils::{is_valid, joints_to_vector6, normalize_angle, vector6_to_joints};

/// Largest accepted distance between the reached and the requested flange position.
pub const RESIDUAL_TOLERANCE: f64 = 1e-3;

/// Largest accepted condition number of the Jacobian at the solution.
pub const CONDITION_LIMIT: f64 = 1e6;

/// Identifies this solver in responses.
pub const SOLVER_ID: &str = "dls_lm";

/// Accepted steps that improve the squared error by less than this fraction count as
/// no progress.
const MIN_RELATIVE_IMPROVEMENT: f64 = 1e-6;

const MIN_DAMPING: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    pub max_iterations: usize,

    /// Norm of the 6D pose error (position and rotation vector) that counts as converged.
    pub tolerance: f64,

    pub initial_damping: f64,
    pub max_damping: f64,

    /// Iterations without progress after which the current point is taken as the solution.
    pub stall_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_iterations: 500,
            tolerance: 1e-10,
            initial_damping: 1e-3,
            max_damping: 1e8,
            stall_iterations: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IkFailure {
    /// Iteration did not converge.
    SolverFailed,

    /// Converged, but the flange does not reach the target position.
    ResidualTooLarge,

    /// Reached the target in a configuration too close to a singularity.
    NearSingularity,
}

/// Result of one solve. Residual is present whenever the iteration converged, even if a
/// later check failed.
#[derive(Debug, Clone, PartialEq)]
pub struct IkOutcome {
    pub ok: bool,
    pub joint_angles: Option<Joints>,
    pub residual: Option<f64>,
    pub failure: Option<IkFailure>,
    pub iterations: usize,
    pub condition: Option<f64>,
}

impl IkOutcome {
    fn failed(failure: IkFailure, iterations: usize, residual: Option<f64>, condition: Option<f64>) -> Self {
        IkOutcome { ok: false, joint_angles: None, residual, failure: Some(failure), iterations, condition }
    }

    /// Human readable reason of the failure, None on success.
    pub fn warning(&self) -> Option<String> {
        let failure = self.failure?;
        Some(match failure {
            IkFailure::SolverFailed => failure.to_string(),
            IkFailure::ResidualTooLarge => match self.residual {
                Some(residual) => format!("{} (residual {:.6})", failure, residual),
                None => failure.to_string(),
            },
            IkFailure::NearSingularity => match (self.residual, self.condition) {
                (Some(residual), Some(condition)) => format!(
                    "{} (residual {:.6}, condition number {:.3e})",
                    failure, residual, condition
                ),
                (None, Some(condition)) => format!("{} (condition number {:.3e})", failure, condition),
                (Some(residual), None) => format!("{} (residual {:.6})", failure, residual),
                (None, None) => failure.to_string(),
            },
        })
    }
}

impl fmt::Display for IkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IkFailure::SolverFailed => write!(f, "IK solver failed"),
            IkFailure::ResidualTooLarge => write!(f, "Target unreachable or residual too large"),
            IkFailure::NearSingularity => write!(f, "Solution near singularity"),
        }
    }
}

/// How the iteration ended.
#[derive(Debug, Clone, Copy)]
pub struct Iteration {
    pub joints: Joints,
    pub converged: bool,
    pub iterations: usize,
    pub error: f64,
}

/// Solve with the default settings.
pub fn solve(table: &KinematicTable, target: &Transform) -> IkOutcome {
    solve_with(&SolverConfig::default(), table, target)
}

pub fn solve_with(config: &SolverConfig, table: &KinematicTable, target: &Transform) -> IkOutcome {
    let robot = DhKinematics::new(*table);
    let goal = pose_from_transform(target);

    let iteration = levenberg_marquardt(&robot, &goal, &JOINTS_AT_ZERO, config);
    if !iteration.converged || !is_valid(&iteration.joints) {
        debug!(iterations = iteration.iterations, error = iteration.error, "IK did not converge");
        return IkOutcome::failed(IkFailure::SolverFailed, iteration.iterations, None, None);
    }

    let joints = iteration.joints;
    let requested = Vector3::new(target[(0, 3)], target[(1, 3)], target[(2, 3)]);
    let reached = robot.forward(&joints).translation.vector;
    let residual = (reached - requested).norm();
    if !(residual <= RESIDUAL_TOLERANCE) {
        debug!(residual, "IK converged away from the target");
        return IkOutcome::failed(IkFailure::ResidualTooLarge, iteration.iterations, Some(residual), None);
    }

    let condition = Jacobian::new(&robot, &joints).condition_number();
    if !(condition <= CONDITION_LIMIT) {
        debug!(condition, "IK solution near singularity");
        return IkOutcome::failed(
            IkFailure::NearSingularity,
            iteration.iterations,
            Some(residual),
            Some(condition),
        );
    }

    debug!(iterations = iteration.iterations, residual, condition, "IK solved");
    IkOutcome {
        ok: true,
        joint_angles: Some(joints),
        residual: Some(residual),
        failure: None,
        iterations: iteration.iterations,
        condition: Some(condition),
    }
}

/// The target as a rigid pose. The rotation part is projected onto the nearest rotation,
/// so a slightly non-unit quaternion in the request is tolerated.
fn pose_from_transform(target: &Transform) -> Pose {
    let rotation = target.fixed_view::<3, 3>(0, 0).into_owned();
    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(&rotation));
    let translation = Translation3::new(target[(0, 3)], target[(1, 3)], target[(2, 3)]);
    Pose::from_parts(translation, rotation)
}

/// Position error and rotation vector error, both in the base frame.
fn pose_error(current: &Pose, target: &Pose) -> Vector6<f64> {
    let position = target.translation.vector - current.translation.vector;
    let rotation = (target.rotation * current.rotation.inverse()).scaled_axis();
    Vector6::new(position.x, position.y, position.z, rotation.x, rotation.y, rotation.z)
}

/// Levenberg-Marquardt iteration on the 6D pose error. Damping is halved after an accepted
/// step and multiplied by ten after a rejected one.
///
/// Converged means either the error dropped below the tolerance, or the error stopped
/// improving for `stall_iterations` steps (a stationary point, which may be far from the
/// target if the target cannot be reached). Running out of iterations or a numerical
/// breakdown is not converged. Returned angles are wrapped into [-pi, pi].
pub fn levenberg_marquardt(
    robot: &impl Kinematics,
    target: &Pose,
    start: &Joints,
    config: &SolverConfig,
) -> Iteration {
    let mut q = joints_to_vector6(*start);
    let mut error = pose_error(&robot.forward(start), target);
    let mut cost = error.norm_squared();
    let mut damping = config.initial_damping;
    let mut stalled = 0;

    let finish = |q: Vector6<f64>, converged: bool, iterations: usize, error: f64| Iteration {
        joints: vector6_to_joints(q.map(normalize_angle)),
        converged,
        iterations,
        error,
    };

    for iteration in 0..config.max_iterations {
        if !cost.is_finite() {
            return finish(q, false, iteration, f64::NAN);
        }
        if cost.sqrt() < config.tolerance {
            return finish(q, true, iteration, cost.sqrt());
        }
        if stalled >= config.stall_iterations {
            trace!(iteration, error = cost.sqrt(), "IK reached a stationary point");
            return finish(q, true, iteration, cost.sqrt());
        }

        let joints = vector6_to_joints(q);
        let jacobian = robot.jacobian(&joints);
        let jt = jacobian.transpose();
        let system = jt * jacobian + Matrix6::identity() * damping;
        let Some(cholesky) = system.cholesky() else {
            return finish(q, false, iteration, cost.sqrt());
        };
        let step = cholesky.solve(&(jt * error));

        let candidate = q + step;
        let candidate_error = pose_error(&robot.forward(&vector6_to_joints(candidate)), target);
        let candidate_cost = candidate_error.norm_squared();

        if candidate_cost.is_finite() && candidate_cost < cost {
            if (cost - candidate_cost) < MIN_RELATIVE_IMPROVEMENT * cost {
                stalled += 1;
            } else {
                stalled = 0;
            }
            q = candidate;
            error = candidate_error;
            cost = candidate_cost;
            damping = (damping * 0.5).max(MIN_DAMPING);
        } else {
            stalled += 1;
            damping = (damping * 10.0).min(config.max_damping);
        }
    }

    let converged = cost.sqrt() < config.tolerance;
    finish(q, converged, config.max_iterations, cost.sqrt())
}

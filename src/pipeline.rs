//! Free text in, joint angles out: parse the instruction, resolve robot and tool, load their
//! descriptors, compose the flange target and solve.
//!
//! Nothing here returns an error. Every failure ends the request with `ok = false` and a
//! human readable warning, and whatever was already known (resolved names, residual) is
//! kept in the response metadata.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::ResourceCatalog;
use crate::config::PipelineConfig;
use crate::descriptor::{load_robot, load_tool};
use crate::instruction::InstructionParser;
use crate::jacobian::Jacobian;
use crate::kinematic_traits::Kinematics;
use crate::kinematics_impl::DhKinematics;
use crate::pose::{make_transform, remove_tool_offset, rotation_from_orientation};
use crate::semantic::Semantics;
use crate::solver::{SOLVER_ID, solve_with};
use crate::tool::Tool;
use crate::utils::{format_joints, format_pose, to_degrees};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolveMeta {
    pub robot_model: Option<String>,
    pub tool_name: Option<String>,
    pub residual_error: Option<f64>,
    pub solver: Option<String>,
    pub task: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolveResponse {
    pub ok: bool,
    pub joint_angles_rad: Option<Vec<f64>>,
    pub joint_angles_deg: Option<Vec<f64>>,
    pub warnings: Vec<String>,
    pub meta: SolveMeta,
}

impl SolveResponse {
    fn rejected(warning: String, meta: SolveMeta) -> Self {
        warn!("{}", warning);
        SolveResponse { ok: false, warnings: vec![warning], meta, ..SolveResponse::default() }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    semantics: Semantics,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, semantics: Semantics) -> Self {
        Pipeline { config, semantics }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one request. The resource catalog is scanned anew every time, so files added or
    /// removed between requests are seen.
    pub fn run(&self, text: &str) -> SolveResponse {
        let catalog = ResourceCatalog::build(&self.config).with_matcher(Arc::clone(&self.semantics.matcher));
        let mut meta = SolveMeta::default();

        let parsed = match InstructionParser::new(self.semantics.extractor.as_ref()).parse(text) {
            Ok(parsed) => parsed,
            Err(e) => return SolveResponse::rejected(e.to_string(), meta),
        };
        meta.task = parsed.task.clone();

        let Some(robot_match) = catalog.match_robot(&parsed.robot_model) else {
            return SolveResponse::rejected(format!("Unknown robot model: {}", parsed.robot_model), meta);
        };
        meta.robot_model = Some(robot_match.display_name.clone());

        let Some(tool_match) = catalog.match_tool(&parsed.tool_name) else {
            return SolveResponse::rejected(format!("Unknown tool: {}", parsed.tool_name), meta);
        };
        meta.tool_name = Some(tool_match.display_name.clone());

        let robot = match load_robot(&robot_match.path) {
            Ok(robot) => robot,
            Err(e) => return SolveResponse::rejected(e.to_string(), meta),
        };
        let tool = match load_tool(&tool_match.path) {
            Ok(tool) => tool,
            Err(e) => return SolveResponse::rejected(e.to_string(), meta),
        };

        let rotation = rotation_from_orientation(parsed.orientation.as_ref());
        let tcp_target = make_transform(&rotation, &parsed.target.as_vector());
        let flange_target = remove_tool_offset(&tcp_target, &tool.transform);
        debug!("Flange target:\n{}", flange_target);

        meta.solver = Some(SOLVER_ID.to_string());
        let outcome = solve_with(&self.config.solver, &robot.table, &flange_target);
        meta.residual_error = outcome.residual;

        let joints = match (outcome.ok, outcome.joint_angles) {
            (true, Some(joints)) => joints,
            _ => {
                let warning = outcome.warning().unwrap_or_else(|| "IK failed".to_string());
                return SolveResponse::rejected(warning, meta);
            }
        };

        let with_tool = Tool { robot: Arc::new(DhKinematics::new(robot.table)), tool: tool.isometry() };
        info!(
            tcp_condition = Jacobian::new(&with_tool, &joints).condition_number(),
            "{} with {}: joints {} reach TCP {}",
            robot.name,
            tool.name,
            format_joints(&joints),
            format_pose(&with_tool.forward(&joints))
        );

        SolveResponse {
            ok: true,
            joint_angles_rad: Some(joints.to_vec()),
            joint_angles_deg: Some(to_degrees(&joints).to_vec()),
            warnings: Vec::new(),
            meta,
        }
    }
}

//! Resolves free-text manipulation instructions for six-axis industrial robots into joint angles.
//!
//! An instruction like _"I am using the KUKA KR120 R2500 robot. Move the tooltip of an 8mm
//! drilling tool to [1.5m, 0.1m, 1.0m]"_ goes through these steps:
//!
//! - The instruction is reduced to robot name, tool name, target position and optional
//!   orientation, by an external semantic service if one is configured, or by deterministic
//!   patterns otherwise.
//! - Robot and tool names are resolved against the descriptor files found under the resources
//!   directory (`RobotModels/*.m`, `Tools/*.m`), tolerating case, spacing, punctuation and
//!   synonyms. An optional semantic matcher is the last resort for tools.
//! - The robot descriptor provides the Denavit-Hartenberg table, the tool descriptor the
//!   flange to TCP transform.
//! - The TCP target is built from position and orientation (tool pointing down by default),
//!   then the tool offset is removed to get the flange target.
//! - A damped least squares solver finds the joint angles. The solution is rejected if it does
//!   not converge, does not reach the target, or lies too close to a singularity.
//!
//! # Descriptor files
//!
//! Descriptors are written in a small MATLAB-like dialect of named matrix literals:
//!
//! ```text
//! % KUKA KR120 R2500, alpha a theta d
//! DH = [ -pi/2  0.35   0      0.675; ...
//!         0     1.15  -pi/2   0    ; ...
//!         pi/2  0.041  pi/2   0    ; ...
//!        -pi/2  0      0      1.0  ; ...
//!         pi/2  0      0      0    ; ...
//!         0     0      0      0.215];
//! ```
//!
//! Numeric cells only allow `+ - * /`, parentheses and the constant `pi`.
//!
//! # Example
//!
//! ```no_run
//! use vibe_ik::config::PipelineConfig;
//! use vibe_ik::pipeline::Pipeline;
//! use vibe_ik::semantic::Semantics;
//!
//! let pipeline = Pipeline::new(PipelineConfig::with_resources("RobotResources"), Semantics::none());
//! let response = pipeline.run("Use the KR120R2500 robot with a Drill_8mm tool at [1.5, 0.1, 1.0]");
//! if response.ok {
//!     println!("{:?}", response.joint_angles_deg);
//! } else {
//!     println!("Warning: {}", response.warnings.join("; "));
//! }
//! ```

pub mod parameters;

#[path = "utils/utils.rs"]
pub mod utils;
pub mod kinematic_traits;
pub mod kinematics_impl;

pub mod tool;

pub mod jacobian;

pub mod expression;
pub mod matrix_literal;
pub mod descriptor_error;
pub mod descriptor;

#[path = "utils/simplify_name.rs"]
pub mod simplify_name;

pub mod catalog;
pub mod instruction;
pub mod semantic;

#[cfg(feature = "semantic_http")]
pub mod openai;

pub mod pose;
pub mod solver;

pub mod config;
pub mod pipeline;

#[cfg(test)]
mod tests;

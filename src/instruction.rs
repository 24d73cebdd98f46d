//! Turns a free-text instruction into a [`ParsedInstruction`]: which robot, which tool, where
//! the tool tip must go and, optionally, how it must be oriented.
//!
//! When an [`InstructionExtractor`] is available it does the work. Otherwise (or when it
//! fails) a deterministic pattern parser handles instructions of the form
//! "use the <robot> robot ... a <tool> tool ... [x, y, z]". Both paths produce the same
//! structure, so nothing downstream needs to know which one ran.

use std::fmt;
use std::sync::LazyLock;

use nalgebra::Vector3;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::semantic::InstructionExtractor;

/// Requested tool tip position in the robot base frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl TargetPosition {
    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// Requested tool orientation. Exactly one representation is kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Roll, pitch, yaw in radians, applied as `Rz(yaw) * Ry(pitch) * Rx(roll)`.
    Rpy { roll: f64, pitch: f64, yaw: f64 },

    /// Unit quaternion, scalar first.
    Quaternion { w: f64, x: f64, y: f64, z: f64 },

    /// Named orientation like "downwards". Not interpreted, gives the default rotation.
    Keyword(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedInstruction {
    pub robot_model: String,
    pub tool_name: String,
    pub target: TargetPosition,
    pub orientation: Option<Orientation>,
    pub task: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstructionError {
    /// Robot name, tool name or target position could not be found in the text.
    CannotParse(Vec<&'static str>),

    /// Target position was found but is not three numbers.
    BadCoordinates(String),
}

impl fmt::Display for InstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstructionError::CannotParse(missing) => {
                write!(f, "Unable to parse instruction: no {} found", missing.join(", "))
            }
            InstructionError::BadCoordinates(msg) => {
                write!(f, "Expected three coordinates for target position: {}", msg)
            }
        }
    }
}

impl std::error::Error for InstructionError {}

static ROBOT_WITH_THE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:using|use)\s+the\s+(.+?)\s+robot").unwrap());
static ROBOT_PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:using|use)\s+(.+?)\s+robot").unwrap());
static TOOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:an|a)\s+([A-Za-z0-9_ .-]+?)\s+tool\b").unwrap());
static POSITION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());

/// Parser with the optional extraction capability injected.
pub struct InstructionParser<'a> {
    extractor: &'a dyn InstructionExtractor,
}

impl<'a> InstructionParser<'a> {
    pub fn new(extractor: &'a dyn InstructionExtractor) -> Self {
        InstructionParser { extractor }
    }

    /// Use the extractor if it is available, and the pattern parser otherwise. An extractor
    /// failure is logged and the pattern parser takes over.
    pub fn parse(&self, text: &str) -> Result<ParsedInstruction, InstructionError> {
        if self.extractor.is_available() {
            match self.extractor.extract(text) {
                Ok(parsed) => {
                    debug!(robot = %parsed.robot_model, tool = %parsed.tool_name, "instruction extracted");
                    return Ok(parsed);
                }
                Err(e) => warn!("Instruction extraction failed, using pattern parser: {}", e),
            }
        }
        parse_with_patterns(text)
    }
}

/// Deterministic extraction. Orientation and task are never set on this path.
pub fn parse_with_patterns(text: &str) -> Result<ParsedInstruction, InstructionError> {
    let robot = ROBOT_WITH_THE
        .captures(text)
        .or_else(|| ROBOT_PLAIN.captures(text))
        .map(|c| c[1].trim().to_string());
    // Several tool-like phrases: the one closest to the coordinates wins.
    let tool = TOOL
        .captures_iter(text)
        .last()
        .map(|c| c[1].trim().to_string());
    let position = POSITION.captures(text).map(|c| c[1].to_string());

    let (robot_model, tool_name, position) = match (robot, tool, position) {
        (Some(robot), Some(tool), Some(position)) => (robot, tool, position),
        (robot, tool, position) => {
            let missing = [
                (robot.is_none(), "robot model"),
                (tool.is_none(), "tool name"),
                (position.is_none(), "target position"),
            ];
            return Err(InstructionError::CannotParse(
                missing.iter().filter(|(absent, _)| *absent).map(|(_, what)| *what).collect(),
            ));
        }
    };

    let target = parse_position(&position)?;
    debug!(robot = %robot_model, tool = %tool_name, ?target, "instruction parsed by patterns");
    Ok(ParsedInstruction { robot_model, tool_name, target, orientation: None, task: None })
}

/// Parse "1.5m, 0.1 m, -2" into a position. Trailing unit letters are dropped.
fn parse_position(list: &str) -> Result<TargetPosition, InstructionError> {
    let values = list
        .split(',')
        .map(|token| {
            let number = token.trim().trim_end_matches(|c: char| c.is_ascii_alphabetic()).trim();
            match number.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(InstructionError::BadCoordinates(format!("'{}' is not a number", token.trim()))),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [x, y, z] => Ok(TargetPosition { x: *x, y: *y, z: *z }),
        _ => Err(InstructionError::BadCoordinates(format!("found {}", values.len()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{NoSemantics, SemanticError};

    #[test]
    fn test_use_the_robot() {
        let parsed =
            parse_with_patterns("Use the UnknownBot robot with a Drill_8mm tool at [0,0,0]").unwrap();
        assert_eq!(parsed.robot_model, "UnknownBot");
        assert_eq!(parsed.tool_name, "Drill_8mm");
        assert_eq!(parsed.target, TargetPosition { x: 0.0, y: 0.0, z: 0.0 });
        assert_eq!(parsed.orientation, None);
        assert_eq!(parsed.task, None);
    }

    #[test]
    fn test_robot_without_article() {
        let parsed = parse_with_patterns("using KR120R2500 robot, move a gripper tool to [1, 2, 3]").unwrap();
        assert_eq!(parsed.robot_model, "KR120R2500");
        assert_eq!(parsed.tool_name, "gripper");
    }

    #[test]
    fn test_last_tool_phrase_wins() {
        let text = "Use the KR120R2500 robot. Put down a gripper tool and pick up an 8mm drill tool, go to [0.5, 0, 1]";
        let parsed = parse_with_patterns(text).unwrap();
        assert_eq!(parsed.tool_name, "8mm drill");
    }

    #[test]
    fn test_unit_suffixes() {
        let parsed = parse_with_patterns("Use the R robot with a T tool at [1.5m, -0.1 m, 20mm]").unwrap();
        assert_eq!(parsed.target, TargetPosition { x: 1.5, y: -0.1, z: 20.0 });
    }

    #[test]
    fn test_first_bracket_is_the_target() {
        let parsed = parse_with_patterns("Use the R robot with a T tool at [1, 2, 3] not [4, 5, 6]").unwrap();
        assert_eq!(parsed.target, TargetPosition { x: 1.0, y: 2.0, z: 3.0 });
    }

    #[test]
    fn test_missing_fields_are_named() {
        let err = parse_with_patterns("Move to [1, 2, 3]").unwrap_err();
        assert_eq!(err, InstructionError::CannotParse(vec!["robot model", "tool name"]));
        assert!(err.to_string().contains("robot model, tool name"));
    }

    #[test]
    fn test_wrong_coordinate_count() {
        let err = parse_with_patterns("Use the R robot with a T tool at [1, 2]").unwrap_err();
        assert!(matches!(err, InstructionError::BadCoordinates(_)));
        let err = parse_with_patterns("Use the R robot with a T tool at [1, two, 3]").unwrap_err();
        assert!(matches!(err, InstructionError::BadCoordinates(_)));
    }

    struct FixedExtractor(Result<ParsedInstruction, SemanticError>);

    impl InstructionExtractor for FixedExtractor {
        fn is_available(&self) -> bool {
            true
        }

        fn extract(&self, _text: &str) -> Result<ParsedInstruction, SemanticError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_extractor_result_used_as_is() {
        let extracted = ParsedInstruction {
            robot_model: "KR120R2500".to_string(),
            tool_name: "drill".to_string(),
            target: TargetPosition { x: 1.0, y: 0.0, z: 0.5 },
            orientation: Some(Orientation::Rpy { roll: 0.0, pitch: 0.1, yaw: 0.2 }),
            task: Some("drill".to_string()),
        };
        let extractor = FixedExtractor(Ok(extracted.clone()));
        let parsed = InstructionParser::new(&extractor).parse("anything at all").unwrap();
        assert_eq!(parsed, extracted);
    }

    #[test]
    fn test_failed_extractor_degrades_to_patterns() {
        let extractor = FixedExtractor(Err(SemanticError::Transport("connection refused".to_string())));
        let parsed = InstructionParser::new(&extractor)
            .parse("Use the R robot with a T tool at [1, 2, 3]")
            .unwrap();
        assert_eq!(parsed.robot_model, "R");
    }

    #[test]
    fn test_no_semantics_uses_patterns() {
        let parser = InstructionParser::new(&NoSemantics);
        assert!(parser.parse("nothing useful").is_err());
    }
}

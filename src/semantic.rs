//! Optional semantic capabilities: structured extraction of an instruction from free text and
//! picking the best resource out of a closed candidate list.
//!
//! Both are traits so that the pipeline receives them at construction time. [`NoSemantics`]
//! is the implementation used when no external service is configured; it is never available
//! and never matches. The strict JSON payloads that a service must return, and the schemas
//! describing them, live here too so that any transport can reuse them.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::instruction::{Orientation, ParsedInstruction, TargetPosition};

#[derive(Debug, Clone, PartialEq)]
pub enum SemanticError {
    /// No service configured.
    Unavailable,

    /// Request could not be delivered or the connection failed.
    Transport(String),

    /// Service answered with a non-success status.
    Status { status: u16, body: String },

    /// Service answered but the payload does not follow the schema.
    InvalidResponse(String),
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticError::Unavailable => write!(f, "Semantic service is not configured"),
            SemanticError::Transport(msg) => write!(f, "Semantic service unreachable: {}", msg),
            SemanticError::Status { status, body } => {
                write!(f, "Semantic service returned HTTP {}: {}", status, body)
            }
            SemanticError::InvalidResponse(msg) => {
                write!(f, "Semantic service returned invalid payload: {}", msg)
            }
        }
    }
}

impl std::error::Error for SemanticError {}

impl From<serde_json::Error> for SemanticError {
    fn from(e: serde_json::Error) -> Self {
        SemanticError::InvalidResponse(e.to_string())
    }
}

/// Reduces free text to a structured instruction.
pub trait InstructionExtractor: Send + Sync {
    fn is_available(&self) -> bool;

    fn extract(&self, text: &str) -> Result<ParsedInstruction, SemanticError>;
}

/// Picks one of the candidates that best fits the query, or none.
pub trait CandidateMatcher: Send + Sync {
    fn is_available(&self) -> bool;

    /// Returns one of `candidates` verbatim, or None if nothing fits.
    fn pick(&self, query: &str, candidates: &[String]) -> Result<Option<String>, SemanticError>;
}

/// No semantic service.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSemantics;

impl InstructionExtractor for NoSemantics {
    fn is_available(&self) -> bool {
        false
    }

    fn extract(&self, _text: &str) -> Result<ParsedInstruction, SemanticError> {
        Err(SemanticError::Unavailable)
    }
}

impl CandidateMatcher for NoSemantics {
    fn is_available(&self) -> bool {
        false
    }

    fn pick(&self, _query: &str, _candidates: &[String]) -> Result<Option<String>, SemanticError> {
        Ok(None)
    }
}

/// The capabilities handed to the pipeline.
#[derive(Clone)]
pub struct Semantics {
    pub extractor: Arc<dyn InstructionExtractor>,
    pub matcher: Arc<dyn CandidateMatcher>,
}

impl Semantics {
    pub fn new(extractor: Arc<dyn InstructionExtractor>, matcher: Arc<dyn CandidateMatcher>) -> Self {
        Semantics { extractor, matcher }
    }

    /// Deterministic parsing and matching only.
    pub fn none() -> Self {
        Semantics { extractor: Arc::new(NoSemantics), matcher: Arc::new(NoSemantics) }
    }

    /// One service providing both capabilities.
    pub fn from_service<S>(service: S) -> Self
    where
        S: InstructionExtractor + CandidateMatcher + 'static,
    {
        let service = Arc::new(service);
        Semantics { extractor: service.clone(), matcher: service }
    }
}

impl Default for Semantics {
    fn default() -> Self {
        Semantics::none()
    }
}

pub const EXTRACTION_PROMPT: &str = "You are a helpful parser for robot inverse kinematics instructions. \
Return ONLY JSON that matches the schema exactly.";

pub const MATCHING_PROMPT: &str = "Pick the best tool_id from Candidates. If none match, return null.";

/// Schema of the instruction payload. Strict mode: every property is listed as required,
/// optional ones are nullable instead.
pub fn instruction_schema() -> Value {
    let nullable_number = json!({ "type": ["number", "null"] });
    json!({
        "type": "object",
        "properties": {
            "robot_model": { "type": "string" },
            "tool_name": { "type": "string" },
            "target": {
                "type": "object",
                "properties": {
                    "x": { "type": "number" },
                    "y": { "type": "number" },
                    "z": { "type": "number" }
                },
                "required": ["x", "y", "z"],
                "additionalProperties": false
            },
            "orientation": {
                "type": ["object", "null"],
                "properties": {
                    "roll": nullable_number,
                    "pitch": nullable_number,
                    "yaw": nullable_number,
                    "quaternion": {
                        "type": ["array", "null"],
                        "items": { "type": "number" },
                        "minItems": 4,
                        "maxItems": 4
                    },
                    "keyword": { "type": ["string", "null"] }
                },
                "required": ["roll", "pitch", "yaw", "quaternion", "keyword"],
                "additionalProperties": false
            },
            "task": { "type": ["string", "null"] }
        },
        "required": ["robot_model", "tool_name", "target", "orientation", "task"],
        "additionalProperties": false
    })
}

/// Schema of the matching payload: one of the candidates, or null.
pub fn candidate_schema(candidates: &[String]) -> Value {
    json!({
        "type": "object",
        "properties": {
            "tool_id": {
                "anyOf": [
                    { "type": "string", "enum": candidates },
                    { "type": "null" }
                ]
            }
        },
        "required": ["tool_id"],
        "additionalProperties": false
    })
}

/// User message of the matching request.
pub fn candidate_query(query: &str, candidates: &[String]) -> String {
    format!("Query: {}\nCandidates: {:?}", query, candidates)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetPayload {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OrientationPayload {
    #[serde(default)]
    roll: Option<f64>,
    #[serde(default)]
    pitch: Option<f64>,
    #[serde(default)]
    yaw: Option<f64>,
    #[serde(default)]
    quaternion: Option<Vec<f64>>,
    #[serde(default)]
    keyword: Option<String>,
}

impl OrientationPayload {
    /// Quaternion first, then roll/pitch/yaw (all three needed), then keyword.
    fn into_orientation(self) -> Result<Option<Orientation>, SemanticError> {
        if let Some(q) = self.quaternion {
            return match q.as_slice() {
                [w, x, y, z] => Ok(Some(Orientation::Quaternion { w: *w, x: *x, y: *y, z: *z })),
                _ => Err(SemanticError::InvalidResponse(format!(
                    "quaternion must have 4 components, got {}",
                    q.len()
                ))),
            };
        }
        if let (Some(roll), Some(pitch), Some(yaw)) = (self.roll, self.pitch, self.yaw) {
            return Ok(Some(Orientation::Rpy { roll, pitch, yaw }));
        }
        Ok(self.keyword.map(Orientation::Keyword))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstructionPayload {
    robot_model: String,
    tool_name: String,
    target: TargetPayload,
    #[serde(default)]
    orientation: Option<OrientationPayload>,
    #[serde(default)]
    task: Option<String>,
}

/// Read the extraction payload returned by a service.
pub fn parse_instruction_payload(text: &str) -> Result<ParsedInstruction, SemanticError> {
    let payload: InstructionPayload = serde_json::from_str(text.trim())?;
    let orientation = match payload.orientation {
        Some(orientation) => orientation.into_orientation()?,
        None => None,
    };
    Ok(ParsedInstruction {
        robot_model: payload.robot_model,
        tool_name: payload.tool_name,
        target: TargetPosition { x: payload.target.x, y: payload.target.y, z: payload.target.z },
        orientation,
        task: payload.task,
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CandidatePayload {
    tool_id: Option<String>,
}

/// Read the matching payload returned by a service.
pub fn parse_candidate_payload(text: &str) -> Result<Option<String>, SemanticError> {
    let payload: CandidatePayload = serde_json::from_str(text.trim())?;
    Ok(payload.tool_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_payload() {
        let text = r#"{
            "robot_model": "KUKA KR120 R2500",
            "tool_name": "8mm drill",
            "target": {"x": 1.5, "y": 0.1, "z": 1.0},
            "orientation": {"roll": 0.0, "pitch": 0.5, "yaw": 1.0, "quaternion": null, "keyword": null},
            "task": "drilling"
        }"#;
        let parsed = parse_instruction_payload(text).unwrap();
        assert_eq!(parsed.robot_model, "KUKA KR120 R2500");
        assert_eq!(parsed.target, TargetPosition { x: 1.5, y: 0.1, z: 1.0 });
        assert_eq!(parsed.orientation, Some(Orientation::Rpy { roll: 0.0, pitch: 0.5, yaw: 1.0 }));
        assert_eq!(parsed.task.as_deref(), Some("drilling"));
    }

    #[test]
    fn test_nulls_and_missing_optionals() {
        let text = r#"{"robot_model": "R", "tool_name": "T", "target": {"x": 0, "y": 0, "z": 0},
                       "orientation": null, "task": null}"#;
        let parsed = parse_instruction_payload(text).unwrap();
        assert_eq!(parsed.orientation, None);
        let text = r#"{"robot_model": "R", "tool_name": "T", "target": {"x": 0, "y": 0, "z": 0}}"#;
        assert!(parse_instruction_payload(text).is_ok());
    }

    #[test]
    fn test_quaternion_beats_rpy() {
        let text = r#"{"robot_model": "R", "tool_name": "T", "target": {"x": 0, "y": 0, "z": 0},
                       "orientation": {"roll": 1, "pitch": 2, "yaw": 3, "quaternion": [0, 1, 0, 0]}}"#;
        let parsed = parse_instruction_payload(text).unwrap();
        assert_eq!(parsed.orientation, Some(Orientation::Quaternion { w: 0.0, x: 1.0, y: 0.0, z: 0.0 }));
    }

    #[test]
    fn test_partial_rpy_falls_to_keyword() {
        let text = r#"{"robot_model": "R", "tool_name": "T", "target": {"x": 0, "y": 0, "z": 0},
                       "orientation": {"roll": 1, "keyword": "downwards"}}"#;
        let parsed = parse_instruction_payload(text).unwrap();
        assert_eq!(parsed.orientation, Some(Orientation::Keyword("downwards".to_string())));
    }

    #[test]
    fn test_strict_payload() {
        // Extra field
        let text = r#"{"robot_model": "R", "tool_name": "T", "target": {"x": 0, "y": 0, "z": 0}, "speed": 1}"#;
        assert!(matches!(parse_instruction_payload(text), Err(SemanticError::InvalidResponse(_))));
        // Missing coordinate
        let text = r#"{"robot_model": "R", "tool_name": "T", "target": {"x": 0, "y": 0}}"#;
        assert!(parse_instruction_payload(text).is_err());
        // Short quaternion
        let text = r#"{"robot_model": "R", "tool_name": "T", "target": {"x": 0, "y": 0, "z": 0},
                       "orientation": {"quaternion": [1, 0, 0]}}"#;
        assert!(parse_instruction_payload(text).is_err());
    }

    #[test]
    fn test_candidate_payload() {
        assert_eq!(parse_candidate_payload(r#"{"tool_id": "Drill_8mm"}"#).unwrap(), Some("Drill_8mm".to_string()));
        assert_eq!(parse_candidate_payload(r#"{"tool_id": null}"#).unwrap(), None);
        assert!(parse_candidate_payload(r#"{"id": "Drill_8mm"}"#).is_err());
    }

    #[test]
    fn test_schemas_are_strict() {
        let schema = instruction_schema();
        let properties = schema["properties"].as_object().unwrap();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(properties.len(), required.len());
        assert_eq!(schema["additionalProperties"], json!(false));

        let candidates = vec!["Drill_8mm".to_string(), "Spindle_Holder".to_string()];
        let schema = candidate_schema(&candidates);
        assert_eq!(schema["properties"]["tool_id"]["anyOf"][0]["enum"], json!(["Drill_8mm", "Spindle_Holder"]));
        assert_eq!(candidate_query("drill", &candidates), "Query: drill\nCandidates: [\"Drill_8mm\", \"Spindle_Holder\"]");
    }

    #[test]
    fn test_no_semantics() {
        assert!(!InstructionExtractor::is_available(&NoSemantics));
        assert!(!CandidateMatcher::is_available(&NoSemantics));
        assert_eq!(NoSemantics.extract("x"), Err(SemanticError::Unavailable));
        assert_eq!(NoSemantics.pick("x", &["a".to_string()]), Ok(None));
    }
}

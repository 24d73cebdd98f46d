//! Settings of the pipeline. Everything the pipeline needs is passed in explicitly; nothing
//! is taken from the process environment.
//!
//! The same settings can be read from YAML:
//! ```yaml
//! resources:
//!   root: RobotResources
//!   robots: RobotModels
//!   tools: Tools
//!   extension: m
//! synonyms:
//!   drilling: drill
//! solver:
//!   max_iterations: 500
//!   tolerance: 1e-10
//!   initial_damping: 1e-3
//!   max_damping: 1e8
//!   stall_iterations: 20
//! semantic:
//!   api_key: sk-...
//!   base_url: https://api.openai.com/v1
//!   model: gpt-5-mini
//!   timeout_secs: 30
//!   retries: 1
//! ```
//! Every section and key is optional; missing ones keep their defaults. Unknown keys are
//! ignored.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use yaml_rust2::{Yaml, YamlLoader};

use crate::solver::SolverConfig;

#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    YamlError(String),
    InvalidValue { key: String, expected: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::IoError(ref err) => write!(f, "IO Error: {}", err),
            ConfigError::YamlError(ref msg) => write!(f, "YAML Error: {}", msg),
            ConfigError::InvalidValue { ref key, expected } => {
                write!(f, "Invalid value for '{}': expected {}", key, expected)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            ConfigError::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Connection to the external extraction / matching service.
#[derive(Clone)]
pub struct SemanticServiceConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Bound on every single request.
    pub timeout: Duration,
    /// Extra attempts after a transport failure or a 5xx answer.
    pub retries: u32,
}

impl SemanticServiceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        SemanticServiceConfig {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-5-mini".to_string(),
            timeout: Duration::from_secs(30),
            retries: 1,
        }
    }
}

// Keeps the key out of logs.
impl fmt::Debug for SemanticServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticServiceConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the robot and tool subdirectories.
    pub resources_root: PathBuf,
    pub robot_dir: String,
    pub tool_dir: String,
    /// Extension of descriptor files, without the dot.
    pub extension: String,
    /// Free-text rewrites applied before matching resource names, in order.
    pub synonyms: Vec<(String, String)>,
    pub solver: SolverConfig,
    /// None disables semantic extraction and matching.
    pub semantic: Option<SemanticServiceConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            resources_root: PathBuf::from("RobotResources"),
            robot_dir: "RobotModels".to_string(),
            tool_dir: "Tools".to_string(),
            extension: "m".to_string(),
            synonyms: vec![("drilling".to_string(), "drill".to_string())],
            solver: SolverConfig::default(),
            semantic: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_resources<P: Into<PathBuf>>(resources_root: P) -> Self {
        PipelineConfig { resources_root: resources_root.into(), ..PipelineConfig::default() }
    }

    pub fn robots_path(&self) -> PathBuf {
        self.resources_root.join(&self.robot_dir)
    }

    pub fn tools_path(&self) -> PathBuf {
        self.resources_root.join(&self.tool_dir)
    }

    /// Read the configuration from YAML file. Relative resource root is kept as written
    /// (relative to the working directory).
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let docs = YamlLoader::load_from_str(contents)
            .map_err(|e| ConfigError::YamlError(e.to_string()))?;
        let mut config = PipelineConfig::default();
        let Some(doc) = docs.first() else {
            return Ok(config);
        };

        let resources = &doc["resources"];
        if let Some(root) = opt_string(resources, "resources", "root")? {
            config.resources_root = PathBuf::from(root);
        }
        if let Some(robots) = opt_string(resources, "resources", "robots")? {
            config.robot_dir = robots;
        }
        if let Some(tools) = opt_string(resources, "resources", "tools")? {
            config.tool_dir = tools;
        }
        if let Some(extension) = opt_string(resources, "resources", "extension")? {
            config.extension = extension.trim_start_matches('.').to_string();
        }

        match &doc["synonyms"] {
            Yaml::BadValue | Yaml::Null => {}
            Yaml::Hash(hash) => {
                config.synonyms = hash
                    .iter()
                    .map(|(from, to)| match (from.as_str(), to.as_str()) {
                        (Some(from), Some(to)) => Ok((from.to_string(), to.to_string())),
                        _ => Err(invalid("synonyms", "string to string mapping")),
                    })
                    .collect::<Result<_, _>>()?;
            }
            _ => return Err(invalid("synonyms", "string to string mapping")),
        }

        let solver = &doc["solver"];
        let defaults = SolverConfig::default();
        config.solver = SolverConfig {
            max_iterations: opt_usize(solver, "solver", "max_iterations")?.unwrap_or(defaults.max_iterations),
            tolerance: opt_positive(solver, "solver", "tolerance")?.unwrap_or(defaults.tolerance),
            initial_damping: opt_positive(solver, "solver", "initial_damping")?
                .unwrap_or(defaults.initial_damping),
            max_damping: opt_positive(solver, "solver", "max_damping")?.unwrap_or(defaults.max_damping),
            stall_iterations: opt_usize(solver, "solver", "stall_iterations")?
                .unwrap_or(defaults.stall_iterations),
        };

        let semantic = &doc["semantic"];
        if let Some(api_key) = opt_string(semantic, "semantic", "api_key")? {
            let mut service = SemanticServiceConfig::new(api_key);
            if let Some(base_url) = opt_string(semantic, "semantic", "base_url")? {
                service.base_url = base_url.trim_end_matches('/').to_string();
            }
            if let Some(model) = opt_string(semantic, "semantic", "model")? {
                service.model = model;
            }
            if let Some(secs) = opt_positive(semantic, "semantic", "timeout_secs")? {
                service.timeout = Duration::try_from_secs_f64(secs)
                    .map_err(|_| invalid("semantic.timeout_secs", "timeout in seconds"))?;
            }
            if let Some(retries) = opt_usize(semantic, "semantic", "retries")? {
                service.retries = u32::try_from(retries).map_err(|_| invalid("semantic.retries", "small integer"))?;
            }
            config.semantic = Some(service);
        }

        Ok(config)
    }
}

fn invalid(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue { key: key.to_string(), expected }
}

fn opt_string(section: &Yaml, section_name: &str, key: &str) -> Result<Option<String>, ConfigError> {
    match &section[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::String(s) => Ok(Some(s.clone())),
        Yaml::Integer(i) => Ok(Some(i.to_string())),
        _ => Err(invalid(&format!("{}.{}", section_name, key), "string")),
    }
}

fn opt_usize(section: &Yaml, section_name: &str, key: &str) -> Result<Option<usize>, ConfigError> {
    match &section[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Integer(i) if *i >= 0 => Ok(Some(*i as usize)),
        _ => Err(invalid(&format!("{}.{}", section_name, key), "non-negative integer")),
    }
}

fn opt_positive(section: &Yaml, section_name: &str, key: &str) -> Result<Option<f64>, ConfigError> {
    let value = match &section[key] {
        Yaml::BadValue | Yaml::Null => return Ok(None),
        Yaml::Integer(i) => Some(*i as f64),
        real @ Yaml::Real(_) => real.as_f64(),
        _ => None,
    };
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(Some(v)),
        _ => Err(invalid(&format!("{}.{}", section_name, key), "positive number")),
    }
}

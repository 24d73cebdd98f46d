use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vibe_ik::config::{PipelineConfig, SemanticServiceConfig};
use vibe_ik::pipeline::{Pipeline, SolveResponse};
use vibe_ik::semantic::Semantics;

/// Turn a free-text instruction into joint angles of the named robot.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Instruction, e.g. "Use the KR120R2500 robot with a Drill_8mm tool at [1.5, 0.1, 1.0]"
    text: String,

    /// Print the response as JSON.
    #[arg(long)]
    json: bool,

    /// Directory with RobotModels/ and Tools/ subdirectories.
    #[arg(long, value_name = "DIR")]
    resources: Option<PathBuf>,

    /// YAML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Never call the semantic service, even if OPENAI_API_KEY is set.
    #[arg(long)]
    no_semantic: bool,
}

fn semantics(config: &PipelineConfig) -> Result<Semantics> {
    match &config.semantic {
        Some(service) => service_semantics(service),
        None => Ok(Semantics::none()),
    }
}

#[cfg(feature = "semantic_http")]
fn service_semantics(service: &SemanticServiceConfig) -> Result<Semantics> {
    let client = vibe_ik::openai::OpenAiService::new(service.clone())
        .context("Failed to set up the semantic service")?;
    Ok(Semantics::from_service(client))
}

#[cfg(not(feature = "semantic_http"))]
fn service_semantics(service: &SemanticServiceConfig) -> Result<Semantics> {
    tracing::warn!("Built without semantic_http, ignoring service at {}", service.base_url);
    Ok(Semantics::none())
}

fn print_human(response: &SolveResponse) {
    if !response.ok {
        println!("Warning: {}", response.warnings.join("; "));
        return;
    }
    if let Some(rad) = &response.joint_angles_rad {
        println!("Joint angles (rad): {:?}", rad);
    }
    if let Some(deg) = &response.joint_angles_deg {
        println!("Joint angles (deg): {:?}", deg);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(resources) = cli.resources {
        config.resources_root = resources;
    }
    if cli.no_semantic {
        config.semantic = None;
    } else if config.semantic.is_none() {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                config.semantic = Some(SemanticServiceConfig::new(key.trim()));
            }
        }
    }

    let semantics = semantics(&config)?;
    let response = Pipeline::new(config, semantics).run(&cli.text);

    if cli.json {
        println!("{}", serde_json::to_string(&response).context("Failed to serialize response")?);
    } else {
        print_human(&response);
    }
    Ok(())
}

//! ontorepair - ontology validation and repair CLI
//!
//! ## Commands
//!
//! - `validate`: run one checking pass over a Turtle file
//! - `repair`: run the validate-and-repair loop against a generative backend
//! - `inspect`: verify and print a recorded loop artifact

mod config;
mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use ontorepair_core::{
    read_loop_artifact, write_loop_artifact, BackendError, CancelToken, GenerativeBackend,
    LoopOutcome, OntologyCandidate, RepairPrompt, ValidationOrchestrator,
};
use tracing::{info, warn, Level};

use crate::config::{CliConfig, DEFAULT_ARTIFACTS_DIR};

#[derive(Parser)]
#[command(name = "ontorepair")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validate OWL ontologies and repair them with a language model", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "ONTOREPAIR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ReasonerArgs {
    /// Reasoners to consult (overrides the configured list)
    #[arg(short, long = "reasoner", value_delimiter = ',')]
    reasoners: Vec<String>,

    /// Directory holding HermiT.jar and robot.jar
    #[arg(long, env = "ONTOREPAIR_JAR_DIR")]
    jar_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a Turtle file once (exit code 1 when invalid)
    Validate {
        /// Turtle file to check
        file: PathBuf,

        #[command(flatten)]
        reasoner: ReasonerArgs,

        /// Print the report as JSON
        #[arg(long)]
        json_report: bool,
    },

    /// Validate and repair a Turtle file (exit code 2 unless repaired)
    Repair {
        /// Turtle file to repair
        file: PathBuf,

        /// Where to write the repaired ontology
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Root directory for loop artifacts
        #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
        artifacts: PathBuf,

        /// Skip writing loop artifacts
        #[arg(long)]
        no_artifacts: bool,

        /// Maximum repair iterations (overrides the configuration)
        #[arg(long, env = "ONTOREPAIR_MAX_ITERATIONS")]
        max_iterations: Option<u32>,

        #[command(flatten)]
        reasoner: ReasonerArgs,

        /// Print the summary as JSON
        #[arg(long)]
        json_report: bool,
    },

    /// Verify a recorded loop artifact and print its history
    Inspect {
        /// Run ID to inspect
        run_id: String,

        /// Root directory containing loop artifacts
        #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
        artifacts: PathBuf,

        /// Print the whole loop state as JSON
        #[arg(long)]
        json_report: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    ontorepair_core::init_tracing(cli.json, level);

    let mut config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate {
            file,
            reasoner,
            json_report,
        } => {
            apply_reasoner_args(&mut config, &reasoner);
            cmd_validate(&config, &file, reasoner.jar_dir.as_deref(), json_report).await
        }
        Commands::Repair {
            file,
            out,
            artifacts,
            no_artifacts,
            max_iterations,
            reasoner,
            json_report,
        } => {
            apply_reasoner_args(&mut config, &reasoner);
            if let Some(max_iterations) = max_iterations {
                config.loop_config.max_iterations = max_iterations;
            }
            let artifacts = (!no_artifacts).then_some(artifacts);
            cmd_repair(
                &config,
                &file,
                out.as_deref(),
                artifacts.as_deref(),
                reasoner.jar_dir.as_deref(),
                json_report,
            )
            .await
        }
        Commands::Inspect {
            run_id,
            artifacts,
            json_report,
        } => cmd_inspect(&run_id, &artifacts, json_report),
    }
}

fn apply_reasoner_args(config: &mut CliConfig, args: &ReasonerArgs) {
    if !args.reasoners.is_empty() {
        config.loop_config.reasoners = args.reasoners.clone();
    }
}

/// Backend for commands that never request a repair.
struct NoBackend;

#[async_trait]
impl GenerativeBackend for NoBackend {
    async fn complete(&self, _prompt: &RepairPrompt) -> Result<String, BackendError> {
        Err(BackendError::Content("no generative backend configured".to_string()))
    }
}

fn read_ontology(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read ontology {:?}", file))
}

async fn cmd_validate(
    config: &CliConfig,
    file: &Path,
    jar_dir: Option<&Path>,
    json_report: bool,
) -> Result<ExitCode> {
    let text = read_ontology(file)?;
    let reasoners = config.reasoners(jar_dir)?;
    let orchestrator =
        ValidationOrchestrator::new(config.loop_config.clone(), reasoners, Arc::new(NoBackend))?;

    let report = orchestrator.check(&OntologyCandidate::draft(text)).await;

    if json_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report::print_report(file, &report);
    }

    Ok(if report.is_valid() && report.is_trusted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

async fn cmd_repair(
    config: &CliConfig,
    file: &Path,
    out: Option<&Path>,
    artifacts: Option<&Path>,
    jar_dir: Option<&Path>,
    json_report: bool,
) -> Result<ExitCode> {
    let text = read_ontology(file)?;
    let reasoners = config.reasoners(jar_dir)?;
    let backend = Arc::new(config.backend()?);
    info!(model = %backend.config().model, endpoint = %backend.config().endpoint(), "using backend");
    let orchestrator = ValidationOrchestrator::new(config.loop_config.clone(), reasoners, backend)?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current step");
            on_interrupt.cancel();
        }
    });

    let state = orchestrator.run_with_cancel(text, &cancel).await;

    let artifact_path = match artifacts {
        Some(dir) => Some(
            write_loop_artifact(&state, dir)
                .with_context(|| format!("Failed to write loop artifact under {:?}", dir))?,
        ),
        None => None,
    };

    let output_path = match (state.final_candidate(), out) {
        (Some(candidate), Some(path)) => {
            std::fs::write(path, candidate.text())
                .with_context(|| format!("Failed to write repaired ontology to {:?}", path))?;
            Some(path.to_path_buf())
        }
        _ => None,
    };

    let summary = report::RepairSummary::new(&state, output_path, artifact_path);
    if json_report {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        report::print_summary(&summary);
        if out.is_none() {
            if let Some(candidate) = state.final_candidate() {
                println!();
                println!("{}", candidate.text());
            }
        }
    }

    Ok(if state.outcome() == Some(LoopOutcome::Success) {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn cmd_inspect(run_id: &str, artifacts: &Path, json_report: bool) -> Result<ExitCode> {
    let state = read_loop_artifact(run_id, artifacts)
        .with_context(|| format!("Failed to load loop artifact {} from {:?}", run_id, artifacts))?;

    if json_report {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        let summary = report::RepairSummary::new(&state, None, None);
        report::print_summary(&summary);
        println!("Artifact digest verified.");
    }
    Ok(ExitCode::SUCCESS)
}

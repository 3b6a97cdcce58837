//! Application entry point: the `ielts-eval` command line.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] (default on first run, or from `--config`).
//! 3. Resolve the rubric and build the evaluator from config.
//! 4. Dispatch the subcommand on the tokio runtime.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ielts_speaking_eval::{
    config::{AppConfig, AppPaths},
    llm::{IeltsEvaluator, PromptBuilder, Rubric},
    pipeline::{load_text, EvaluationSession, SessionError, SessionPart},
    scoring::{EmbeddingScorer, FeedbackScorer, ScoreReport},
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "ielts-eval", version, about = "IELTS Speaking evaluation over a streaming LLM")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, env = "IELTS_EVAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate one recording and print the feedback
    Evaluate {
        /// URL or path of the audio clip
        locator: String,
        /// Override the configured model
        #[arg(long)]
        model: Option<String>,
    },
    /// Evaluate a multi-part test and write feedback files
    Session {
        /// Audio clip per part, in order (repeatable)
        #[arg(long = "part", required = true)]
        parts: Vec<String>,
        /// Human reference feedback to score against
        #[arg(long)]
        reference: Option<PathBuf>,
        /// Output directory (defaults to the configured one)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Override the configured model
        #[arg(long)]
        model: Option<String>,
    },
    /// Score existing feedback against a human reference
    Score {
        #[arg(long)]
        candidate: PathBuf,
        #[arg(long)]
        reference: PathBuf,
        /// Write the report as JSON instead of only printing it
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the resolved evaluation instruction
    Rubric,
    /// Write the default settings file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let settings_path = cli
        .config
        .clone()
        .unwrap_or_else(|| AppPaths::new().settings_file);

    // `init-config` must not require a readable config.
    if let Command::InitConfig { force } = cli.command {
        return init_config(&settings_path, force);
    }

    // 2. Configuration
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Evaluate { locator, model } => {
            let evaluator = build_evaluator(&config, model)?;
            let result = evaluator.evaluate(&locator).await?;
            println!("{}", result.text);
            Ok(ExitCode::SUCCESS)
        }
        Command::Session {
            parts,
            reference,
            output_dir,
            model,
        } => {
            let evaluator = build_evaluator(&config, model)?;
            let output_dir = output_dir.unwrap_or_else(|| config.output.resolve_dir());
            run_session(&config, evaluator, &parts, reference.as_deref(), output_dir).await
        }
        Command::Score {
            candidate,
            reference,
            output,
        } => {
            let candidate = read_input(&candidate)?;
            let reference = read_input(&reference)?;
            let scorer = EmbeddingScorer::from_config(&config.scoring);
            let report = ScoreReport::evaluate(&scorer, &candidate, &reference).await;
            if let Some(path) = output {
                report.save(&path)?;
            }
            if report.is_success() {
                println!("{}", report.render_metrics());
                Ok(ExitCode::SUCCESS)
            } else {
                log::error!(
                    "Scoring failed: {}",
                    report.error.as_deref().unwrap_or("unknown error")
                );
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Rubric => {
            let rubric = Rubric::from_config(&config.rubric)?;
            println!("{}", PromptBuilder::new(&rubric).instruction().trim());
            Ok(ExitCode::SUCCESS)
        }
        Command::InitConfig { .. } => Ok(ExitCode::SUCCESS),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// An explicit `--config` must load; the default location falls back to
/// defaults with a warning.
fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }
    Ok(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    }))
}

fn init_config(path: &Path, force: bool) -> Result<ExitCode> {
    if path.exists() && !force {
        log::error!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
        return Ok(ExitCode::FAILURE);
    }
    AppConfig::default()
        .save_to(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("Wrote default settings to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn build_evaluator(config: &AppConfig, model: Option<String>) -> Result<IeltsEvaluator> {
    let rubric = Rubric::from_config(&config.rubric)?;
    let evaluator = IeltsEvaluator::from_config(&config.llm, &rubric);
    Ok(match model {
        Some(model) => evaluator.with_model(model),
        None => evaluator,
    })
}

fn read_input(path: &Path) -> Result<String> {
    load_text(path).with_context(|| format!("failed to read {}", path.display()))
}

async fn run_session(
    config: &AppConfig,
    evaluator: IeltsEvaluator,
    parts: &[String],
    reference: Option<&Path>,
    output_dir: PathBuf,
) -> Result<ExitCode> {
    let reference = reference.map(read_input).transpose()?;

    let mut session = EvaluationSession::new(evaluator, output_dir);
    if reference.is_some() {
        if config.scoring.enabled {
            let scorer: Arc<dyn FeedbackScorer> =
                Arc::new(EmbeddingScorer::from_config(&config.scoring));
            session = session.with_scorer(scorer);
        } else {
            log::info!("Scoring disabled in config; reference ignored");
        }
    }

    let parts = SessionPart::numbered(parts.iter().cloned());
    match session.run(&parts, reference.as_deref()).await {
        Ok(summary) => {
            summary.log();
            log::info!("Results saved in {}", summary.output_dir.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ SessionError::AllPartsFailed(_)) => {
            log::error!("{e}");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

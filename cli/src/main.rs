use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod logging;
mod output;
mod utils;

use commands::{apply, plan, tree, validate, PartialApplyFailure};
use manifest::ManifestError;
use reconciler::{PhaseOrder, ReconcileError, ReconcilerConfiguration};
use resolver::ResolutionError;
use utils::env_paths::EnvPaths;

/// grantsync - reconcile account access assignments against a manifest
#[derive(Parser)]
#[command(name = "grantsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a manifest for structural errors
    Validate {
        /// Manifest file (.yaml, .yml or .json)
        manifest: PathBuf,

        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text", value_parser = ["text", "json", "yaml"])]
        format: String,
    },

    /// Show the changes needed to converge the directory on the manifest
    Plan {
        #[command(flatten)]
        inputs: Inputs,

        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text", value_parser = ["text", "json", "yaml"])]
        format: String,
    },

    /// Apply the plan to the directory (dry run unless approved or disabled by configuration)
    Apply {
        #[command(flatten)]
        inputs: Inputs,

        /// Perform the changes even when the configuration asks for a dry run
        #[arg(long)]
        auto_approve: bool,

        /// Refuse to apply while unattributed assignments exist
        #[arg(long)]
        guardrail: bool,

        /// Only apply if the plan fingerprint matches (full hash or a prefix of 8+ characters)
        #[arg(long, value_name = "HEX")]
        expect_fingerprint: Option<String>,

        /// Maximum concurrent directory calls per phase
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,

        /// Which phase runs first (creates_first, deletes_first)
        #[arg(long, value_parser = parse_phase_order)]
        ordering: Option<PhaseOrder>,

        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text", value_parser = ["text", "json", "yaml"])]
        format: String,
    },

    /// Print the organization hierarchy of a directory snapshot
    Tree {
        /// Directory snapshot file (.yaml, .yml or .json)
        #[arg(short, long, env = "GRANTSYNC_DIRECTORY")]
        directory: PathBuf,

        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text", value_parser = ["text", "json", "yaml"])]
        format: String,
    },
}

/// Manifest and directory inputs shared by plan and apply
#[derive(Args, Debug, Clone)]
pub struct Inputs {
    /// Manifest file (.yaml, .yml or .json)
    #[arg(short, long, env = "GRANTSYNC_MANIFEST")]
    pub manifest: PathBuf,

    /// Directory snapshot file (.yaml, .yml or .json)
    #[arg(short, long, env = "GRANTSYNC_DIRECTORY")]
    pub directory: PathBuf,
}

fn parse_phase_order(value: &str) -> Result<PhaseOrder, String> {
    PhaseOrder::parse(value)
        .ok_or_else(|| format!("unknown ordering '{}', expected creates_first or deletes_first", value))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Run the command and map failures onto exit codes
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Load environment paths (reads .env when present)
    let env_paths = EnvPaths::load()?;

    // Load the reconciler configuration file, if any
    let config = ReconcilerConfiguration::load_from_directory(&env_paths.configuration_path)?;

    // Initialize logging, the environment wins over the configuration file
    let log_dir = env_paths
        .log_path
        .clone()
        .or_else(|| config.as_ref().and_then(ReconcilerConfiguration::log_directory));
    let _guard = logging::init_logging(cli.verbose, log_dir.as_deref())?;

    // Build the policy: defaults, then configuration, then GRANTSYNC_* variables
    let mut policy = match &config {
        Some(config) => config.policy()?,
        None => Default::default(),
    };
    reconciler::apply_env_overrides(&mut policy, |key| std::env::var(key).ok());

    // Execute the command
    match cli.command {
        Commands::Validate { manifest, format } => {
            validate::execute(&manifest, &format)?;
        }
        Commands::Plan { inputs, format } => {
            plan::execute(&inputs, policy, &format).await?;
        }
        Commands::Apply {
            inputs,
            auto_approve,
            guardrail,
            expect_fingerprint,
            concurrency,
            ordering,
            format,
        } => {
            // Command-line flags only ever tighten or approve
            if auto_approve {
                policy.dry_run = false;
            }
            policy.guardrail |= guardrail;
            if let Some(concurrency) = concurrency {
                policy.max_concurrency = concurrency;
            }
            if let Some(ordering) = ordering {
                policy.ordering = ordering;
            }
            apply::execute(&inputs, policy, expect_fingerprint.as_deref(), &format).await?;
        }
        Commands::Tree { directory, format } => {
            tree::execute(&directory, &format).await?;
        }
    }

    Ok(())
}

/// Process exit code for a run-fatal error
fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(err) = cause.downcast_ref::<ReconcileError>() {
            return match err {
                ReconcileError::Manifest(_) => 2,
                ReconcileError::Resolution(_) => 3,
                ReconcileError::DriftDetected(_) => 4,
                _ => 1,
            };
        }
        if cause.downcast_ref::<ManifestError>().is_some() {
            return 2;
        }
        if cause.downcast_ref::<ResolutionError>().is_some() {
            return 3;
        }
        if cause.downcast_ref::<PartialApplyFailure>().is_some() {
            return 5;
        }
    }
    1
}

//! Psyche CLI - operator interface for the assessment engine
//!
//! - Score a recorded history and run the validity checks
//! - Ask the adaptive controller for the next item
//! - Issue and validate license keys
//! - Run the integrity self-audit

use clap::{Parser, Subcommand};
use psyche_engine::{telemetry, EngineConfig, EngineError};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod error;
mod output;

use commands::{assess, audit, license};
use error::CliResult;

/// Psyche CLI application
#[derive(Parser, Debug)]
#[command(name = "psyche")]
#[command(about = "Psyche - adaptive assessment engine CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PSYCHE_CONFIG")]
    config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a history file (JSON array of responses)
    Score {
        /// History file
        file: PathBuf,
    },

    /// Suggest the next item for a history file
    Next {
        /// History file
        file: PathBuf,

        /// Item currently in flight
        #[arg(long)]
        exclude: Option<u32>,
    },

    /// License key management
    License {
        #[command(subcommand)]
        command: license::LicenseCommands,
    },

    /// Run one integrity self-audit
    Audit {
        /// Treat warnings as failures
        #[arg(long)]
        strict: bool,
    },

    /// Show effective configuration
    Config,
}

fn run(cli: Cli) -> CliResult<()> {
    let mut config = EngineConfig::load(cli.config.as_deref()).map_err(EngineError::from)?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    telemetry::init_tracing(&config.logging)?;
    tracing::debug!(command = ?cli.command, "Starting");

    match cli.command {
        Commands::Score { file } => assess::execute_score(&file, &config),
        Commands::Next { file, exclude } => assess::execute_next(&file, exclude, &config),
        Commands::License { command } => license::execute(command, &config),
        Commands::Audit { strict } => audit::execute(&config, strict),
        Commands::Config => output::print_json(&config),
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

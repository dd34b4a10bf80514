//! License key commands

use chrono::{DateTime, Utc};
use clap::Subcommand;
use psyche_engine::EngineConfig;
use psyche_integrity::{LicenseStatus, LicenseTier};
use serde::Serialize;

use crate::error::{CliError, CliResult};
use crate::output::{colorize_license, print_info, print_json};

/// License subcommands
#[derive(Subcommand, Debug)]
pub enum LicenseCommands {
    /// Issue a new key
    Generate {
        /// Tier name (upper-case alphanumerics)
        #[arg(long)]
        tier: String,

        /// Validity in days
        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// Check a key
    Validate {
        /// License key
        key: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IssuedLicense {
    key: String,
    tier: LicenseTier,
    issued_at: DateTime<Utc>,
}

/// Execute a license command
pub fn execute(command: LicenseCommands, config: &EngineConfig) -> CliResult<()> {
    let authority = config.integrity.license_authority()?;
    let now = Utc::now();

    match command {
        LicenseCommands::Generate { tier, days } => {
            let tier = LicenseTier::parse(&tier)?;
            let key = authority.generate(&tier, days, now)?;
            print_json(&IssuedLicense {
                key,
                tier,
                issued_at: now,
            })?;
            print_info(&format!("Key valid for {days} day(s)"));
            Ok(())
        }

        LicenseCommands::Validate { key } => {
            let status = authority.validate(&key, now);
            print_json(&status)?;
            eprintln!("License: {}", colorize_license(&status));
            match status {
                LicenseStatus::Valid { .. } => Ok(()),
                other => Err(CliError::LicenseRejected(other.label())),
            }
        }
    }
}

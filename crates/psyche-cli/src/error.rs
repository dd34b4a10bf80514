//! Error types for the CLI

use psyche_engine::EngineError;
use psyche_integrity::LicenseError;
use psyche_types::TypesError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid history JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid history: {0}")]
    History(#[from] TypesError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    License(#[from] LicenseError),

    #[error("license is {0}")]
    LicenseRejected(&'static str),

    #[error("integrity audit reported {0}")]
    AuditFailed(String),
}

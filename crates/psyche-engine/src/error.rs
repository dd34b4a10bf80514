//! Error types for psyche-engine

use psyche_integrity::{CodecError, LicenseError, StorageError, VaultError};
use psyche_types::TypesError;
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in the engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Session state was wiped by the integrity auditor
    #[error("session is in lockdown: {reason}")]
    Lockdown { reason: String },

    /// Invalid response or layout
    #[error(transparent)]
    Types(#[from] TypesError),

    /// Persisted state could not be encoded
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Storage backend failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration failed to load
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// License configuration is unusable
    #[error("license error: {0}")]
    License(#[from] LicenseError),

    /// Tracing subscriber could not be installed
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

impl From<VaultError> for EngineError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Locked { reason } => Self::Lockdown { reason },
        }
    }
}

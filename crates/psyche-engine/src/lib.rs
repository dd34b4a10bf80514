//! # psyche-engine
//!
//! Session facade over the assessment kernels.
//!
//! ## Key Components
//!
//! - [`AssessmentEngine`]: records responses, derives axes, adaptive state
//!   and validity flags, and persists the session
//! - [`SecureStorage`]: device-bound persistence that degrades to memory
//! - [`EngineConfig`]: layered configuration (defaults, file, `PSYCHE_*`)
//! - [`telemetry::init_tracing`]: tracing subscriber setup
//!
//! ## Example
//!
//! ```no_run
//! use psyche_engine::{AssessmentEngine, EngineConfig};
//!
//! let config = EngineConfig::load(None)?;
//! let engine = AssessmentEngine::from_config(&config)?;
//! let next = engine.adaptive_state(None)?.suggested_next_node_id;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod persistence;
pub mod session;
pub mod telemetry;

pub use config::{
    AssessmentConfig, EngineConfig, IntegrityConfig, LoggingConfig, StorageBackend, StorageConfig,
};
pub use error::{EngineError, EngineResult};
pub use persistence::{LoadOutcome, SecureStorage, SESSION_KEY};
pub use session::{AssessmentEngine, SessionData, SessionSnapshot};

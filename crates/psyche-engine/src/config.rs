//! Configuration for psyche-engine

use psyche_adaptive::{AdaptiveConfig, AdaptiveController};
use psyche_contradiction::{ContradictionConfig, ContradictionDetector};
use psyche_integrity::{LicenseAuthority, LicenseError, DEFAULT_LICENSE_PREFIX};
use psyche_types::DomainLayout;
use psyche_validity::{ValidityConfig, ValidityDetector};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Assessment kernels
    #[serde(default)]
    pub assessment: AssessmentConfig,

    /// Integrity and licensing
    #[serde(default)]
    pub integrity: IntegrityConfig,

    /// Persistence backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Thresholds for the assessment kernels
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentConfig {
    #[serde(default)]
    pub adaptive: AdaptiveConfig,

    #[serde(default)]
    pub contradiction: ContradictionConfig,

    #[serde(default)]
    pub validity: ValidityConfig,
}

impl AssessmentConfig {
    /// Controller over `layout` with these thresholds.
    pub fn controller(&self, layout: DomainLayout) -> AdaptiveController {
        AdaptiveController::new(
            layout,
            self.adaptive.clone(),
            ContradictionDetector::new(self.contradiction.clone()),
        )
    }

    pub fn validity_detector(&self, layout: &DomainLayout) -> ValidityDetector {
        ValidityDetector::new(layout.total(), self.validity.clone())
    }
}

/// Integrity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityConfig {
    /// Salt mixed into the persistence key
    #[serde(default = "default_system_salt")]
    pub system_salt: String,

    /// Salt covering license hashes
    #[serde(default = "default_license_salt")]
    pub license_salt: String,

    /// License key prefix
    #[serde(default = "default_license_prefix")]
    pub license_prefix: String,

    /// Hosts egress may reach (exact or subdomain)
    #[serde(default)]
    pub allowed_hosts: Vec<String>,

    /// Script sources expected to be loaded
    #[serde(default)]
    pub expected_scripts: Vec<String>,

    /// Self-audit period in seconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            system_salt: default_system_salt(),
            license_salt: default_license_salt(),
            license_prefix: default_license_prefix(),
            allowed_hosts: Vec::new(),
            expected_scripts: Vec::new(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

impl IntegrityConfig {
    pub fn license_authority(&self) -> Result<LicenseAuthority, LicenseError> {
        LicenseAuthority::new(&self.license_prefix, self.license_salt.clone())
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend type
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory for the file backend
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: default_storage_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_system_salt() -> String {
    "psyche-state-v1".to_string()
}

fn default_license_salt() -> String {
    "psyche-license-v1".to_string()
}

fn default_license_prefix() -> String {
    DEFAULT_LICENSE_PREFIX.to_string()
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".psyche")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Load configuration: defaults, then the optional file, then `PSYCHE_*`
    /// environment variables.
    ///
    /// Sections are separated by a double underscore and list values by
    /// commas, e.g. `PSYCHE_INTEGRITY__HEARTBEAT_INTERVAL_SECS=10` or
    /// `PSYCHE_INTEGRITY__ALLOWED_HOSTS=a.example,b.example`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        Self::load_from(path, Self::environment())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("PSYCHE")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("integrity.allowed_hosts")
            .with_list_parse_key("integrity.expected_scripts")
            .try_parsing(true)
    }

    fn load_from(
        path: Option<&str>,
        environment: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&EngineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(environment);

        builder.build()?.try_deserialize()
    }

    /// Persistent file storage under `path`.
    pub fn with_file_storage(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage = StorageConfig {
            backend: StorageBackend::File,
            path: path.into(),
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.integrity.license_prefix, "PSY");
        assert_eq!(config.integrity.heartbeat_interval_secs, 30);
        assert_eq!(config.assessment.adaptive.min_required, 40);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[storage]
backend = "file"
path = "/tmp/psyche-state"

[integrity]
allowed_hosts = ["api.psyche.example"]
heartbeat_interval_secs = 5

[assessment.validity]
flatline_run = 12
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.path, PathBuf::from("/tmp/psyche-state"));
        assert_eq!(config.integrity.allowed_hosts, vec!["api.psyche.example"]);
        assert_eq!(config.integrity.heartbeat_interval_secs, 5);
        assert_eq!(config.assessment.validity.flatline_run, 12);
        assert_eq!(config.assessment.validity.min_history, 5);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load(Some("/nonexistent/psyche")).unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides_multi_word_fields() {
        let vars: config::Map<String, String> = [
            ("PSYCHE_INTEGRITY__HEARTBEAT_INTERVAL_SECS", "7"),
            ("PSYCHE_INTEGRITY__SYSTEM_SALT", "custom-salt"),
            ("PSYCHE_INTEGRITY__ALLOWED_HOSTS", "api.psyche.example,cdn.psyche.example"),
            ("PSYCHE_INTEGRITY__EXPECTED_SCRIPTS", "app.js"),
            ("PSYCHE_ASSESSMENT__VALIDITY__FLATLINE_RUN", "14"),
            ("PSYCHE_STORAGE__BACKEND", "file"),
            ("PSYCHE_LOGGING__LEVEL", "trace"),
            ("OTHER_LOGGING__LEVEL", "error"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let environment = EngineConfig::environment().source(Some(vars));
        let config = EngineConfig::load_from(None, environment).unwrap();

        assert_eq!(config.integrity.heartbeat_interval_secs, 7);
        assert_eq!(config.integrity.system_salt, "custom-salt");
        assert_eq!(
            config.integrity.allowed_hosts,
            vec!["api.psyche.example", "cdn.psyche.example"]
        );
        assert_eq!(config.integrity.expected_scripts, vec!["app.js"]);
        assert_eq!(config.assessment.validity.flatline_run, 14);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.integrity.license_salt, "psyche-license-v1");
    }
}

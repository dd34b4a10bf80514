//! Device fingerprint used to bind persisted state to its origin.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::checksum::short_checksum;

const FINGERPRINT_LEN: usize = 16;

/// Observable traits of the running device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub user_agent: String,
    pub language: String,
    pub screen_width: u32,
    pub logical_cores: u32,
}

impl DeviceProfile {
    /// Profile of the current process' host.
    pub fn detect() -> Self {
        let language = std::env::var("LANG")
            .ok()
            .and_then(|l| l.split('.').next().map(str::to_string))
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "C".to_string());
        let logical_cores = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);

        Self {
            user_agent: format!(
                "psyche/{} ({}; {})",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
            language,
            screen_width: 0,
            logical_cores,
        }
    }

    pub fn fingerprint(&self) -> DeviceFingerprint {
        let material = format!(
            "{}|{}|{}|{}",
            self.user_agent, self.language, self.screen_width, self.logical_cores
        );
        DeviceFingerprint(short_checksum(material, FINGERPRINT_LEN))
    }
}

/// Derived pseudo-identity of a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFingerprint(String);

impl DeviceFingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> DeviceProfile {
        DeviceProfile {
            user_agent: "Mozilla/5.0".into(),
            language: "en-US".into(),
            screen_width: 1440,
            logical_cores: 8,
        }
    }

    #[test]
    fn same_profile_same_fingerprint() {
        assert_eq!(profile().fingerprint(), profile().fingerprint());
        assert_eq!(profile().fingerprint().as_str().len(), 16);
    }

    #[test]
    fn any_field_changes_fingerprint() {
        let base = profile().fingerprint();
        let mut other = profile();
        other.screen_width = 1441;
        assert_ne!(base, other.fingerprint());
        let mut other = profile();
        other.language = "de-DE".into();
        assert_ne!(base, other.fingerprint());
    }

    #[test]
    fn detect_reports_at_least_one_core() {
        assert!(DeviceProfile::detect().logical_cores >= 1);
    }
}

//! Self-verifying license keys of the form `PREFIX-TIER-EXPIRYMILLIS-HASH8`.
//!
//! The hash covers prefix, tier, expiry and a server salt, so a key cannot
//! be re-tiered or extended without the salt. Integrity is checked before
//! expiry: a tampered key is `Invalid`, never `Expired`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::checksum::short_checksum;
use crate::error::LicenseError;

pub const DEFAULT_LICENSE_PREFIX: &str = "PSY";

const HASH_LEN: usize = 8;

fn is_key_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// License tier name, e.g. `LAB` or `CLINIC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseTier(String);

impl LicenseTier {
    pub fn parse(tier: &str) -> Result<Self, LicenseError> {
        if is_key_token(tier) {
            Ok(Self(tier.to_string()))
        } else {
            Err(LicenseError::InvalidTier(tier.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of validating a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseStatus {
    Valid {
        tier: LicenseTier,
        expires_at: DateTime<Utc>,
    },
    Expired {
        tier: LicenseTier,
        expired_at: DateTime<Utc>,
    },
    Invalid {
        reason: String,
    },
}

impl LicenseStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Valid { .. } => "VALID",
            Self::Expired { .. } => "EXPIRED",
            Self::Invalid { .. } => "INVALID",
        }
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Issues and validates keys for one prefix and server salt.
#[derive(Debug, Clone)]
pub struct LicenseAuthority {
    prefix: String,
    server_salt: String,
}

impl LicenseAuthority {
    pub fn new(prefix: &str, server_salt: impl Into<String>) -> Result<Self, LicenseError> {
        if !is_key_token(prefix) {
            return Err(LicenseError::InvalidPrefix(prefix.to_string()));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            server_salt: server_salt.into(),
        })
    }

    /// Authority with the default `PSY` prefix.
    pub fn with_salt(server_salt: impl Into<String>) -> Self {
        Self {
            prefix: DEFAULT_LICENSE_PREFIX.to_string(),
            server_salt: server_salt.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn hash(&self, tier: &str, expiry_ms: i64) -> String {
        short_checksum(
            format!("{}|{}|{}|{}", self.prefix, tier, expiry_ms, self.server_salt),
            HASH_LEN,
        )
    }

    pub fn generate(
        &self,
        tier: &LicenseTier,
        duration_days: u32,
        now: DateTime<Utc>,
    ) -> Result<String, LicenseError> {
        let expiry = Duration::try_days(i64::from(duration_days))
            .and_then(|d| now.checked_add_signed(d))
            .ok_or(LicenseError::DurationOverflow)?;
        let expiry_ms = expiry.timestamp_millis();

        Ok(format!(
            "{}-{}-{}-{}",
            self.prefix,
            tier,
            expiry_ms,
            self.hash(tier.as_str(), expiry_ms)
        ))
    }

    pub fn validate(&self, key: &str, now: DateTime<Utc>) -> LicenseStatus {
        let parts: Vec<&str> = key.trim().split('-').collect();
        let [prefix, tier, expiry, hash] = parts.as_slice() else {
            return LicenseStatus::invalid("expected PREFIX-TIER-EXPIRY-HASH");
        };

        if *prefix != self.prefix {
            return LicenseStatus::invalid(format!("unknown prefix '{prefix}'"));
        }
        let Ok(tier) = LicenseTier::parse(tier) else {
            return LicenseStatus::invalid("malformed tier");
        };
        let Some(expiry_ms) = expiry
            .parse::<i64>()
            .ok()
            .filter(|ms| ms.to_string() == *expiry)
        else {
            return LicenseStatus::invalid("malformed expiry");
        };
        if *hash != self.hash(tier.as_str(), expiry_ms) {
            debug!(tier = %tier, "License hash mismatch");
            return LicenseStatus::invalid("hash mismatch");
        }
        let Some(expires_at) = DateTime::<Utc>::from_timestamp_millis(expiry_ms) else {
            return LicenseStatus::invalid("expiry out of range");
        };

        if now > expires_at {
            LicenseStatus::Expired {
                tier,
                expired_at: expires_at,
            }
        } else {
            LicenseStatus::Valid { tier, expires_at }
        }
    }
}

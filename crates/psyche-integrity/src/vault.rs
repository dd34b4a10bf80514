//! In-memory holder for sensitive session state.
//!
//! Lockdown takes the single write lock, wipes the data and marks the vault
//! locked before releasing it. Readers therefore see either the full data or
//! the lock, never a half-cleared value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};
use tracing::{info, warn};

use crate::error::VaultError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockdownRecord {
    pub reason: String,
    pub engaged_at: DateTime<Utc>,
}

/// Something the auditor can lock down.
pub trait LockdownTarget: Send + Sync {
    /// Returns `true` only when this call engaged the lockdown.
    fn engage_lockdown(&self, reason: &str) -> bool;

    fn is_locked(&self) -> bool;
}

#[derive(Debug)]
struct VaultState<T> {
    data: T,
    lockdown: Option<LockdownRecord>,
}

#[derive(Debug)]
pub struct SensitiveVault<T> {
    state: RwLock<VaultState<T>>,
}

impl<T: Default> SensitiveVault<T> {
    pub fn new(data: T) -> Self {
        Self {
            state: RwLock::new(VaultState {
                data,
                lockdown: None,
            }),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, VaultError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match &state.lockdown {
            Some(record) => Err(VaultError::Locked {
                reason: record.reason.clone(),
            }),
            None => Ok(f(&state.data)),
        }
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, VaultError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match &state.lockdown {
            Some(record) => Err(VaultError::Locked {
                reason: record.reason.clone(),
            }),
            None => Ok(f(&mut state.data)),
        }
    }

    pub fn replace(&self, data: T) -> Result<T, VaultError> {
        self.write(|current| std::mem::replace(current, data))
    }

    pub fn lockdown(&self, reason: &str) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.lockdown.is_some() {
            return false;
        }
        drop(std::mem::take(&mut state.data));
        state.lockdown = Some(LockdownRecord {
            reason: reason.to_string(),
            engaged_at: Utc::now(),
        });
        warn!(reason, "Sensitive state wiped, vault locked");
        true
    }

    pub fn lockdown_record(&self) -> Option<LockdownRecord> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lockdown
            .clone()
    }

    pub fn is_locked(&self) -> bool {
        self.lockdown_record().is_some()
    }

    /// Leave lockdown with fresh default state.
    pub fn reinitialize(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.data = T::default();
        state.lockdown = None;
        info!("Vault reinitialized");
    }
}

impl<T: Default + Send + Sync> LockdownTarget for SensitiveVault<T> {
    fn engage_lockdown(&self, reason: &str) -> bool {
        self.lockdown(reason)
    }

    fn is_locked(&self) -> bool {
        SensitiveVault::is_locked(self)
    }
}

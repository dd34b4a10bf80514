//! Device-bound persistence with graceful degradation.
//!
//! Blobs go through [`SecureCodec`] before reaching a [`StateStore`]. When
//! the backing store fails, the error is logged and this storage switches to
//! an in-memory store for the rest of the process. Persistence is then lost
//! on exit, but the session keeps working.

use psyche_integrity::{DeviceFingerprint, MemoryStore, SecureCodec, StateStore, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, instrument, warn};

use crate::error::EngineResult;

/// Well-known key for the live session.
pub const SESSION_KEY: &str = "psyche.session";

/// Result of loading a persisted value.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T> {
    Loaded(T),
    Missing,
    /// Present but unreadable: tampered, from another device, or garbage.
    Corrupted,
}

impl<T> LoadOutcome<T> {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loaded(_) => "loaded",
            Self::Missing => "missing",
            Self::Corrupted => "corrupted",
        }
    }

    pub fn into_loaded(self) -> Option<T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

pub struct SecureStorage {
    codec: SecureCodec,
    /// Store configured at startup; kept for the storage audit.
    primary: Arc<dyn StateStore>,
    active: RwLock<Arc<dyn StateStore>>,
    degraded: AtomicBool,
}

impl SecureStorage {
    pub fn new(
        store: Arc<dyn StateStore>,
        system_salt: impl Into<String>,
        fingerprint: DeviceFingerprint,
    ) -> Self {
        Self {
            codec: SecureCodec::new(system_salt, fingerprint),
            primary: Arc::clone(&store),
            active: RwLock::new(store),
            degraded: AtomicBool::new(false),
        }
    }

    /// In-memory storage, for tests and ephemeral sessions.
    pub fn in_memory(system_salt: impl Into<String>, fingerprint: DeviceFingerprint) -> Self {
        Self::new(Arc::new(MemoryStore::new()), system_salt, fingerprint)
    }

    pub fn primary_store(&self) -> Arc<dyn StateStore> {
        Arc::clone(&self.primary)
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn backend_name(&self) -> &'static str {
        self.active().name()
    }

    fn active(&self) -> Arc<dyn StateStore> {
        Arc::clone(&self.active.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run `op` against the active store, degrading to memory on failure.
    fn with_store<R>(&self, op: impl Fn(&dyn StateStore) -> StorageResult<R>) -> EngineResult<R> {
        let store = self.active();
        match op(store.as_ref()) {
            Ok(value) => Ok(value),
            Err(e) if !self.is_degraded() => {
                warn!(store = store.name(), error = %e, "Storage failed, degrading to memory");
                let fallback: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
                *self.active.write().unwrap_or_else(PoisonError::into_inner) =
                    Arc::clone(&fallback);
                self.degraded.store(true, Ordering::SeqCst);
                Ok(op(fallback.as_ref())?)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, value))]
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> EngineResult<()> {
        let blob = self.codec.encode(key, value)?;
        self.with_store(|store| store.write(key, &blob))?;
        debug!(bytes = blob.len(), "State saved");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> EngineResult<LoadOutcome<T>> {
        let Some(blob) = self.with_store(|store| store.read(key))? else {
            return Ok(LoadOutcome::Missing);
        };
        match self.codec.try_decode(key, &blob) {
            Ok(value) => Ok(LoadOutcome::Loaded(value)),
            Err(e) => {
                warn!(error = %e, "Persisted state rejected");
                Ok(LoadOutcome::Corrupted)
            }
        }
    }

    pub fn remove(&self, key: &str) -> EngineResult<()> {
        self.with_store(|store| store.remove(key))
    }

    /// Write a raw value, bypassing the codec.
    pub fn write_raw(&self, key: &str, raw: &str) -> EngineResult<()> {
        self.with_store(|store| store.write(key, raw))
    }

    pub fn read_raw(&self, key: &str) -> EngineResult<Option<String>> {
        self.with_store(|store| store.read(key))
    }
}

impl std::fmt::Debug for SecureStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureStorage")
            .field("backend", &self.backend_name())
            .field("degraded", &self.is_degraded())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psyche_integrity::StorageError;

    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn read(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }
        fn write(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }
        fn remove(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn fingerprint() -> DeviceFingerprint {
        DeviceFingerprint::new("00FF00FF00FF00FF")
    }

    #[test]
    fn save_and_load() {
        let storage = SecureStorage::in_memory("salt", fingerprint());
        assert_eq!(
            storage.load::<Vec<u32>>("k").unwrap(),
            LoadOutcome::Missing
        );
        storage.save("k", &vec![1u32, 2]).unwrap();
        assert_eq!(
            storage.load::<Vec<u32>>("k").unwrap(),
            LoadOutcome::Loaded(vec![1, 2])
        );
        storage.remove("k").unwrap();
        assert_eq!(storage.load::<Vec<u32>>("k").unwrap().label(), "missing");
    }

    #[test]
    fn tampered_blob_is_corrupted() {
        let storage = SecureStorage::in_memory("salt", fingerprint());
        storage.save("k", &vec![1u32, 2]).unwrap();
        let mut raw = storage.read_raw("k").unwrap().unwrap();
        let first = raw.remove(0);
        raw.insert(0, if first == 'A' { 'B' } else { 'A' });
        storage.write_raw("k", &raw).unwrap();
        assert_eq!(
            storage.load::<Vec<u32>>("k").unwrap(),
            LoadOutcome::Corrupted
        );
    }

    #[test]
    fn broken_store_degrades_to_memory() {
        let storage = SecureStorage::new(Arc::new(BrokenStore), "salt", fingerprint());
        assert!(!storage.is_degraded());

        storage.save("k", &"value").unwrap();
        assert!(storage.is_degraded());
        assert_eq!(storage.backend_name(), "memory");
        assert_eq!(
            storage.load::<String>("k").unwrap(),
            LoadOutcome::Loaded("value".to_string())
        );
        assert_eq!(storage.primary_store().name(), "broken");
    }
}

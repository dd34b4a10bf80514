//! Key/value backends for encoded state.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Key written and removed by [`smoke_test`].
pub const PROBE_KEY: &str = "psyche.__probe";

/// Minimal key/value store. Values are opaque strings (encoded blobs).
pub trait StateStore: Send + Sync {
    fn read(&self, key: &str) -> StorageResult<Option<String>>;

    fn write(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove(&self, key: &str) -> StorageResult<()>;

    fn name(&self) -> &'static str;
}

/// Write, read back and remove a probe value.
#[instrument(skip(store), fields(store = store.name()))]
pub fn smoke_test(store: &dyn StateStore) -> StorageResult<()> {
    let value = format!("probe-{}", Uuid::new_v4());
    store.write(PROBE_KEY, &value)?;
    let read = store.read(PROBE_KEY)?;
    store.remove(PROBE_KEY)?;

    if read.as_deref() != Some(value.as_str()) {
        return Err(StorageError::ProbeMismatch { read });
    }
    debug!("Storage smoke test passed");
    Ok(())
}

/// Process-local store, also the degraded fallback.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// One file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

impl StateStore for FileStore {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let tmp = self.root.join(format!("{key}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Store that accepts writes and forgets them.
    struct LossyStore;

    impl StateStore for LossyStore {
        fn read(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(None)
        }
        fn write(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Ok(())
        }
        fn remove(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }
        fn name(&self) -> &'static str {
            "lossy"
        }
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.read("k").unwrap(), None);
        store.write("k", "v").unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.read("k").unwrap(), None);
        smoke_test(&store).unwrap();
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("state")).unwrap();
        store.write("psyche.session", "blob").unwrap();
        assert_eq!(
            store.read("psyche.session").unwrap().as_deref(),
            Some("blob")
        );
        store.remove("psyche.session").unwrap();
        store.remove("psyche.session").unwrap();
        assert_eq!(store.read("psyche.session").unwrap(), None);
        smoke_test(&store).unwrap();
    }

    #[test]
    fn file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(matches!(store.write(key, "x"), Err(StorageError::InvalidKey(_))));
        }
    }

    #[test]
    fn lossy_store_fails_smoke_test() {
        assert!(matches!(
            smoke_test(&LossyStore),
            Err(StorageError::ProbeMismatch { read: None })
        ));
    }
}

//! # Key-Value Storage
//!
//! Everything Water persists lives under three fixed keys, each holding one
//! JSON document that is read and replaced whole:
//!
//! ```text
//! current_user  →  User                 (absent when logged out)
//! users         →  [User, ...]
//! scripts       →  [ScriptItem, ...]    (most recent first)
//! ```
//!
//! Backends implement [`KeyValueStore`]; [`Store`] layers typed JSON access
//! and a write lock on top so read-modify-write cycles inside one process
//! never interleave.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub const CURRENT_USER_KEY: &str = "current_user";
pub const USERS_KEY: &str = "users";
pub const SCRIPTS_KEY: &str = "scripts";

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Serde(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "storage I/O error: {e}"),
            StoreError::Serde(e) => write!(f, "storage data error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serde(e)
    }
}

/// Raw string slots. Implementations only need whole-value get/set/remove.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ============================================================================
// File backend
// ============================================================================

/// One `<key>.json` file per slot inside a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes via `.tmp` + rename so a crash never leaves a half-written slot.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path(key);
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        debug!("Wrote {} ({} bytes)", path.display(), value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Memory backend
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(key);
        Ok(())
    }
}

// ============================================================================
// Typed access
// ============================================================================

/// Typed JSON view over a backend.
pub struct Store {
    backend: Box<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl Store {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            write_lock: Mutex::new(()),
        }
    }

    /// In-memory store, used by tests and `--data-dir` less runs.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Reads and decodes a slot. `None` when the slot was never written.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.backend.get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Reads a collection slot, treating a missing slot as empty.
    pub fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StoreError> {
        Ok(self.read(key)?.unwrap_or_default())
    }

    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.write_unlocked(key, value)
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.backend.remove(key)
    }

    /// Read-modify-write of a whole slot under the write lock.
    ///
    /// The closure sees the current value (default when missing); whatever it
    /// leaves behind is written back, and its return value is passed through.
    pub fn update<T, R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> Result<R, StoreError>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut value: T = self.read_or_default(key)?;
        let out = f(&mut value);
        self.write_unlocked(key, &value)?;
        Ok(out)
    }

    fn write_unlocked<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value)?;
        self.backend.set(key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_slot_reads_as_none() {
        let store = Store::in_memory();
        let value: Option<Vec<String>> = store.read(SCRIPTS_KEY).unwrap();
        assert!(value.is_none());
        let list: Vec<String> = store.read_or_default(SCRIPTS_KEY).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn update_round_trips_through_backend() {
        let store = Store::in_memory();
        let len = store
            .update(USERS_KEY, |names: &mut Vec<String>| {
                names.push("bob".to_string());
                names.len()
            })
            .unwrap();
        assert_eq!(len, 1);
        let names: Vec<String> = store.read_or_default(USERS_KEY).unwrap();
        assert_eq!(names, vec!["bob".to_string()]);
    }

    #[test]
    fn corrupt_slot_is_a_serde_error() {
        let backend = MemoryStore::new();
        backend.set(USERS_KEY, "{not json").unwrap();
        let store = Store::new(backend);
        let result: Result<Option<Vec<String>>, _> = store.read(USERS_KEY);
        assert!(matches!(result, Err(StoreError::Serde(_))));
    }

    #[test]
    fn file_store_persists_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let fs_store = FileStore::open(dir.path().join("data")).unwrap();
        assert_eq!(fs_store.get(CURRENT_USER_KEY).unwrap(), None);

        fs_store.set(CURRENT_USER_KEY, "{\"id\":\"user_bob\"}").unwrap();
        assert!(dir.path().join("data").join("current_user.json").exists());
        assert!(!dir.path().join("data").join("current_user.tmp").exists());
        assert_eq!(
            fs_store.get(CURRENT_USER_KEY).unwrap().as_deref(),
            Some("{\"id\":\"user_bob\"}")
        );

        fs_store.remove(CURRENT_USER_KEY).unwrap();
        assert_eq!(fs_store.get(CURRENT_USER_KEY).unwrap(), None);
        // Removing twice is fine
        fs_store.remove(CURRENT_USER_KEY).unwrap();
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Store::new(FileStore::open(dir.path()).unwrap());
            store.write(SCRIPTS_KEY, &vec![1, 2, 3]).unwrap();
        }
        let store = Store::new(FileStore::open(dir.path()).unwrap());
        let values: Vec<i32> = store.read_or_default(SCRIPTS_KEY).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn concurrent_updates_do_not_lose_writes() {
        use std::sync::Arc;
        let store = Arc::new(Store::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .update(SCRIPTS_KEY, |v: &mut Vec<i32>| v.push(i))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let values: Vec<i32> = store.read_or_default(SCRIPTS_KEY).unwrap();
        assert_eq!(values.len(), 8);
    }
}

//! Durable key-value storage for the calibration record.
//!
//! In the browser this is localStorage. Native tools keep one JSON file per
//! key under ~/.acuity/ by default.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// String key-value store.
pub trait KeyValueStore {
    /// Value stored under `key`, or None if nothing is stored.
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;

    /// Returns Ok(true) if a value was removed, Ok(false) if there was none.
    fn remove(&mut self, key: &str) -> io::Result<bool>;
}

/// File-backed store keeping each key in `<root>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root_path: PathBuf,
}

impl FileStore {
    /// Store rooted at ~/.acuity
    pub fn new() -> io::Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
        Ok(Self::with_path(PathBuf::from(home).join(".acuity")))
    }

    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn key_path(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key {key:?}"),
            ));
        }
        Ok(self.root_path.join(format!("{key}.json")))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::with_path(PathBuf::from(".acuity")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.key_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        let path = self.key_path(key)?;
        std::fs::create_dir_all(&self.root_path)?;
        std::fs::write(path, value)
    }

    fn remove(&mut self, key: &str) -> io::Result<bool> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }
}

/// In-memory store for tests and for frontends that manage persistence themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<bool> {
        Ok(self.values.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::with_path(dir.path().join("nested"));

        assert_eq!(store.get("screenCalibration").unwrap(), None);

        store.set("screenCalibration", "{\"a\":1}").unwrap();
        assert!(dir.path().join("nested/screenCalibration.json").exists());
        assert_eq!(
            store.get("screenCalibration").unwrap().as_deref(),
            Some("{\"a\":1}")
        );

        assert!(store.remove("screenCalibration").unwrap());
        assert!(!store.remove("screenCalibration").unwrap());
        assert_eq!(store.get("screenCalibration").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::with_path(dir.path().to_path_buf());

        let err = store.set("../escape", "x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_memory_store_overwrites() {
        let mut store = MemoryStore::new();
        store.set("k", "1").unwrap();
        store.set("k", "2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("2"));
    }
}

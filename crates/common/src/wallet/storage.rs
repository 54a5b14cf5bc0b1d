//! Local key-value persistence for the wallet session.
//!
//! [`FileSessionStore`] keeps a small JSON object on disk and stores the
//! session under [`SESSION_KEY`], so other keys written by future versions
//! survive untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::session::WalletSession;

pub const SESSION_KEY: &str = "walletSession";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage file is not a JSON object: {0}")]
    NotAnObject(PathBuf),
}

pub trait SessionStore: Send + Sync + std::fmt::Debug {
    fn load(&self) -> Result<Option<WalletSession>, StorageError>;
    fn save(&self, session: &WalletSession) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, StorageError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(StorageError::NotAnObject(self.path.clone())),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // write-then-rename so a crash never leaves a half written file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<WalletSession>, StorageError> {
        let map = self.read_map()?;
        match map.get(SESSION_KEY) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    fn save(&self, session: &WalletSession) -> Result<(), StorageError> {
        let mut map = self.read_map()?;
        map.insert(SESSION_KEY.to_string(), serde_json::to_value(session)?);
        self.write_map(&map)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut map = self.read_map()?;
        if map.remove(SESSION_KEY).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// In-memory store, for tests and for runs that should not touch disk
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<Option<WalletSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: WalletSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(session))),
        }
    }

    pub fn peek(&self) -> Option<WalletSession> {
        self.inner.lock().clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<WalletSession>, StorageError> {
        Ok(self.inner.lock().clone())
    }

    fn save(&self, session: &WalletSession) -> Result<(), StorageError> {
        *self.inner.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.inner.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_round_trip_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("storage.json"));

        assert_eq!(store.load().unwrap(), None);

        let session = WalletSession::connected("0xAA").unwrap();
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_keeps_unrelated_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let store = FileSessionStore::new(&path);
        store
            .save(&WalletSession::connected("0xbb").unwrap())
            .unwrap();
        store.clear().unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert!(raw.get(SESSION_KEY).is_none());
    }

    #[test]
    fn test_file_store_rejects_non_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "[1,2,3]").unwrap();

        let store = FileSessionStore::new(&path);
        assert!(matches!(store.load(), Err(StorageError::NotAnObject(_))));
    }
}

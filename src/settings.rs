//! Key/value settings with per-key write validators.
//!
//! [`Settings`] fronts a [`SettingsBackend`] (in memory or a JSON file) and runs
//! the validator registered for a key before every write to it. A rejected
//! write leaves the stored value untouched.

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{DbError, SearchError};

/// Persistence layer for settings values.
pub trait SettingsBackend: Send + Sync {
    /// # Errors
    /// Returns an error when the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<Value>, DbError>;

    /// # Errors
    /// Returns an error when the backing storage cannot be written.
    fn set(&self, key: &str, value: Value) -> Result<(), DbError>;
}

#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsBackend for MemorySettings {
    fn get(&self, key: &str) -> Result<Option<Value>, DbError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), DbError> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// Settings stored as one JSON object in a file.
///
/// Writes go to a temp file in the same directory which is then renamed over
/// the target, so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: RwLock::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, DbError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            _ => Err(DbError::Settings(format!("{} does not hold a JSON object", self.path.display()))),
        }
    }

    fn store(&self, map: &Map<String, Value>) -> Result<(), DbError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, map)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| DbError::Io(e.to_string()))?;
        Ok(())
    }
}

impl SettingsBackend for FileSettings {
    fn get(&self, key: &str) -> Result<Option<Value>, DbError> {
        let _guard = self.lock.read();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), DbError> {
        let _guard = self.lock.write();
        let mut map = self.load()?;
        map.insert(key.to_string(), value);
        self.store(&map)
    }
}

pub type Validator = Arc<dyn Fn(&Value) -> Result<(), SearchError> + Send + Sync>;

/// Settings facade with validation hooks.
#[derive(Clone)]
pub struct Settings {
    backend: Arc<dyn SettingsBackend>,
    validators: Arc<RwLock<HashMap<String, Validator>>>,
}

impl Settings {
    pub fn new(backend: Arc<dyn SettingsBackend>) -> Self {
        Self { backend, validators: Arc::new(RwLock::new(HashMap::new())) }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySettings::new()))
    }

    /// Registers the validator run on every write of `key`, replacing any earlier one.
    pub fn register_validator(&self, key: &str, validator: Validator) {
        self.validators.write().insert(key.to_string(), validator);
    }

    /// # Errors
    /// Returns `SearchError::Store` when the backend cannot be read.
    pub fn get(&self, key: &str) -> Result<Option<Value>, SearchError> {
        Ok(self.backend.get(key)?)
    }

    /// Validates then persists `value` under `key`.
    ///
    /// # Errors
    /// Returns the validator's error, or `SearchError::Store` when persisting fails.
    pub fn set(&self, key: &str, value: Value) -> Result<(), SearchError> {
        let validator = self.validators.read().get(key).cloned();
        if let Some(validate) = validator {
            validate(&value)?;
        }
        self.backend.set(key, value)?;
        Ok(())
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<String> = self.validators.read().keys().cloned().collect();
        f.debug_struct("Settings").field("validated_keys", &keys).finish()
    }
}

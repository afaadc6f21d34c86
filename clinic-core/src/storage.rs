//! Client-side persistence port.
//!
//! The front-end keeps its session in two storage areas that share key
//! names: a short-term area (lives as long as the tab) and a long-term
//! area (survives restarts). Reads prefer the long-term area.
//! `ClientStorage` is the only place that policy is written down.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::{ClinicError, ClinicResult};

/// Result type for storage area operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by a storage area
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage area unavailable: {message}")]
    Unavailable { message: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// A single key/value storage area (the `get/set/clear` port).
pub trait StorageArea: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Volatile storage area. Used as the short-term area and in tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl StorageArea for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// Storage area backed by one JSON object on disk.
///
/// The whole object is rewritten on every mutation.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == IoErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = values.len(), "opened file storage");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(values)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}

impl StorageArea for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut values = self.values.lock();
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

/// Which of the two storage areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    ShortTerm,
    LongTerm,
}

/// Persisted client-state keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    User,
    Token,
    IsAdmin,
    Department,
    Permissions,
    TenantData,
    TenantDomain,
}

impl StorageKey {
    pub const ALL: [StorageKey; 7] = [
        StorageKey::User,
        StorageKey::Token,
        StorageKey::IsAdmin,
        StorageKey::Department,
        StorageKey::Permissions,
        StorageKey::TenantData,
        StorageKey::TenantDomain,
    ];

    /// Keys owned by the login session; tenant keys outlive logout.
    pub const SESSION: [StorageKey; 5] = [
        StorageKey::User,
        StorageKey::Token,
        StorageKey::IsAdmin,
        StorageKey::Department,
        StorageKey::Permissions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::User => "user",
            StorageKey::Token => "token",
            StorageKey::IsAdmin => "isAdmin",
            StorageKey::Department => "department",
            StorageKey::Permissions => "permissions",
            StorageKey::TenantData => "tenantData",
            StorageKey::TenantDomain => "tenantDomain",
        }
    }
}

/// Both storage areas plus the read-precedence policy.
#[derive(Clone)]
pub struct ClientStorage {
    short_term: Arc<dyn StorageArea>,
    long_term: Arc<dyn StorageArea>,
}

impl ClientStorage {
    pub fn new(short_term: Arc<dyn StorageArea>, long_term: Arc<dyn StorageArea>) -> Self {
        Self {
            short_term,
            long_term,
        }
    }

    /// Two fresh in-memory areas.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()))
    }

    pub fn area(&self, kind: StorageKind) -> &Arc<dyn StorageArea> {
        match kind {
            StorageKind::ShortTerm => &self.short_term,
            StorageKind::LongTerm => &self.long_term,
        }
    }

    /// Long-term value if present, else the short-term one.
    pub fn read(&self, key: StorageKey) -> ClinicResult<Option<String>> {
        let long = self.long_term.get(key.as_str()).map_err(storage_failure)?;
        if long.is_some() {
            return Ok(long);
        }
        self.short_term.get(key.as_str()).map_err(storage_failure)
    }

    pub fn write(&self, kind: StorageKind, key: StorageKey, value: &str) -> ClinicResult<()> {
        self.area(kind)
            .set(key.as_str(), value)
            .map_err(storage_failure)
    }

    /// Read and parse a JSON value; parse failures are `CorruptState`.
    pub fn read_json<T: DeserializeOwned>(&self, key: StorageKey) -> ClinicResult<Option<T>> {
        let Some(raw) = self.read(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|e| {
            ClinicError::corrupt_state(format!("stored `{}` is not valid JSON", key.as_str()))
                .with_source(e.into())
                .into_anyhow()
        })
    }

    pub fn write_json<T: Serialize>(
        &self,
        kind: StorageKind,
        key: StorageKey,
        value: &T,
    ) -> ClinicResult<()> {
        let raw = serde_json::to_string(value)?;
        self.write(kind, key, &raw)
    }

    /// Remove `keys` from both areas. Every key is attempted even when one fails.
    pub fn remove_everywhere(&self, keys: &[StorageKey]) -> ClinicResult<()> {
        let mut first_error = None;
        for key in keys {
            for area in [&self.short_term, &self.long_term] {
                if let Err(e) = area.remove(key.as_str()) {
                    warn!(key = key.as_str(), error = %e, "failed to remove persisted key");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(storage_failure(e)),
            None => Ok(()),
        }
    }
}

fn storage_failure(e: StorageError) -> anyhow::Error {
    ClinicError::unavailable(e.to_string())
        .with_source(e.into())
        .into_anyhow()
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Best-effort JSON key/value storage for client-local state.
//!
//! Each key is one pretty-printed JSON file in the store directory:
//!
//! ```text
//! .evacsim/
//! ├── floor-plan-drawings.json
//! └── wizard-state.json
//! ```
//!
//! Reads never fail: missing entries are `None`, and unreadable or
//! unparsable entries are logged, removed and reported as `None`.

use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure writing to the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store directory could not be created.
    #[error("cannot create store directory {path}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Keys are plain names without path separators.
    #[error("invalid store key {0:?}")]
    InvalidKey(String),
    /// The value could not be serialized.
    #[error("cannot serialize value for {key}: {source}")]
    Serialize {
        /// Key being written.
        key: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// The file could not be written.
    #[error("cannot write {path}: {source}")]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Directory-backed JSON store.
#[derive(Clone, Debug)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Opens the store, creating the directory when missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Option<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        valid.then(|| self.dir.join(format!("{key}.json")))
    }

    /// Reads and decodes the value under `key`.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path(key)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return None,
            Err(error) => {
                warn!(key, %error, "unreadable store entry discarded");
                self.discard(&path);
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key, %error, "corrupt store entry discarded");
                self.discard(&path);
                None
            }
        }
    }

    /// Encodes and writes `value` under `key`, replacing any previous value.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let path = self
            .path(key)
            .ok_or_else(|| StoreError::InvalidKey(key.to_owned()))?;
        let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
            key: key.to_owned(),
            source,
        })?;

        let temp = self.dir.join(format!(".{key}.json.tmp"));
        std::fs::write(&temp, json)
            .and_then(|()| std::fs::rename(&temp, &path))
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;
        debug!(key, "store entry written");
        Ok(())
    }

    /// Removes `key`. Returns whether an entry existed.
    pub fn remove(&self, key: &str) -> bool {
        match self.path(key) {
            Some(path) => std::fs::remove_file(path).is_ok(),
            None => false,
        }
    }

    fn discard(&self, path: &Path) {
        if let Err(error) = std::fs::remove_file(path) {
            warn!(path = %path.display(), %error, "cannot remove store entry");
        }
    }
}

//! Storage layer for rtsync
//!
//! Persistent state lives in one JSON document per file, by default:
//!
//! ```text
//! .rtsync/
//!   mirror.json        # mirrored entries and the id->name table
//!   mirror.json.lock   # fs2 lock guarding read-modify-write cycles
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};

/// Name of the local state directory
pub const LOCAL_DIR: &str = ".rtsync";

/// A JSON document on disk, updated under an exclusive lock.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
    lock_timeout_ms: u64,
}

impl Storage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document, or `T::default()` when the file does not exist yet.
    pub fn read<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        lock::with_lock(&self.path, self.lock_timeout_ms, || self.read_unlocked())
    }

    /// Apply `mutate` to the current document and write the result back.
    ///
    /// The lock is held across the read and the write, so concurrent
    /// updaters never lose each other's changes.
    pub fn update<T, R, F>(&self, mutate: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> Result<R>,
    {
        lock::with_lock(&self.path, self.lock_timeout_ms, || {
            let mut document: T = self.read_unlocked()?;
            let result = mutate(&mut document)?;
            self.write_json(&document)?;
            Ok(result)
        })
    }

    fn read_unlocked<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        if !self.path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_json<T: Serialize>(&self, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(&self.path, json.as_bytes())
    }
}

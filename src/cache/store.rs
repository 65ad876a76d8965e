//! Filesystem-backed cache entry store
//!
//! Each entry is a self-describing JSON document at `<dir>/<key>.json`:
//! `{"timestamp": <unix-seconds>, "endpoint": "<id>", "data": <payload>}`.
//!
//! Writes go to a temp file in the same directory and are renamed over the
//! target, so readers in this or any other process never see a partial
//! entry. Storage failures never escape: reads degrade to "absent" and
//! writes/deletes report `false`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, ReadDir};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;

use super::key::CacheKey;

/// Name of the sweep lock file inside the cache directory
pub const SWEEP_LOCK_FILE: &str = ".sweep_lock";

/// A cached payload with its write time and owning endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Unix seconds at write time
    #[serde(rename = "timestamp")]
    pub created_at: i64,
    /// Logical endpoint identifier, used to recover the TTL
    #[serde(default)]
    pub endpoint: String,
    /// Opaque payload
    pub data: Value,
}

/// What is on disk for a key
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Present(CacheEntry),
    Absent,
    /// The file exists but is not a valid entry
    Corrupt,
}

/// Key → entry store rooted at one directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(SWEEP_LOCK_FILE)
    }

    /// Look at the entry for `key` without modifying anything
    pub fn inspect(&self, key: &CacheKey) -> Slot {
        let bytes = match fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Slot::Absent,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed");
                return Slot::Absent;
            }
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => Slot::Present(entry),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Cache entry is corrupt");
                Slot::Corrupt
            }
        }
    }

    /// Read the entry for `key`; corrupt files are removed and read as absent
    pub fn read(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.inspect(key) {
            Slot::Present(entry) => Some(entry),
            Slot::Absent => None,
            Slot::Corrupt => {
                self.delete(key);
                None
            }
        }
    }

    /// Publish `entry` under `key`, replacing any previous entry
    pub fn write(&self, key: &CacheKey, entry: &CacheEntry) -> bool {
        match self.try_write(key, entry) {
            Ok(()) => {
                tracing::trace!(key = %key, "Cache write");
                true
            }
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    dir = %self.dir.display(),
                    error = %e,
                    "Cache write failed"
                );
                false
            }
        }
    }

    fn try_write(&self, key: &CacheKey, entry: &CacheEntry) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let mut tmp = Builder::new()
            .prefix(".tmp")
            .suffix(".partial")
            .tempfile_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, entry)?;
        tmp.flush()?;

        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }

    /// Remove the entry for `key`; an already absent entry counts as removed
    pub fn delete(&self, key: &CacheKey) -> bool {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {
                tracing::trace!(key = %key, "Cache delete");
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Lazily list the keys currently on disk
    ///
    /// Each call rescans the directory. Temp files and the sweep lock are
    /// never listed; a missing directory lists nothing.
    pub fn list_all(&self) -> CacheKeys {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => Some(entries),
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "Cache listing failed");
                }
                None
            }
        };
        CacheKeys { entries }
    }

    /// Number of entries currently on disk
    pub fn len(&self) -> usize {
        self.list_all().count()
    }

    pub fn is_empty(&self) -> bool {
        self.list_all().next().is_none()
    }
}

/// Iterator over the keys in a cache directory
pub struct CacheKeys {
    entries: Option<ReadDir>,
}

impl Iterator for CacheKeys {
    type Item = CacheKey;

    fn next(&mut self) -> Option<Self::Item> {
        let entries = self.entries.as_mut()?;
        for dirent in entries.by_ref() {
            let Ok(dirent) = dirent else { continue };
            if !dirent.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Some(key) = dirent.file_name().to_str().and_then(CacheKey::from_file_name) {
                return Some(key);
            }
        }
        None
    }
}

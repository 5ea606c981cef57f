//! Persistent key/value stores for cache entries and the meta snapshot.
//!
//! The page cache only needs what a browser's `localStorage` offers: string
//! keys, string values, enumeration and a wholesale clear. Writes may be
//! refused with [`Error::QuotaExceeded`]; callers decide how to recover.
//!
//! ## Storage Layout ([`FileBackend`])
//!
//! ```text
//! <root>/
//!   3f9a0c12e4b7d851.json   # {"key": "...", "value": "..."}
//!   a1b2c3d4e5f60718.json
//! ```
//!
//! File names are derived from the key so arbitrary URLs never touch the
//! file system directly. Only files with that naming scheme belong to the
//! store; anything else under the root is left alone, including by `clear`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::{Error, Result};

/// A synchronous string key/value store.
pub trait CacheBackend: Send + Sync {
    /// Read a value, `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    ///
    /// Fails with [`Error::QuotaExceeded`] when the store is full.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored, in no particular order.
    fn keys(&self) -> Result<Vec<String>>;

    /// Remove every key.
    fn clear(&self) -> Result<()>;
}

/// In-memory store with an optional byte quota.
///
/// Used for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: Mutex<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl MemoryBackend {
    /// Unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store refusing writes that would exceed `quota_bytes` (keys + values).
    #[must_use]
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            items: Mutex::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.lock();
        if let Some(quota) = self.quota_bytes {
            let used: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = used + key.len() + value.len();
            if needed as u64 > quota {
                return Err(Error::QuotaExceeded(format!(
                    "writing '{key}' needs {needed} bytes, quota is {quota}"
                )));
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }

    fn clear(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredItem {
    key: String,
    value: String,
}

/// Directory-backed store: one JSON file per key, atomic writes.
///
/// Operations are not coordinated across processes.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileBackend {
    /// Store rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            quota_bytes: None,
        }
    }

    /// Refuse writes once the directory would exceed `quota_bytes`.
    #[must_use]
    pub const fn with_quota(mut self, quota_bytes: Option<u64>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    /// Directory holding the entry files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn item_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let name = digest.iter().take(8).fold(String::new(), |mut acc, b| {
            // write! to String is infallible
            let _ = write!(acc, "{b:02x}");
            acc
        });
        self.root.join(format!("{name}.json"))
    }

    /// Entry files plus leftover temp files from interrupted writes.
    fn store_files(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)
            .map_err(|e| Error::Storage(format!("Failed to read store directory: {e}")))?
        {
            let path = entry?.path();
            if path.is_file() && is_store_file_name(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = self.store_files()?;
        files.retain(|path| path.extension().is_some_and(|ext| ext == "json"));
        Ok(files)
    }

    fn read_item(path: &Path) -> Result<StoredItem> {
        let json = fs::read_to_string(path)
            .map_err(|e| Error::Storage(format!("Failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Parse(format!("Corrupt store file {}: {e}", path.display())))
    }

    fn used_bytes_excluding(&self, skip: &Path) -> Result<u64> {
        let mut total = 0;
        for path in self.entry_files()? {
            if path != skip {
                total += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            }
        }
        Ok(total)
    }
}

impl CacheBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.item_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let item = Self::read_item(&path)?;
        Ok((item.key == key).then_some(item.value))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(storage_write_error)?;

        let path = self.item_path(key);
        let json = serde_json::to_string(&StoredItem {
            key: key.to_string(),
            value: value.to_string(),
        })?;

        if let Some(quota) = self.quota_bytes {
            let needed = self.used_bytes_excluding(&path)? + json.len() as u64;
            if needed > quota {
                return Err(Error::QuotaExceeded(format!(
                    "store at {} would grow to {needed} bytes, quota is {quota}",
                    self.root.display()
                )));
            }
        }

        // Atomic write: temp file + rename
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(storage_write_error)?;

        #[cfg(target_os = "windows")]
        if path.exists() {
            fs::remove_file(&path).map_err(storage_write_error)?;
        }

        fs::rename(&tmp_path, &path).map_err(storage_write_error)?;
        debug!(%key, "stored entry");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.item_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| Error::Storage(format!("Failed to remove '{key}': {e}")))?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for path in self.entry_files()? {
            match Self::read_item(&path) {
                Ok(item) => keys.push(item.key),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable store file");
                },
            }
        }
        Ok(keys)
    }

    fn clear(&self) -> Result<()> {
        let files = self.store_files()?;
        for path in &files {
            fs::remove_file(path).map_err(|e| {
                Error::Storage(format!("Failed to clear {}: {e}", path.display()))
            })?;
        }
        debug!(root = %self.root.display(), removed = files.len(), "cleared store");
        Ok(())
    }
}

/// `<16 hex digits>.json` or `<16 hex digits>.json.tmp`, as written by [`FileBackend`].
fn is_store_file_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    name.strip_suffix(".json")
        .or_else(|| name.strip_suffix(".json.tmp"))
        .is_some_and(|stem| stem.len() == 16 && stem.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn storage_write_error(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::StorageFull {
        Error::QuotaExceeded(err.to_string())
    } else {
        Error::Storage(format!("Failed to write store file: {err}"))
    }
}

//! Durable filename → extracted-text cache with write-through persistence.
//!
//! The cache is the source of truth for "which files have been attempted":
//! a key being present means the file was processed at least once (whether
//! recognition succeeded or not); a key being absent means "not yet
//! attempted", never "attempted and empty".
//!
//! Persistence is write-through: every [`TextCache::put`] rewrites the whole
//! mapping to disk before returning, so a partially processed folder survives
//! interruption. The rewrite goes through a temp file followed by an atomic
//! rename - a crash mid-write can lose the in-flight entry but never corrupt
//! entries persisted earlier.
//!
//! # Lock Poisoning Handling
//!
//! The in-memory mapping sits behind a `Mutex` shared between the background
//! worker (writes) and foreground search (snapshots). All `.lock()` calls
//! convert `PoisonError` into [`ImgrepError::LockPoisoned`] instead of
//! panicking, so a panic on one side is surfaced to the other as an error.

use crate::error::{ImgrepError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Outcome of a single recognition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Ok,
    Error,
}

/// One cached recognition result, keyed by relative filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub status: EntryStatus,
    /// Extracted text; empty when `status` is `Error`.
    #[serde(default)]
    pub text: String,
    /// Human-readable failure message; only present when `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl CacheEntry {
    /// Successful recognition.
    pub fn ok<S: Into<String>>(text: S) -> Self {
        Self {
            status: EntryStatus::Ok,
            text: text.into(),
            error_detail: None,
        }
    }

    /// Failed recognition; the file counts as attempted and is not retried.
    pub fn error<S: Into<String>>(detail: S) -> Self {
        Self {
            status: EntryStatus::Error,
            text: String::new(),
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == EntryStatus::Ok
    }
}

/// Persisted entry form. Older cache files store the extracted text as a
/// plain string; those deserialize as `Ok` entries. Saving always writes the
/// structured form.
#[derive(Deserialize)]
#[serde(untagged)]
enum PersistedEntry {
    Structured(CacheEntry),
    Legacy(String),
}

impl From<PersistedEntry> for CacheEntry {
    fn from(persisted: PersistedEntry) -> Self {
        match persisted {
            PersistedEntry::Structured(entry) => entry,
            PersistedEntry::Legacy(text) => CacheEntry::ok(text),
        }
    }
}

/// Point-in-time copy of the mapping, safe to read while processing runs.
pub type CacheSnapshot = BTreeMap<String, CacheEntry>;

/// Summary counters for the cache, reported by `imgrep stats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub ok_entries: usize,
    pub error_entries: usize,
    pub file_size_bytes: u64,
}

/// Filename → [`CacheEntry`] mapping with JSON write-through persistence.
#[derive(Debug)]
pub struct TextCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, CacheEntry>>,
}

impl TextCache {
    /// Load the cache from `path`.
    ///
    /// A missing file yields an empty cache; an unreadable or corrupt file
    /// yields [`ImgrepError::CacheLoad`]. Use [`TextCache::load_or_default`]
    /// when a corrupt cache should not block processing.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let bytes = fs::read(&path).map_err(|e| {
                ImgrepError::cache_load_with_source(format!("failed to read {}", path.display()), e)
            })?;

            let persisted: BTreeMap<String, PersistedEntry> =
                serde_json::from_slice(&bytes).map_err(|e| {
                    ImgrepError::cache_load_with_source(
                        format!("corrupt cache file {}", path.display()),
                        e,
                    )
                })?;

            persisted.into_iter().map(|(k, v)| (k, v.into())).collect()
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Load the cache from `path`, substituting an empty cache when the
    /// persisted state is unreadable. The corruption is logged as a warning;
    /// it must never block new processing.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::load(&path) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!(
                    cache = %path.display(),
                    error = %e,
                    "discarding unreadable cache, starting empty"
                );
                Self {
                    path,
                    entries: Mutex::new(BTreeMap::new()),
                }
            }
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, CacheEntry>>> {
        self.entries
            .lock()
            .map_err(|e| ImgrepError::LockPoisoned(format!("cache entries mutex poisoned: {}", e)))
    }

    /// Non-blocking read of a single entry.
    pub fn get(&self, filename: &str) -> Result<Option<CacheEntry>> {
        Ok(self.lock()?.get(filename).cloned())
    }

    /// Insert an entry and write the whole mapping through to disk.
    ///
    /// The in-memory update happens first and is never rolled back: when
    /// persistence fails the error is returned for the caller to surface,
    /// and the session continues with the in-memory state as authoritative.
    pub fn put(&self, filename: impl Into<String>, entry: CacheEntry) -> Result<()> {
        let serialized = {
            let mut entries = self.lock()?;
            entries.insert(filename.into(), entry);
            serde_json::to_vec_pretty(&*entries)?
        };

        self.persist(&serialized)
    }

    /// Point-in-time copy of the whole mapping for concurrent readers.
    pub fn snapshot(&self) -> Result<CacheSnapshot> {
        Ok(self.lock()?.clone())
    }

    /// The set of filenames attempted so far, regardless of status.
    pub fn keys(&self) -> Result<HashSet<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Entry counters plus the size of the persisted file.
    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.lock()?;
        let ok_entries = entries.values().filter(|e| e.is_ok()).count();
        let total_entries = entries.len();
        drop(entries);

        let file_size_bytes = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        Ok(CacheStats {
            total_entries,
            ok_entries,
            error_entries: total_entries - ok_entries,
            file_size_bytes,
        })
    }

    /// Drop every entry and delete the persisted file.
    ///
    /// This is the manual escape hatch for re-attempting files whose earlier
    /// recognition failed: cached keys are never retried otherwise.
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();

        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ImgrepError::cache_persist_with_source(
                    format!("failed to remove {}", self.path.display()),
                    e,
                )
            })?;
        }

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the serialized mapping to a sibling temp file, then rename it
    /// over the cache path. The rename is atomic on POSIX filesystems, so an
    /// interrupted write leaves the previous cache file intact.
    fn persist(&self, serialized: &[u8]) -> Result<()> {
        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ImgrepError::validation(format!("invalid cache path: {}", self.path.display()))
            })?;

        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let temp_name = format!("{}.tmp.{}.{}", file_name, std::process::id(), timestamp);
        let temp_path = self.path.with_file_name(temp_name);

        fs::write(&temp_path, serialized).map_err(|e| {
            ImgrepError::cache_persist_with_source(
                format!("failed to write temp cache file {}", temp_path.display()),
                e,
            )
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            ImgrepError::cache_persist_with_source(
                format!("failed to replace cache file {}", self.path.display()),
                e,
            )
        })
    }
}

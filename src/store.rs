//! Cache slots and the metadata store.
//!
//! Persisted state lives under a storage root, one slot per repository:
//!
//! ```text
//! storage/
//!   owner_repo/
//!     snapshot.json    — serialized semantic index (see crate::index)
//!     metadata.json    — CacheMetadata record
//!     .lock            — advisory lock file
//! ```
//!
//! Metadata reads are best-effort: a missing or unparsable record reads as
//! `None` ("no cache"), never as an error. Writes go to a temporary sibling
//! and are renamed into place so a crash cannot leave a torn record.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::index::SNAPSHOT_FILE;
use crate::models::RepoRef;

pub const METADATA_FILE: &str = "metadata.json";
const LOCK_FILE: &str = ".lock";

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_RETRY: Duration = Duration::from_millis(50);

/// Record describing the last successful build of a slot's index.
///
/// If present and well-formed, `last_commit_sha` reflects the branch tip at
/// the time of the most recent successful build. It is `None` when the
/// freshness probe failed during that build, which forces a rebuild on the
/// next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub last_commit_sha: Option<String>,
    pub last_indexed: DateTime<Utc>,
    pub owner: String,
    pub repo: String,
}

/// On-disk cache keyed by repository identity.
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory of the slot for `repo`; not created by this call.
    pub fn slot_dir(&self, repo: &RepoRef) -> PathBuf {
        self.root.join(repo.slot_name())
    }

    /// A slot "exists" when it holds a persisted snapshot. The directory
    /// alone is not enough — the lock file creates it eagerly.
    pub fn slot_exists(&self, slot: &Path) -> bool {
        slot.join(SNAPSHOT_FILE).exists()
    }

    /// Read the slot's metadata record. `None` when the file is missing or
    /// does not parse as a [`CacheMetadata`].
    pub fn read_metadata(&self, slot: &Path) -> Option<CacheMetadata> {
        let path = slot.join(METADATA_FILE);
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable metadata");
                None
            }
        }
    }

    /// Persist the metadata record, fully overwriting any prior content.
    /// Creates the slot directory if absent.
    pub fn write_metadata(&self, slot: &Path, metadata: &CacheMetadata) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(metadata).context("Failed to serialize metadata")?;
        write_atomic(&slot.join(METADATA_FILE), &bytes)
            .context("Failed to write metadata record")?;
        Ok(())
    }

    /// Acquire an exclusive advisory lock on the slot, creating its
    /// directory if needed. Held for the duration of a load/build
    /// transition; released when the returned guard drops.
    pub fn lock_slot(&self, slot: &Path) -> std::result::Result<SlotLock, Error> {
        let to_lock_err = |slot: &Path, source: std::io::Error| Error::SlotLock {
            slot: slot.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(slot).map_err(|e| to_lock_err(slot, e))?;

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(slot.join(LOCK_FILE))
            .map_err(|e| to_lock_err(slot, e))?;

        let deadline = Instant::now() + LOCK_TIMEOUT;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(SlotLock { _file: file }),
                Err(e) if Instant::now() >= deadline => return Err(to_lock_err(slot, e)),
                Err(_) => std::thread::sleep(LOCK_RETRY),
            }
        }
    }
}

/// Guard for an exclusive slot lock. The lock releases when this drops.
pub struct SlotLock {
    _file: File,
}

/// Write `bytes` to `path` via a temporary sibling and an atomic rename.
/// Creates parent directories as needed.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "out".to_string());
    let tmp = path.with_file_name(format!("{}.tmp", file_name));

    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> CacheStore {
        CacheStore::new(dir.path().join("storage"))
    }

    fn sample_metadata() -> CacheMetadata {
        CacheMetadata {
            last_commit_sha: Some("abc123def456".to_string()),
            last_indexed: Utc::now(),
            owner: "testowner".to_string(),
            repo: "testrepo".to_string(),
        }
    }

    #[test]
    fn metadata_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let slot = store.slot_dir(&RepoRef::new("testowner", "testrepo"));

        let meta = sample_metadata();
        store.write_metadata(&slot, &meta).unwrap();

        let read = store.read_metadata(&slot).unwrap();
        assert_eq!(read, meta);
    }

    #[test]
    fn missing_metadata_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let slot = store.slot_dir(&RepoRef::new("nobody", "nothing"));
        assert!(store.read_metadata(&slot).is_none());
    }

    #[test]
    fn corrupt_metadata_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let slot = store.slot_dir(&RepoRef::new("testowner", "testrepo"));
        std::fs::create_dir_all(&slot).unwrap();
        std::fs::write(slot.join(METADATA_FILE), "invalid json").unwrap();

        assert!(store.read_metadata(&slot).is_none());
    }

    #[test]
    fn write_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let slot = store.slot_dir(&RepoRef::new("testowner", "testrepo"));

        let mut meta = sample_metadata();
        store.write_metadata(&slot, &meta).unwrap();

        meta.last_commit_sha = Some("fedcba987654".to_string());
        store.write_metadata(&slot, &meta).unwrap();

        let read = store.read_metadata(&slot).unwrap();
        assert_eq!(read.last_commit_sha.as_deref(), Some("fedcba987654"));
    }

    #[test]
    fn write_leaves_no_tmp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let slot = store.slot_dir(&RepoRef::new("testowner", "testrepo"));

        store.write_metadata(&slot, &sample_metadata()).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(&slot)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn slot_without_snapshot_does_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let slot = store.slot_dir(&RepoRef::new("testowner", "testrepo"));

        // Locking creates the directory, but the slot still has no snapshot
        let _lock = store.lock_slot(&slot).unwrap();
        assert!(!store.slot_exists(&slot));

        std::fs::write(slot.join(SNAPSHOT_FILE), "{}").unwrap();
        assert!(store.slot_exists(&slot));
    }

    #[test]
    fn lock_is_exclusive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let slot = store.slot_dir(&RepoRef::new("testowner", "testrepo"));

        let lock = store.lock_slot(&slot).unwrap();
        drop(lock);
        // Re-acquiring after drop succeeds
        let _again = store.lock_slot(&slot).unwrap();
    }

    #[test]
    fn metadata_none_sha_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let slot = store.slot_dir(&RepoRef::new("testowner", "testrepo"));

        let meta = CacheMetadata {
            last_commit_sha: None,
            ..sample_metadata()
        };
        store.write_metadata(&slot, &meta).unwrap();
        assert_eq!(store.read_metadata(&slot).unwrap().last_commit_sha, None);
    }
}

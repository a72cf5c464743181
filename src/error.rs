//! Error types for repo-chat.
//!
//! Expected absences (a probe that cannot reach GitHub, a metadata file that
//! is missing or unparsable) are `Option`, not errors — see [`crate::probe`]
//! and [`crate::store`]. This enum covers only failures that end the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for repo-chat operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A required credential is missing from the environment.
    /// Raised at startup, before any cache logic runs.
    #[error("{name} not found. Set it in your environment before running.")]
    MissingCredential { name: &'static str },

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Repository URL '{0}' is not of the form github.com/<owner>/<repo>")]
    RepoUrl(String),

    /// Could not acquire the exclusive lock on a cache slot.
    #[error("Cache slot {slot} is locked by another repo-chat process")]
    SlotLock {
        slot: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Fetching repository documents failed. The run aborts without touching
    /// any existing snapshot or metadata.
    #[error("Failed to fetch repository contents: {0}")]
    DocumentFetch(#[source] anyhow::Error),

    /// Chunking or embedding failed while constructing a new index.
    #[error("Failed to build the semantic index: {0}")]
    IndexBuild(#[source] anyhow::Error),

    #[error("Failed to persist index snapshot to {slot}: {source}")]
    SnapshotPersist {
        slot: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Query failed: {0}")]
    Query(#[source] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Configuration errors abort before any cache logic and map to a
    /// non-zero exit; everything else is reported and exits cleanly.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingCredential { .. } | Error::ConfigInvalid { .. } | Error::ConfigRead { .. }
        )
    }
}

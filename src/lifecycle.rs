//! Index lifecycle orchestration.
//!
//! Coordinates the full freshness flow: probe the remote tip, compare it
//! against the slot's recorded revision, then either load the cached
//! snapshot or drive fetch → build → persist → metadata update. The slot
//! lock is held across the whole transition so concurrent invocations
//! against the same repository serialize instead of racing the
//! snapshot/metadata pair.

use chrono::Utc;
use std::path::Path;

use crate::connector_github::ContentSource;
use crate::error::{Error, Result};
use crate::freshness::needs_rebuild;
use crate::index::{SemanticIndex, SemanticIndexer};
use crate::models::RepoRef;
use crate::probe::RemoteStateProbe;
use crate::store::{CacheMetadata, CacheStore};

/// Obtains a queryable index for a repository, reusing the cache when the
/// remote revision is unchanged.
pub struct IndexLifecycle<'a> {
    store: &'a CacheStore,
    probe: &'a dyn RemoteStateProbe,
    source: &'a dyn ContentSource,
    indexer: &'a dyn SemanticIndexer,
}

impl<'a> IndexLifecycle<'a> {
    pub fn new(
        store: &'a CacheStore,
        probe: &'a dyn RemoteStateProbe,
        source: &'a dyn ContentSource,
        indexer: &'a dyn SemanticIndexer,
    ) -> Self {
        Self {
            store,
            probe,
            source,
            indexer,
        }
    }

    /// Return a queryable index for `(repo, branch)`, rebuilding if the
    /// freshness verdict demands it.
    pub async fn obtain(&self, repo: &RepoRef, branch: &str, force: bool) -> Result<SemanticIndex> {
        let slot = self.store.slot_dir(repo);
        let _lock = self.store.lock_slot(&slot)?;

        let slot_exists = self.store.slot_exists(&slot);
        let stored = self
            .store
            .read_metadata(&slot)
            .and_then(|m| m.last_commit_sha);
        let current = self.probe.branch_tip(repo, branch).await;

        let rebuild = needs_rebuild(force, slot_exists, stored.as_deref(), current.as_deref());
        tracing::info!(
            repo = %repo,
            branch,
            force,
            slot_exists,
            stored = stored.as_deref().unwrap_or("-"),
            current = current.as_deref().unwrap_or("-"),
            rebuild,
            "freshness verdict"
        );

        if !rebuild {
            match SemanticIndex::load(&slot) {
                Ok(index) => {
                    tracing::info!(entries = index.entries.len(), "loaded cached index");
                    return Ok(index);
                }
                Err(e) => {
                    // A corrupt snapshot under a fresh verdict is treated
                    // like "no cache": fall through to the build path.
                    tracing::warn!(error = %e, "cached snapshot failed to load; rebuilding");
                }
            }
        }

        self.rebuild(repo, branch, &slot, current).await
    }

    async fn rebuild(
        &self,
        repo: &RepoRef,
        branch: &str,
        slot: &Path,
        current: Option<String>,
    ) -> Result<SemanticIndex> {
        let documents = self
            .source
            .fetch(repo, branch)
            .await
            .map_err(Error::DocumentFetch)?;
        tracing::info!(documents = documents.len(), "building semantic index");

        let index = self
            .indexer
            .build(&documents)
            .await
            .map_err(Error::IndexBuild)?;

        index.save(slot).map_err(|source| Error::SnapshotPersist {
            slot: slot.to_path_buf(),
            source,
        })?;

        // Written only after a successful build and persist. `current` may
        // be None here (probe failed); recording the absence forces a
        // rebuild on the next run, which is the safe direction.
        let metadata = CacheMetadata {
            last_commit_sha: current,
            last_indexed: Utc::now(),
            owner: repo.owner.clone(),
            repo: repo.repo.clone(),
        };
        if let Err(e) = self.store.write_metadata(slot, &metadata) {
            tracing::warn!(error = %e, "metadata write failed after snapshot persist; next run will rebuild");
        }

        tracing::info!(entries = index.entries.len(), "index built and persisted");
        Ok(index)
    }
}

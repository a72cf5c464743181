//! GitHub content source: fetch a repository's text files over the REST API.
//!
//! Workflow:
//! 1. List the branch tree with `git/trees/{branch}?recursive=1`.
//! 2. Apply include/exclude globs and the per-file size cap to blob entries.
//! 3. Download each kept blob (`git/blobs/{sha}`), base64-decode, and keep
//!    only content that decodes to UTF-8.
//!
//! HTTP and transport errors fail the whole fetch — a partially fetched
//! repository never becomes a partial index. A blob that is not valid UTF-8
//! is a filter miss, not a failure, and is skipped.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::GithubConfig;
use crate::github::GithubClient;
use crate::models::{RepoDocument, RepoRef};

/// Source of a repository's documents.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, repo: &RepoRef, branch: &str) -> Result<Vec<RepoDocument>>;
}

/// Content source backed by the GitHub git-data API.
pub struct GithubSource {
    client: GithubClient,
    include: GlobSet,
    exclude: GlobSet,
    max_file_bytes: u64,
}

impl GithubSource {
    pub fn new(client: GithubClient, config: &GithubConfig) -> Result<Self> {
        let include = build_globset(&config.include_globs)?;

        let mut default_excludes = vec![
            "**/.git/**".to_string(),
            "**/node_modules/**".to_string(),
            "**/target/**".to_string(),
            "**/*.lock".to_string(),
            "**/package-lock.json".to_string(),
        ];
        default_excludes.extend(config.exclude_globs.clone());
        let exclude = build_globset(&default_excludes)?;

        Ok(Self {
            client,
            include,
            exclude,
            max_file_bytes: config.max_file_bytes,
        })
    }

    async fn list_blobs(&self, repo: &RepoRef, branch: &str) -> Result<Vec<TreeEntry>> {
        let path = format!(
            "/repos/{}/{}/git/trees/{}?recursive=1",
            repo.owner, repo.repo, branch
        );
        let body = self.client.get_json(&path).await?;

        if body
            .get("truncated")
            .and_then(|t| t.as_bool())
            .unwrap_or(false)
        {
            tracing::warn!(repo = %repo, "tree listing truncated by the API; indexing the listed subset");
        }

        let entries = body
            .get("tree")
            .and_then(|t| t.as_array())
            .ok_or_else(|| anyhow!("tree response missing 'tree' array"))?;

        let mut blobs = Vec::new();
        for entry in entries {
            let Some(parsed) = parse_tree_entry(entry) else {
                continue;
            };
            if self.keep(&parsed) {
                blobs.push(parsed);
            }
        }

        // Deterministic ordering keeps snapshots stable across runs
        blobs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(blobs)
    }

    fn keep(&self, entry: &TreeEntry) -> bool {
        if entry.size > self.max_file_bytes {
            tracing::debug!(path = %entry.path, size = entry.size, "skipping oversized file");
            return false;
        }
        if self.exclude.is_match(&entry.path) {
            return false;
        }
        self.include.is_match(&entry.path)
    }

    async fn fetch_blob(&self, repo: &RepoRef, entry: &TreeEntry) -> Result<Option<String>> {
        let path = format!("/repos/{}/{}/git/blobs/{}", repo.owner, repo.repo, entry.sha);
        let body = self.client.get_json(&path).await?;

        let content = body
            .get("content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow!("blob response for {} missing 'content'", entry.path))?;

        // The API inserts newlines into the base64 payload
        let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .with_context(|| format!("blob for {} is not valid base64", entry.path))?;

        match String::from_utf8(bytes) {
            Ok(text) => Ok(Some(text)),
            Err(_) => {
                tracing::debug!(path = %entry.path, "skipping non-UTF-8 blob");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ContentSource for GithubSource {
    async fn fetch(&self, repo: &RepoRef, branch: &str) -> Result<Vec<RepoDocument>> {
        let blobs = self.list_blobs(repo, branch).await?;
        if blobs.is_empty() {
            bail!("no indexable files found in {} on branch {}", repo, branch);
        }

        tracing::info!(repo = %repo, files = blobs.len(), "fetching repository contents");

        let mut documents = Vec::with_capacity(blobs.len());
        for entry in &blobs {
            if let Some(text) = self.fetch_blob(repo, entry).await? {
                documents.push(RepoDocument {
                    path: entry.path.clone(),
                    text,
                });
            }
        }

        Ok(documents)
    }
}

#[derive(Debug, Clone)]
struct TreeEntry {
    path: String,
    sha: String,
    size: u64,
}

/// Parse one entry of a git tree listing; `None` for non-blob entries.
fn parse_tree_entry(entry: &serde_json::Value) -> Option<TreeEntry> {
    if entry.get("type")?.as_str()? != "blob" {
        return None;
    }
    Some(TreeEntry {
        path: entry.get("path")?.as_str()?.to_string(),
        sha: entry.get("sha")?.as_str()?.to_string(),
        size: entry.get("size").and_then(|s| s.as_u64()).unwrap_or(0),
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

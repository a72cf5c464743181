//! Core data models used throughout repo-chat.
//!
//! These types represent the repository identity, fetched documents, and
//! chunks that flow through the indexing and retrieval pipeline.

use std::fmt;

/// A GitHub repository identified by its owner and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Deterministic cache slot name: `owner_repo`.
    pub fn slot_name(&self) -> String {
        format!("{}_{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// One text file fetched from a repository.
#[derive(Debug, Clone)]
pub struct RepoDocument {
    /// Path relative to the repository root, e.g. `src/main.rs`.
    pub path: String,
    pub text: String,
}

/// A chunk of a document's text, produced by the chunker.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    /// Repository path of the document this chunk came from.
    pub path: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of the chunk text.
    pub hash: String,
}

/// A chunk retrieved for a query, with its similarity score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub path: String,
    pub chunk_index: i64,
    pub text: String,
    pub score: f32,
}

//! The semantic index: build, snapshot persistence, and retrieval.
//!
//! An index is a flat list of chunk entries, each carrying its embedding
//! vector. Snapshots are JSON (`snapshot.json` in a cache slot) with vectors
//! stored as base64-encoded little-endian f32 blobs. A snapshot is
//! overwritten wholesale on every rebuild; there is no incremental update.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::chunk::chunk_text;
use crate::config::ChunkingConfig;
use crate::embedding::{cosine_similarity, EmbeddingClient};
use crate::models::{RepoDocument, RetrievedChunk};
use crate::store;

/// Snapshot file name within a cache slot.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// One indexed chunk with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: String,
    pub chunk_index: i64,
    pub text: String,
    #[serde(with = "vector_codec")]
    pub vector: Vec<f32>,
}

/// An embedding-based retrieval index over a repository's chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticIndex {
    pub model: String,
    pub dims: usize,
    pub built_at: DateTime<Utc>,
    pub entries: Vec<IndexEntry>,
}

impl SemanticIndex {
    /// Rank entries by cosine similarity to the query vector and return the
    /// top `k`.
    pub fn retrieve(&self, query: &[f32], k: usize) -> Vec<RetrievedChunk> {
        let mut scored: Vec<RetrievedChunk> = self
            .entries
            .iter()
            .map(|e| RetrievedChunk {
                path: e.path.clone(),
                chunk_index: e.chunk_index,
                text: e.text.clone(),
                score: cosine_similarity(query, &e.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }

    /// Persist the snapshot into `slot`, creating the directory if needed.
    /// The write is atomic (tmp file + rename).
    pub fn save(&self, slot: &Path) -> Result<()> {
        let bytes = serde_json::to_vec(self).context("Failed to serialize index snapshot")?;
        store::write_atomic(&slot.join(SNAPSHOT_FILE), &bytes)
            .context("Failed to write index snapshot")?;
        Ok(())
    }

    /// Load a persisted snapshot from `slot`.
    pub fn load(slot: &Path) -> Result<SemanticIndex> {
        let path = slot.join(SNAPSHOT_FILE);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read snapshot at {}", path.display()))?;
        let index: SemanticIndex =
            serde_json::from_slice(&bytes).context("Snapshot failed to deserialize")?;

        for entry in &index.entries {
            if entry.vector.len() != index.dims {
                bail!(
                    "Snapshot is inconsistent: entry {}#{} has {} dims, expected {}",
                    entry.path,
                    entry.chunk_index,
                    entry.vector.len(),
                    index.dims
                );
            }
        }

        Ok(index)
    }
}

/// Builds a [`SemanticIndex`] from fetched documents.
#[async_trait]
pub trait SemanticIndexer: Send + Sync {
    async fn build(&self, documents: &[RepoDocument]) -> Result<SemanticIndex>;
}

/// Indexer that chunks documents and embeds them through the OpenAI API.
pub struct EmbeddingIndexer {
    embedder: EmbeddingClient,
    chunking: ChunkingConfig,
}

impl EmbeddingIndexer {
    pub fn new(embedder: EmbeddingClient, chunking: ChunkingConfig) -> Self {
        Self { embedder, chunking }
    }
}

#[async_trait]
impl SemanticIndexer for EmbeddingIndexer {
    async fn build(&self, documents: &[RepoDocument]) -> Result<SemanticIndex> {
        let chunks: Vec<_> = documents
            .iter()
            .flat_map(|doc| chunk_text(&doc.path, &doc.text, self.chunking.max_tokens))
            .filter(|c| !c.text.trim().is_empty())
            .collect();

        if chunks.is_empty() {
            bail!("repository produced no indexable text");
        }

        tracing::info!(chunks = chunks.len(), model = %self.embedder.model(), "embedding chunks");

        let mut entries = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.embedder.batch_size()) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_texts(&texts).await?;

            if vectors.len() != batch.len() {
                bail!(
                    "embeddings API returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                );
            }

            for (chunk, vector) in batch.iter().zip(vectors) {
                if vector.len() != self.embedder.dims() {
                    bail!(
                        "embedding for {}#{} has {} dims, expected {}",
                        chunk.path,
                        chunk.chunk_index,
                        vector.len(),
                        self.embedder.dims()
                    );
                }
                entries.push(IndexEntry {
                    path: chunk.path.clone(),
                    chunk_index: chunk.chunk_index,
                    text: chunk.text.clone(),
                    vector,
                });
            }
        }

        Ok(SemanticIndex {
            model: self.embedder.model().to_string(),
            dims: self.embedder.dims(),
            built_at: Utc::now(),
            entries,
        })
    }
}

/// Serde codec storing vectors as base64-encoded little-endian f32 blobs.
mod vector_codec {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::embedding::{blob_to_vec, vec_to_blob};

    pub fn serialize<S: Serializer>(vec: &[f32], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(vec_to_blob(vec));
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f32>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let blob = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)?;
        if blob.len() % 4 != 0 {
            return Err(serde::de::Error::custom("vector blob length not a multiple of 4"));
        }
        Ok(blob_to_vec(&blob))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_index() -> SemanticIndex {
        SemanticIndex {
            model: "test-model".to_string(),
            dims: 3,
            built_at: Utc::now(),
            entries: vec![
                IndexEntry {
                    path: "a.md".to_string(),
                    chunk_index: 0,
                    text: "alpha".to_string(),
                    vector: vec![1.0, 0.0, 0.0],
                },
                IndexEntry {
                    path: "b.md".to_string(),
                    chunk_index: 0,
                    text: "beta".to_string(),
                    vector: vec![0.0, 1.0, 0.0],
                },
                IndexEntry {
                    path: "c.md".to_string(),
                    chunk_index: 1,
                    text: "gamma".to_string(),
                    vector: vec![0.9, 0.1, 0.0],
                },
            ],
        }
    }

    #[test]
    fn retrieve_ranks_by_similarity() {
        let index = test_index();
        let results = index.retrieve(&[1.0, 0.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].path, "a.md");
        assert_eq!(results[1].path, "c.md");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn retrieve_k_larger_than_entries() {
        let index = test_index();
        let results = index.retrieve(&[1.0, 0.0, 0.0], 10);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let slot = dir.path().join("owner_repo");

        let index = test_index();
        index.save(&slot).unwrap();

        let loaded = SemanticIndex::load(&slot).unwrap();
        assert_eq!(loaded.model, index.model);
        assert_eq!(loaded.dims, index.dims);
        assert_eq!(loaded.entries.len(), index.entries.len());
        assert_eq!(loaded.entries[0].vector, index.entries[0].vector);
    }

    #[test]
    fn load_rejects_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let slot = dir.path().join("owner_repo");
        std::fs::create_dir_all(&slot).unwrap();
        std::fs::write(slot.join(SNAPSHOT_FILE), b"not json").unwrap();

        assert!(SemanticIndex::load(&slot).is_err());
    }

    #[test]
    fn load_rejects_dims_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let slot = dir.path().join("owner_repo");

        let mut index = test_index();
        index.dims = 4;
        index.save(&slot).unwrap();

        assert!(SemanticIndex::load(&slot).is_err());
    }

    #[test]
    fn load_missing_snapshot_is_err() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SemanticIndex::load(&dir.path().join("nope")).is_err());
    }
}

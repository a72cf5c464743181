//! # repo-chat
//!
//! Ask natural-language questions about a GitHub repository from your
//! terminal.
//!
//! repo-chat fetches a repository's text files over the GitHub REST API,
//! builds an embedding-based retrieval index over their contents, and
//! answers questions through a retrieval-augmented query engine. Indexes are
//! cached on disk per repository and invalidated by comparing the branch's
//! tip commit SHA against the revision recorded at the last build.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌───────────────┐
//! │ GitHub API   │──▶│  Pipeline    │──▶│ Cache slot    │
//! │ trees/blobs  │   │ Chunk+Embed │   │ snapshot.json │
//! └──────────────┘   └─────────────┘   │ metadata.json │
//!        ▲                             └───────┬───────┘
//!        │ branch tip probe                    │
//! ┌──────┴───────┐                      ┌──────▼──────┐
//! │  Freshness   │◀─────────────────────│  Lifecycle  │
//! │  decision    │                      │ load/build  │
//! └──────────────┘                      └──────┬──────┘
//!                                              ▼
//!                                       ┌─────────────┐
//!                                       │ QueryEngine │
//!                                       │ retrieve+LLM│
//!                                       └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and env credentials |
//! | [`models`] | Core data types |
//! | [`github`] | Shared GitHub API client, URL parsing |
//! | [`probe`] | Remote branch-tip probe |
//! | [`connector_github`] | Repository content source |
//! | [`chunk`] | Text chunking |
//! | [`embedding`] | OpenAI embedding client, vector utilities |
//! | [`index`] | Semantic index build, snapshot, retrieval |
//! | [`store`] | Cache slots and metadata persistence |
//! | [`freshness`] | Pure rebuild-verdict function |
//! | [`lifecycle`] | Load-or-rebuild orchestration |
//! | [`query`] | Retrieval-augmented answer generation |
//! | [`interactive`] | Prompt-driven input collection |

pub mod chunk;
pub mod config;
pub mod connector_github;
pub mod embedding;
pub mod error;
pub mod freshness;
pub mod github;
pub mod index;
pub mod interactive;
pub mod lifecycle;
pub mod models;
pub mod probe;
pub mod query;
pub mod store;

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Runtime configuration. Loaded from an optional TOML file; every section
/// has working defaults so the tool runs with no config at all.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory holding one cache slot per `owner_repo`.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./storage")
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    /// API base URL. Override for GitHub Enterprise or tests.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// The probe is a freshness optimization, not a load-bearing path,
    /// so it gets a short bounded timeout.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Files larger than this are not indexed.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            branch: default_branch(),
            probe_timeout_secs: default_probe_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_file_bytes: default_max_file_bytes(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_branch() -> String {
    "main".to_string()
}
fn default_probe_timeout_secs() -> u64 {
    5
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_max_file_bytes() -> u64 {
    512 * 1024
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    700
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,
    /// Number of retrieved chunks handed to the model as context.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            top_k: default_top_k(),
            max_retries: default_max_retries(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_top_k() -> usize {
    6
}
fn default_generation_timeout_secs() -> u64 {
    60
}

/// API credentials, read from the process environment at startup.
///
/// Both are required before any cache logic runs: the OpenAI key drives
/// embedding and answer generation, the GitHub token drives content fetching
/// (and raises the rate limit on the freshness probe).
#[derive(Debug, Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub github_token: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        let openai_api_key = require_env("OPENAI_API_KEY")?;
        let github_token = require_env("GITHUB_TOKEN")?;
        Ok(Self {
            openai_api_key,
            github_token,
        })
    }
}

fn require_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::MissingCredential { name }),
    }
}

/// Load configuration from a TOML file, or defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| Error::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    validate(&config).map_err(|reason| Error::ConfigInvalid {
        path: path.to_path_buf(),
        reason,
    })?;

    Ok(config)
}

fn validate(config: &Config) -> std::result::Result<(), String> {
    if config.chunking.max_tokens == 0 {
        return Err("chunking.max_tokens must be > 0".to_string());
    }
    if config.embedding.dims == 0 {
        return Err("embedding.dims must be > 0".to_string());
    }
    if config.embedding.batch_size == 0 {
        return Err("embedding.batch_size must be > 0".to_string());
    }
    if config.generation.top_k == 0 {
        return Err("generation.top_k must be >= 1".to_string());
    }
    if config.github.branch.trim().is_empty() {
        return Err("github.branch must not be empty".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_config_file() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.github.branch, "main");
        assert_eq!(cfg.github.api_base, "https://api.github.com");
        assert_eq!(cfg.storage.root, PathBuf::from("./storage"));
        assert_eq!(cfg.embedding.dims, 1536);
        assert_eq!(cfg.generation.top_k, 6);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo-chat.toml");
        std::fs::write(
            &path,
            r#"
[github]
branch = "develop"

[generation]
top_k = 3
"#,
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.github.branch, "develop");
        assert_eq!(cfg.generation.top_k, 3);
        assert_eq!(cfg.embedding.model, "text-embedding-3-small");
    }

    #[test]
    fn invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo-chat.toml");
        std::fs::write(&path, "[chunking]\nmax_tokens = 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/repo-chat.toml"))).unwrap_err();
        assert!(err.is_configuration());
    }
}

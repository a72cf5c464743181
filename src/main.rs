//! # repo-chat CLI
//!
//! Ask a question about a GitHub repository:
//!
//! ```bash
//! repo-chat https://github.com/owner/repo "How is configuration loaded?"
//! ```
//!
//! The first run fetches and indexes the repository; later runs reuse the
//! cached index as long as the branch tip is unchanged. `--force-reindex`
//! rebuilds regardless, and `-i` collects the inputs interactively.
//!
//! Requires `OPENAI_API_KEY` and `GITHUB_TOKEN` in the environment.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use repo_chat::config::{load_config, Config, Credentials};
use repo_chat::connector_github::GithubSource;
use repo_chat::embedding::EmbeddingClient;
use repo_chat::error::{Error, Result};
use repo_chat::github::{parse_repo_url, GithubClient};
use repo_chat::index::EmbeddingIndexer;
use repo_chat::interactive;
use repo_chat::lifecycle::IndexLifecycle;
use repo_chat::probe::GithubProbe;
use repo_chat::query::QueryEngine;
use repo_chat::store::CacheStore;

/// Chat with a GitHub repository using AI.
#[derive(Parser)]
#[command(
    name = "repo-chat",
    about = "Ask natural-language questions about a GitHub repository",
    version
)]
struct Cli {
    /// Repository URL (e.g. 'https://github.com/owner/repo').
    #[arg(required_unless_present = "interactive")]
    repo_url: Option<String>,

    /// The question to ask about the repository.
    #[arg(required_unless_present = "interactive")]
    question: Option<String>,

    /// Rebuild the index even if the cached one looks fresh.
    #[arg(long)]
    force_reindex: bool,

    /// Collect the repository URL, question, and reindex choice from prompts.
    #[arg(short, long)]
    interactive: bool,

    /// Branch to index (defaults to the configured branch, ultimately `main`).
    #[arg(long)]
    branch: Option<String>,

    /// Path to an optional configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: everything).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("repo_chat=info"),
        1 => EnvFilter::new("repo_chat=debug"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_configuration() => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            // Business-logic failures are reported but do not change the
            // exit code; only misconfiguration exits non-zero.
            eprintln!("An error occurred: {}", e);
            ExitCode::SUCCESS
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let credentials = Credentials::from_env()?;

    let (repo_url, question, force) = if cli.interactive {
        let inputs = interactive::collect()?;
        (inputs.repo_url, inputs.question, inputs.force_reindex)
    } else {
        // clap guarantees both positionals outside interactive mode
        (
            cli.repo_url.unwrap_or_default(),
            cli.question.unwrap_or_default(),
            cli.force_reindex,
        )
    };

    let branch = cli
        .branch
        .unwrap_or_else(|| config.github.branch.clone());

    let answer = ask(&config, &credentials, &repo_url, &question, &branch, force).await?;

    println!("{}", answer);
    Ok(())
}

/// Resolve the repository, obtain a fresh-or-cached index, and answer.
async fn ask(
    config: &Config,
    credentials: &Credentials,
    repo_url: &str,
    question: &str,
    branch: &str,
    force: bool,
) -> Result<String> {
    let repo = parse_repo_url(repo_url)?;

    let probe_client = GithubClient::new(
        &config.github.api_base,
        Some(credentials.github_token.clone()),
        Duration::from_secs(config.github.probe_timeout_secs),
    )
    .map_err(Error::DocumentFetch)?;
    let fetch_client = GithubClient::new(
        &config.github.api_base,
        Some(credentials.github_token.clone()),
        Duration::from_secs(config.github.fetch_timeout_secs),
    )
    .map_err(Error::DocumentFetch)?;

    let probe = GithubProbe::new(probe_client);
    let source = GithubSource::new(fetch_client, &config.github).map_err(Error::DocumentFetch)?;

    let embedder = EmbeddingClient::new(
        config.embedding.clone(),
        credentials.openai_api_key.clone(),
    )
    .map_err(Error::IndexBuild)?;
    let indexer = EmbeddingIndexer::new(embedder, config.chunking.clone());

    let store = CacheStore::new(config.storage.root.clone());
    let lifecycle = IndexLifecycle::new(&store, &probe, &source, &indexer);

    let index = lifecycle.obtain(&repo, branch, force).await?;

    let query_embedder = EmbeddingClient::new(
        config.embedding.clone(),
        credentials.openai_api_key.clone(),
    )
    .map_err(Error::Query)?;
    let engine = QueryEngine::new(
        index,
        query_embedder,
        config.generation.clone(),
        credentials.openai_api_key.clone(),
    )
    .map_err(Error::Query)?;

    engine.answer(question).await.map_err(Error::Query)
}

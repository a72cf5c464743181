//! Shared GitHub API client and repository URL parsing.
//!
//! One [`GithubClient`] instance backs both the freshness probe and the
//! content source. Requests carry a `token` Authorization header when a
//! token is configured; unauthenticated reads of public repositories still
//! work, subject to GitHub's lower anonymous rate limit.

use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::error::Error;
use crate::models::RepoRef;

/// Thin wrapper over `reqwest` with the API base URL and auth baked in.
#[derive(Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(api_base: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("repo-chat/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to construct HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Issue a GET against `{api_base}{path}` and return the parsed JSON
    /// body. Non-success statuses are errors with the status in the message.
    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.api_base, path);
        let mut req = self.client.get(&url);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("token {}", token));
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("GET {} returned {}", url, status);
        }

        resp.json()
            .await
            .with_context(|| format!("GET {} returned a malformed body", url))
    }
}

/// Extract `(owner, repo)` from a repository URL.
///
/// Accepts the forms people actually paste: full `https://` URLs, bare
/// `github.com/owner/repo`, and either with a trailing `.git` or `/`.
pub fn parse_repo_url(url: &str) -> std::result::Result<RepoRef, Error> {
    let trimmed = url.trim().trim_end_matches('/');
    let mut segments = trimmed.rsplit('/');

    let repo = segments.next().unwrap_or_default();
    let owner = segments.next().unwrap_or_default();
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    if owner.is_empty() || repo.is_empty() || owner.contains(':') {
        return Err(Error::RepoUrl(url.to_string()));
    }

    Ok(RepoRef::new(owner, repo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_url() {
        let r = parse_repo_url("https://github.com/owner/repo").unwrap();
        assert_eq!((r.owner.as_str(), r.repo.as_str()), ("owner", "repo"));
    }

    #[test]
    fn parses_hyphenated_names() {
        let r = parse_repo_url("https://github.com/test-owner/test-repo").unwrap();
        assert_eq!(
            (r.owner.as_str(), r.repo.as_str()),
            ("test-owner", "test-repo")
        );
    }

    #[test]
    fn parses_bare_host_form() {
        let r = parse_repo_url("github.com/user/project").unwrap();
        assert_eq!((r.owner.as_str(), r.repo.as_str()), ("user", "project"));
    }

    #[test]
    fn strips_git_suffix_and_trailing_slash() {
        let r = parse_repo_url("https://github.com/owner/repo.git").unwrap();
        assert_eq!(r.repo, "repo");
        let r = parse_repo_url("https://github.com/owner/repo/").unwrap();
        assert_eq!(r.repo, "repo");
    }

    #[test]
    fn rejects_urls_without_two_segments() {
        assert!(parse_repo_url("repo").is_err());
        assert!(parse_repo_url("https://github.com/").is_err());
        assert!(parse_repo_url("").is_err());
    }

    #[test]
    fn slot_name_is_owner_underscore_repo() {
        let r = parse_repo_url("https://github.com/test/repo").unwrap();
        assert_eq!(r.slot_name(), "test_repo");
    }
}

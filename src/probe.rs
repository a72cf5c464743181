//! Remote state probe: the tip commit SHA of a branch.
//!
//! The probe is best-effort by contract. Any failure — non-success status,
//! malformed response, transport error, timeout — degrades to `None`, which
//! the freshness decision treats as "cannot confirm freshness" and resolves
//! in favor of a rebuild. No error ever propagates from here.

use async_trait::async_trait;

use crate::github::GithubClient;
use crate::models::RepoRef;

/// Source of the current tip revision of a remote branch.
#[async_trait]
pub trait RemoteStateProbe: Send + Sync {
    /// Returns the tip commit SHA, or `None` when it cannot be determined.
    async fn branch_tip(&self, repo: &RepoRef, branch: &str) -> Option<String>;
}

/// Probe backed by the GitHub branch-metadata endpoint.
pub struct GithubProbe {
    client: GithubClient,
}

impl GithubProbe {
    pub fn new(client: GithubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteStateProbe for GithubProbe {
    async fn branch_tip(&self, repo: &RepoRef, branch: &str) -> Option<String> {
        let path = format!("/repos/{}/{}/branches/{}", repo.owner, repo.repo, branch);
        match self.client.get_json(&path).await {
            Ok(body) => {
                let sha = parse_branch_response(&body);
                if sha.is_none() {
                    tracing::warn!(repo = %repo, branch, "branch response missing commit.sha");
                }
                sha
            }
            Err(e) => {
                tracing::warn!(repo = %repo, branch, error = %e, "branch probe failed");
                None
            }
        }
    }
}

/// Pull `commit.sha` out of a branch-metadata response.
fn parse_branch_response(body: &serde_json::Value) -> Option<String> {
    body.get("commit")?
        .get("sha")?
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_commit_sha() {
        let body = json!({"name": "main", "commit": {"sha": "abc123def456"}});
        assert_eq!(
            parse_branch_response(&body),
            Some("abc123def456".to_string())
        );
    }

    #[test]
    fn missing_commit_is_none() {
        assert_eq!(parse_branch_response(&json!({"name": "main"})), None);
    }

    #[test]
    fn non_string_sha_is_none() {
        let body = json!({"commit": {"sha": 42}});
        assert_eq!(parse_branch_response(&body), None);
    }
}

//! REST v3 calls: pull-request discovery, review comments, unified diffs.

use serde::Deserialize;
use tracing::debug;

use crate::{
    GitHubClient,
    errors::GithubResult,
    types::{PullRequest, RepoId, ReviewComment},
};

impl GitHubClient {
    /// Lists open pull requests for a repository.
    ///
    /// NOTE: This ignores pagination beyond 100 PRs; can be extended later.
    pub async fn list_open_pull_requests(&self, repo: &RepoId) -> GithubResult<Vec<PullRequest>> {
        let url = format!(
            "{}/repos/{}/{}/pulls?state=open&per_page=100",
            self.base_api(),
            repo.owner,
            repo.repo
        );
        debug!("GitHub list_open_pull_requests: {}", url);

        let raw: Vec<RestPull> = self
            .http()
            .get(url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(raw
            .into_iter()
            .map(|p| PullRequest {
                number: p.number,
                title: p.title,
                head_ref: p.head.r#ref,
            })
            .collect())
    }

    /// Lists inline review comments for a pull request.
    ///
    /// NOTE: This ignores pagination beyond 100 comments; can be extended later.
    pub async fn list_review_comments(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> GithubResult<Vec<ReviewComment>> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/comments?per_page=100",
            self.base_api(),
            repo.owner,
            repo.repo,
            number
        );
        debug!("GitHub list_review_comments: {}", url);

        let raw: Vec<RestReviewComment> = self
            .http()
            .get(url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(raw.into_iter().map(ReviewComment::from).collect())
    }

    /// Fetches the unified diff of a pull request as plain text.
    pub async fn get_pull_request_diff(&self, repo: &RepoId, number: u64) -> GithubResult<String> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.base_api(),
            repo.owner,
            repo.repo,
            number
        );
        debug!("GitHub get_pull_request_diff: {}", url);

        let diff = self
            .http()
            .get(url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/vnd.github.diff")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(diff)
    }

    /// Login of the authenticated identity; used as the startup auth check.
    pub async fn authenticated_login(&self) -> GithubResult<String> {
        let url = format!("{}/user", self.base_api());
        debug!("GitHub authenticated_login: {}", url);

        let user: RestUser = self
            .http()
            .get(url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(user.login)
    }
}

impl From<RestReviewComment> for ReviewComment {
    fn from(c: RestReviewComment) -> Self {
        ReviewComment {
            id: c.id,
            node_id: c.node_id,
            author: c.user.map(|u| u.login),
            path: c.path,
            line: c.line,
            start_line: c.start_line,
            original_line: c.original_line,
            original_start_line: c.original_start_line,
            diff_hunk: c.diff_hunk,
            body: c.body,
        }
    }
}

/// GitHub PR response (subset).
#[derive(Debug, Deserialize)]
struct RestPull {
    number: u64,
    title: String,
    head: RestRef,
}

#[derive(Debug, Deserialize)]
struct RestRef {
    #[serde(rename = "ref")]
    r#ref: String,
}

/// GitHub review comment response (subset).
#[derive(Debug, Deserialize)]
struct RestReviewComment {
    id: u64,
    node_id: String,
    #[serde(default)]
    user: Option<RestUser>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    line: Option<u64>,
    #[serde(default)]
    start_line: Option<u64>,
    #[serde(default)]
    original_line: Option<u64>,
    #[serde(default)]
    original_start_line: Option<u64>,
    #[serde(default)]
    diff_hunk: Option<String>,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct RestUser {
    login: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_comment_subset_deserializes() {
        let json = r#"{
            "id": 987654321,
            "node_id": "PRRC_kwDOA",
            "user": { "login": "chatgpt-codex-connector[bot]" },
            "path": "src/lib.rs",
            "line": 42,
            "start_line": null,
            "original_line": 40,
            "diff_hunk": "@@ -40,3 +40,4 @@",
            "body": "**Fix this** please",
            "pull_request_review_id": 1
        }"#;

        let raw: RestReviewComment = serde_json::from_str(json).unwrap();
        let comment = ReviewComment::from(raw);
        assert_eq!(comment.id, 987654321);
        assert_eq!(comment.author.as_deref(), Some("chatgpt-codex-connector[bot]"));
        assert_eq!(comment.path.as_deref(), Some("src/lib.rs"));
        assert_eq!(comment.line, Some(42));
        assert_eq!(comment.start_line, None);
        assert_eq!(comment.original_line, Some(40));
        assert_eq!(comment.body, "**Fix this** please");
    }

    #[test]
    fn missing_user_and_anchors_default_to_none() {
        let json = r#"{ "id": 1, "node_id": "x" }"#;
        let raw: RestReviewComment = serde_json::from_str(json).unwrap();
        let comment = ReviewComment::from(raw);
        assert!(comment.author.is_none());
        assert!(comment.path.is_none());
        assert!(comment.line.is_none());
        assert_eq!(comment.body, "");
    }

    #[test]
    fn pull_subset_deserializes_head_ref() {
        let json = r#"{
            "number": 17,
            "title": "Add feature",
            "head": { "ref": "feature/add", "sha": "abc" },
            "state": "open"
        }"#;

        let raw: RestPull = serde_json::from_str(json).unwrap();
        assert_eq!(raw.number, 17);
        assert_eq!(raw.head.r#ref, "feature/add");
    }
}

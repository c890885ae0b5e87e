//! Normalized GitHub entities, reduced to the fields the pipeline consumes.

use std::fmt;

use crate::errors::{GithubError, GithubResult};

/// Identifies one repository as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parses "owner/repo" or returns a validation error.
    pub fn parse(value: &str) -> GithubResult<Self> {
        let mut parts = value.split('/');
        let owner = parts.next().unwrap_or("").trim();
        let repo = parts.next().unwrap_or("").trim();

        if owner.is_empty() || repo.is_empty() || parts.next().is_some() {
            return Err(GithubError::Validation(format!(
                "invalid repository id '{value}', expected 'owner/repo'"
            )));
        }

        Ok(Self::new(owner, repo))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Open pull request (subset).
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    /// Source branch name (`head.ref`); the branch fixes are pushed to.
    pub head_ref: String,
}

/// Inline review comment (subset).
///
/// `line`/`start_line` are the live anchors and may be null when the diff has
/// moved on; the `original_*` fields preserve the anchors at review time.
#[derive(Debug, Clone)]
pub struct ReviewComment {
    /// Stable numeric REST identifier; the ledger key.
    pub id: u64,
    /// GraphQL node id of the comment itself.
    pub node_id: String,
    /// Author login, absent for deleted accounts.
    pub author: Option<String>,
    /// File the comment is anchored to; absent for summary-level comments.
    pub path: Option<String>,
    pub line: Option<u64>,
    pub start_line: Option<u64>,
    pub original_line: Option<u64>,
    pub original_start_line: Option<u64>,
    /// Diff excerpt the comment was left on.
    pub diff_hunk: Option<String>,
    pub body: String,
}

/// Review thread from the graph surface, projected for correlation.
///
/// Threads live in a different identifier space than review comments; the
/// only join key is the first comment's numeric database id.
#[derive(Debug, Clone)]
pub struct ReviewThread {
    /// GraphQL node id, the only handle the resolve mutation accepts.
    pub id: String,
    pub is_resolved: bool,
    pub first_comment_database_id: Option<u64>,
}

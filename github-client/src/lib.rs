//! GitHub surface for the review pipeline (REST v3 + GraphQL v4).
//!
//! Endpoints used (as of 2025):
//!   * GET  /repos/{owner}/{repo}/pulls?state=open&per_page=100
//!   * GET  /repos/{owner}/{repo}/pulls/{number}/comments?per_page=100
//!   * GET  /repos/{owner}/{repo}/pulls/{number}   (unified diff via Accept header)
//!   * GET  /user
//!   * POST /graphql   (reviewThreads query, resolveReviewThread mutation)

pub mod errors;
pub mod types;

mod graphql;
mod rest;

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

pub use errors::{GithubApiError, GithubError, GithubResult};
pub use types::{PullRequest, RepoId, ReviewComment, ReviewThread};

/// Runtime configuration for the client.
///
/// Usually injected from environment by the application shell.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base, e.g. "https://api.github.com".
    pub base_api: String,
    /// Access token (PAT or app token) without scheme prefix.
    pub token: String,
}

/// GitHub HTTP client wrapper.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String,
    token: String, // full header value: "Bearer <token>"
}

impl GitHubClient {
    /// Constructs a client with a shared HTTP instance and auth token.
    ///
    /// The HTTP client carries a stable user agent and bounded timeouts so a
    /// stuck API call can never wedge a poll cycle.
    pub fn from_config(cfg: ClientConfig) -> GithubResult<Self> {
        debug!("Initializing GitHub client: base_api={}", cfg.base_api);

        let http = Client::builder()
            .user_agent("review-responder/0.1")
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(GithubApiError::from)?;

        Ok(Self {
            http,
            base_api: cfg.base_api,
            token: format!("Bearer {}", cfg.token),
        })
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn base_api(&self) -> &str {
        &self.base_api
    }

    pub(crate) fn auth_header(&self) -> &str {
        &self.token
    }
}

//! GraphQL v4 calls: review-thread listing and thread resolution.
//!
//! Review threads are invisible to the REST surface; the only join key back
//! to a REST review comment is the first comment's `databaseId`.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    GitHubClient,
    errors::{GithubApiError, GithubError, GithubResult},
    types::{RepoId, ReviewThread},
};

const REVIEW_THREADS_QUERY: &str = r#"
query($owner: String!, $repo: String!, $pr: Int!) {
  repository(owner: $owner, name: $repo) {
    pullRequest(number: $pr) {
      reviewThreads(first: 100) {
        nodes {
          id
          isResolved
          comments(first: 1) {
            nodes {
              databaseId
            }
          }
        }
      }
    }
  }
}"#;

const RESOLVE_THREAD_MUTATION: &str = r#"
mutation($threadId: ID!) {
  resolveReviewThread(input: { threadId: $threadId }) {
    thread {
      isResolved
    }
  }
}"#;

impl GitHubClient {
    /// Lists review threads with each thread's first-comment database id.
    ///
    /// Capped at the first 100 threads, matching the query above.
    pub async fn list_review_threads(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> GithubResult<Vec<ReviewThread>> {
        debug!("GitHub list_review_threads: repo={}, pr={}", repo, number);

        let data: ThreadsData = self
            .graphql(
                REVIEW_THREADS_QUERY,
                ThreadVars {
                    owner: &repo.owner,
                    repo: &repo.repo,
                    pr: number,
                },
            )
            .await?;

        Ok(normalize_threads(data))
    }

    /// Marks one review thread resolved; returns the server-reported state.
    pub async fn resolve_review_thread(&self, thread_id: &str) -> GithubResult<bool> {
        debug!("GitHub resolve_review_thread: thread_id={}", thread_id);

        let data: ResolveData = self
            .graphql(RESOLVE_THREAD_MUTATION, ResolveVars { thread_id })
            .await?;

        Ok(data
            .resolve_review_thread
            .and_then(|p| p.thread)
            .map(|t| t.is_resolved)
            .unwrap_or(false))
    }

    async fn graphql<V: Serialize, D: DeserializeOwned>(
        &self,
        query: &'static str,
        variables: V,
    ) -> GithubResult<D> {
        let url = format!("{}/graphql", self.base_api());

        let envelope: Envelope<D> = self
            .http()
            .post(url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/vnd.github+json")
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        envelope_data(envelope)
    }
}

fn normalize_threads(data: ThreadsData) -> Vec<ReviewThread> {
    let nodes = data
        .repository
        .and_then(|r| r.pull_request)
        .map(|pr| pr.review_threads.nodes)
        .unwrap_or_default();

    nodes
        .into_iter()
        .map(|n| ReviewThread {
            id: n.id,
            is_resolved: n.is_resolved,
            first_comment_database_id: n
                .comments
                .nodes
                .into_iter()
                .next()
                .and_then(|c| c.database_id),
        })
        .collect()
}

/// GraphQL-level errors arrive with HTTP 200; surface them as one error.
fn envelope_data<D>(envelope: Envelope<D>) -> GithubResult<D> {
    if !envelope.errors.is_empty() {
        let joined = envelope
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(GithubApiError::InvalidResponse(joined).into());
    }

    envelope
        .data
        .ok_or_else(|| GithubError::from(GithubApiError::InvalidResponse("response missing data".into())))
}

// ===== Wire shapes =====

#[derive(Debug, Serialize)]
struct GraphQlRequest<V: Serialize> {
    query: &'static str,
    variables: V,
}

#[derive(Debug, Serialize)]
struct ThreadVars<'a> {
    owner: &'a str,
    repo: &'a str,
    pr: u64,
}

#[derive(Debug, Serialize)]
struct ResolveVars<'a> {
    #[serde(rename = "threadId")]
    thread_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<D> {
    data: Option<D>,
    #[serde(default)]
    errors: Vec<GraphQlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ThreadsData {
    repository: Option<RepositoryData>,
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    #[serde(rename = "pullRequest")]
    pull_request: Option<PullRequestData>,
}

#[derive(Debug, Deserialize)]
struct PullRequestData {
    #[serde(rename = "reviewThreads")]
    review_threads: ThreadConnection,
}

#[derive(Debug, Deserialize)]
struct ThreadConnection {
    nodes: Vec<ThreadNode>,
}

#[derive(Debug, Deserialize)]
struct ThreadNode {
    id: String,
    #[serde(rename = "isResolved")]
    is_resolved: bool,
    comments: CommentConnection,
}

#[derive(Debug, Deserialize)]
struct CommentConnection {
    nodes: Vec<CommentNode>,
}

#[derive(Debug, Deserialize)]
struct CommentNode {
    #[serde(rename = "databaseId")]
    database_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ResolveData {
    #[serde(rename = "resolveReviewThread")]
    resolve_review_thread: Option<ResolvePayload>,
}

#[derive(Debug, Deserialize)]
struct ResolvePayload {
    thread: Option<ResolvedThread>,
}

#[derive(Debug, Deserialize)]
struct ResolvedThread {
    #[serde(rename = "isResolved")]
    is_resolved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threads_envelope_normalizes_to_review_threads() {
        let json = r#"{
            "data": {
                "repository": {
                    "pullRequest": {
                        "reviewThreads": {
                            "nodes": [
                                {
                                    "id": "PRRT_kwDOA1",
                                    "isResolved": false,
                                    "comments": { "nodes": [ { "databaseId": 111 } ] }
                                },
                                {
                                    "id": "PRRT_kwDOA2",
                                    "isResolved": true,
                                    "comments": { "nodes": [] }
                                }
                            ]
                        }
                    }
                }
            }
        }"#;

        let envelope: Envelope<ThreadsData> = serde_json::from_str(json).unwrap();
        let threads = normalize_threads(envelope_data(envelope).unwrap());

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, "PRRT_kwDOA1");
        assert!(!threads[0].is_resolved);
        assert_eq!(threads[0].first_comment_database_id, Some(111));
        assert!(threads[1].is_resolved);
        assert_eq!(threads[1].first_comment_database_id, None);
    }

    #[test]
    fn missing_pull_request_yields_no_threads() {
        let json = r#"{ "data": { "repository": { "pullRequest": null } } }"#;
        let envelope: Envelope<ThreadsData> = serde_json::from_str(json).unwrap();
        assert!(normalize_threads(envelope_data(envelope).unwrap()).is_empty());
    }

    #[test]
    fn graphql_errors_surface_as_invalid_response() {
        let json = r#"{ "data": null, "errors": [ { "message": "Could not resolve" } ] }"#;
        let envelope: Envelope<ThreadsData> = serde_json::from_str(json).unwrap();
        let err = envelope_data(envelope).unwrap_err();
        assert!(err.to_string().contains("Could not resolve"), "{err}");
    }

    #[test]
    fn resolve_payload_reports_thread_state() {
        let json = r#"{
            "data": {
                "resolveReviewThread": { "thread": { "isResolved": true } }
            }
        }"#;
        let envelope: Envelope<ResolveData> = serde_json::from_str(json).unwrap();
        let data = envelope_data(envelope).unwrap();
        let resolved = data
            .resolve_review_thread
            .and_then(|p| p.thread)
            .map(|t| t.is_resolved)
            .unwrap_or(false);
        assert!(resolved);
    }

    #[test]
    fn request_serializes_variables_in_camel_case() {
        let req = GraphQlRequest {
            query: RESOLVE_THREAD_MUTATION,
            variables: ResolveVars {
                thread_id: "PRRT_x",
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["variables"]["threadId"], "PRRT_x");
        assert!(json["query"].as_str().unwrap().contains("resolveReviewThread"));
    }
}

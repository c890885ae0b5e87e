//! Review-thread resolution across disjoint identifier spaces.
//!
//! REST review comments and GraphQL review threads do not share identifiers;
//! the only join key is a thread's first comment `databaseId`. The thread
//! list is re-fetched per comment (threads can appear between calls) and
//! linearly scanned, bounded by the per-PR thread count.
//!
//! Resolution is a soft step: every failure path logs a warning and reports
//! `false`. It never fails the pipeline, and the ledger outcome is recorded
//! either way.

use github_client::{GitHubClient, RepoId, ReviewThread};
use tracing::{info, warn};

/// Thread whose first comment carries the given REST database id.
pub fn find_thread_for_comment(threads: &[ReviewThread], comment_id: u64) -> Option<&ReviewThread> {
    threads
        .iter()
        .find(|t| t.first_comment_database_id == Some(comment_id))
}

/// Resolves the thread the given comment opened.
///
/// Returns the server-reported resolved state, or `false` when the thread
/// cannot be correlated or the mutation fails.
pub async fn resolve_comment_thread(
    client: &GitHubClient,
    repo: &RepoId,
    pr_number: u64,
    comment_id: u64,
) -> bool {
    let threads = match client.list_review_threads(repo, pr_number).await {
        Ok(threads) => threads,
        Err(e) => {
            warn!(comment_id, error = %e, "failed to list review threads");
            return false;
        }
    };

    let Some(thread) = find_thread_for_comment(&threads, comment_id) else {
        warn!(comment_id, "no review thread found to resolve");
        return false;
    };

    match client.resolve_review_thread(&thread.id).await {
        Ok(resolved) => {
            info!(comment_id, thread_id = %thread.id, resolved, "review thread resolved");
            resolved
        }
        Err(e) => {
            warn!(comment_id, thread_id = %thread.id, error = %e, "failed to resolve review thread");
            false
        }
    }
}

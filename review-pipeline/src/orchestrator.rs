//! Poll orchestration: repositories → open pull requests → actionable comments.
//!
//! Strictly sequential by design: every comment's pipeline mutates a
//! repository-scoped workspace directory, so there is no parallel fan-out.
//! Cancellation is observed at iteration boundaries only (repository, pull
//! request, comment); an in-flight pipeline step always runs to completion so
//! a half-applied fix is never abandoned uncommitted.
//!
//! Discovery failures (listing PRs or comments) are transient: logged, the
//! repository or pull request is skipped for this cycle, nothing is written
//! to the ledger. Everything inside one comment's pipeline is terminal and
//! recorded exactly once.

use github_client::{GitHubClient, PullRequest, RepoId, ReviewComment};
use repo_workspace::WorkspaceManager;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::classify;
use crate::errors::PipelineResult;
use crate::executor::FixExecutor;
use crate::ledger::Ledger;
use crate::resolver;
use crate::types::{CycleStats, FixOutcome, FixReport, LedgerEntry, TaskDescriptor};

/// Drives poll cycles over a fixed set of repositories.
pub struct Orchestrator<L: Ledger> {
    client: GitHubClient,
    workspaces: WorkspaceManager,
    executor: FixExecutor,
    ledger: L,
    bot_login: String,
}

impl<L: Ledger> Orchestrator<L> {
    pub fn new(
        client: GitHubClient,
        workspaces: WorkspaceManager,
        executor: FixExecutor,
        ledger: L,
        bot_login: impl Into<String>,
    ) -> Self {
        Self {
            client,
            workspaces,
            executor,
            ledger,
            bot_login: bot_login.into(),
        }
    }

    /// Runs one full poll cycle and returns the outcome tallies.
    ///
    /// Only a ledger-write failure aborts the cycle; discovery failures skip
    /// the affected repository or pull request and the cycle keeps going.
    pub async fn poll_once(
        &mut self,
        repos: &[RepoId],
        cancel: &CancellationToken,
    ) -> PipelineResult<CycleStats> {
        let mut stats = CycleStats::default();

        for repo in repos {
            if cancel.is_cancelled() {
                break;
            }
            info!(repo = %repo, "checking repository");

            let prs = match self.client.list_open_pull_requests(repo).await {
                Ok(prs) => prs,
                Err(e) => {
                    error!(repo = %repo, error = %e, "failed to list open pull requests");
                    continue;
                }
            };
            info!(repo = %repo, count = prs.len(), "open pull requests");

            for pr in &prs {
                if cancel.is_cancelled() {
                    break;
                }

                let comments = match self.client.list_review_comments(repo, pr.number).await {
                    Ok(comments) => comments,
                    Err(e) => {
                        error!(repo = %repo, pr = pr.number, error = %e, "failed to list review comments");
                        continue;
                    }
                };

                let candidates = bot_candidates(comments, &self.bot_login);
                self.process_candidates(repo, pr, candidates, cancel, &mut stats)
                    .await?;
            }
        }

        Ok(stats)
    }

    /// Runs the pipeline for every not-yet-processed candidate of one PR.
    async fn process_candidates(
        &mut self,
        repo: &RepoId,
        pr: &PullRequest,
        candidates: Vec<ReviewComment>,
        cancel: &CancellationToken,
        stats: &mut CycleStats,
    ) -> PipelineResult<()> {
        for comment in candidates {
            if cancel.is_cancelled() {
                break;
            }
            if self.ledger.has_processed(comment.id) {
                debug!(comment_id = comment.id, "already processed");
                continue;
            }

            let Some(task) = classify::classify(&comment) else {
                continue;
            };

            stats.processed += 1;
            let outcome = self.run_task(repo, pr, task).await?;
            stats.tally(outcome);
        }

        Ok(())
    }

    /// One comment start to finish; the ledger entry is written before return.
    async fn run_task(
        &mut self,
        repo: &RepoId,
        pr: &PullRequest,
        task: TaskDescriptor,
    ) -> PipelineResult<FixOutcome> {
        info!(
            comment_id = task.comment_id,
            repo = %repo,
            pr = pr.number,
            file = %task.path,
            line = ?task.line,
            title = %task.title,
            priority = %task.priority,
            "processing review comment"
        );

        let report = match self.prepare_and_apply(repo, pr, &task).await {
            Ok(report) => report,
            Err(e) => {
                error!(comment_id = task.comment_id, error = %e, "workspace preparation failed");
                FixReport::failure(e.to_string())
            }
        };

        let resolved = if report.outcome.is_fixed() {
            resolver::resolve_comment_thread(&self.client, repo, pr.number, task.comment_id).await
        } else {
            false
        };

        let outcome = report.outcome;
        let branch = outcome.is_fixed().then(|| pr.head_ref.clone());
        self.ledger
            .record(task.comment_id, LedgerEntry::new(report, resolved, branch))
            .await?;

        Ok(outcome)
    }

    /// Brings the workspace to the PR branch tip and hands it to the executor.
    async fn prepare_and_apply(
        &self,
        repo: &RepoId,
        pr: &PullRequest,
        task: &TaskDescriptor,
    ) -> PipelineResult<FixReport> {
        let workdir = self.workspaces.ensure(&repo.owner, &repo.repo).await?;
        self.workspaces.checkout(&workdir, &pr.head_ref).await?;
        Ok(self
            .executor
            .apply(&self.workspaces, &workdir, &pr.head_ref, task)
            .await)
    }
}

/// Comments from the designated reviewer identity that pass the
/// actionability filter.
fn bot_candidates(comments: Vec<ReviewComment>, bot_login: &str) -> Vec<ReviewComment> {
    comments
        .into_iter()
        .filter(|c| c.author.as_deref() == Some(bot_login))
        .filter(classify::is_actionable)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::JsonFileLedger;
    use crate::types::FixOutcome;
    use fix_agent::{AgentConfig, FixAgentService};
    use github_client::ClientConfig;
    use std::time::Duration;
    use tempfile::TempDir;

    const BOT: &str = "chatgpt-codex-connector[bot]";

    fn comment(id: u64, author: &str, path: Option<&str>, body: &str) -> ReviewComment {
        ReviewComment {
            id,
            node_id: format!("PRRC_{id}"),
            author: Some(author.into()),
            path: path.map(Into::into),
            line: Some(3),
            start_line: None,
            original_line: None,
            original_start_line: None,
            diff_hunk: None,
            body: body.into(),
        }
    }

    fn pull_request() -> PullRequest {
        PullRequest {
            number: 5,
            title: "Add login flow".into(),
            head_ref: "feature".into(),
        }
    }

    /// Client pointed at an unroutable address; any attempted call fails.
    fn offline_client() -> GitHubClient {
        GitHubClient::from_config(ClientConfig {
            base_api: "http://127.0.0.1:1".into(),
            token: "test-token".into(),
        })
        .unwrap()
    }

    async fn orchestrator(
        clone_base: &std::path::Path,
        state_dir: &std::path::Path,
    ) -> Orchestrator<JsonFileLedger> {
        Orchestrator::new(
            offline_client(),
            WorkspaceManager::new(clone_base),
            FixExecutor::new(FixAgentService::new(AgentConfig::new(
                "/nonexistent/agent",
                Duration::from_secs(1),
            ))),
            JsonFileLedger::open(state_dir).await.unwrap(),
            BOT,
        )
    }

    #[test]
    fn candidates_filter_identity_and_actionability() {
        let comments = vec![
            comment(1, BOT, Some("src/a.rs"), "**Fix** the guard"),
            comment(2, "human-reviewer", Some("src/a.rs"), "**Fix** this too"),
            comment(3, BOT, None, "**Summary** overall fine"),
            comment(4, BOT, Some("src/b.rs"), "LGTM"),
        ];

        let kept = bot_candidates(comments, BOT);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 1);
    }

    #[tokio::test]
    async fn processed_comments_never_reenter_the_pipeline() {
        let clones = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let mut orch = orchestrator(clones.path(), state.path()).await;

        orch.ledger
            .record(
                42,
                LedgerEntry::new(FixReport::outcome(FixOutcome::Fixed), true, None),
            )
            .await
            .unwrap();

        let mut stats = CycleStats::default();
        let cancel = CancellationToken::new();
        orch.process_candidates(
            &RepoId::new("octo", "hello"),
            &pull_request(),
            vec![comment(42, BOT, Some("src/a.rs"), "**Fix** the guard")],
            &cancel,
            &mut stats,
        )
        .await
        .unwrap();

        assert_eq!(stats, CycleStats::default());
        // The workspace manager was never touched.
        assert!(!clones.path().join("octo--hello").exists());
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_next_comment() {
        let clones = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let mut orch = orchestrator(clones.path(), state.path()).await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut stats = CycleStats::default();
        orch.process_candidates(
            &RepoId::new("octo", "hello"),
            &pull_request(),
            vec![
                comment(1, BOT, Some("src/a.rs"), "**Fix** one"),
                comment(2, BOT, Some("src/b.rs"), "**Fix** two"),
            ],
            &cancel,
            &mut stats,
        )
        .await
        .unwrap();

        assert_eq!(stats.processed, 0);
        let reopened = JsonFileLedger::open(state.path()).await.unwrap();
        assert!(reopened.is_empty());
    }

    #[tokio::test]
    async fn cancelled_cycle_returns_without_touching_the_network() {
        let state = TempDir::new().unwrap();
        let clones = TempDir::new().unwrap();
        let mut orch = orchestrator(clones.path(), state.path()).await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let started = std::time::Instant::now();
        let stats = orch
            .poll_once(&[RepoId::new("octo", "hello")], &cancel)
            .await
            .unwrap();

        assert_eq!(stats, CycleStats::default());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn failed_workspace_preparation_is_recorded_as_error() {
        let clones = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        // A leftover directory that is not a git repository, so the fetch
        // path fails fast without touching any remote.
        std::fs::create_dir_all(clones.path().join("octo--hello")).unwrap();

        let mut orch = orchestrator(clones.path(), state.path()).await;
        let mut stats = CycleStats::default();
        let cancel = CancellationToken::new();
        orch.process_candidates(
            &RepoId::new("octo", "hello"),
            &pull_request(),
            vec![comment(7, BOT, Some("src/a.rs"), "**Fix** the guard")],
            &cancel,
            &mut stats,
        )
        .await
        .unwrap();

        assert_eq!(stats.processed, 1);
        assert_eq!(stats.errors, 1);

        let reopened = JsonFileLedger::open(state.path()).await.unwrap();
        assert!(reopened.has_processed(7));
        let raw = std::fs::read_to_string(reopened.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["processed"]["7"]["outcome"], "error:agent_failure");
        assert_eq!(value["processed"]["7"]["resolved"], false);
    }
}

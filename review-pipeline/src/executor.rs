//! Fix execution against a prepared workspace.
//!
//! One task at a time: check the target file, run the agent under its
//! deadline, inspect the working tree, then commit and push. Every failure
//! mode maps to a terminal [`FixReport`]; `apply` itself never errors, so one
//! bad comment can never abort a poll cycle.

use std::path::Path;

use fix_agent::{FixAgentService, FixRequest};
use repo_workspace::WorkspaceManager;
use tracing::{error, info, warn};

use crate::types::{FixOutcome, FixReport, TaskDescriptor};

/// Runs fix tasks through the external agent and owns the commit/push step.
///
/// The agent only ever edits files; committing and pushing stay here so a
/// misbehaving agent cannot publish anything on its own.
#[derive(Debug, Clone)]
pub struct FixExecutor {
    agent: FixAgentService,
}

impl FixExecutor {
    pub fn new(agent: FixAgentService) -> Self {
        Self { agent }
    }

    /// Applies one task inside `workdir`, already checked out at `branch`.
    pub async fn apply(
        &self,
        workspaces: &WorkspaceManager,
        workdir: &Path,
        branch: &str,
        task: &TaskDescriptor,
    ) -> FixReport {
        // The agent is never invoked for a file the workspace does not have.
        let target = workdir.join(&task.path);
        let is_file = tokio::fs::metadata(&target)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            warn!(path = %task.path, branch, "file not found in workspace");
            return FixReport::outcome(FixOutcome::FileNotFound);
        }

        let request = FixRequest {
            path: task.path.clone(),
            title: task.title.clone(),
            priority: task.priority.to_string(),
            line: task.line,
            start_line: task.start_line,
            description: task.description.clone(),
            diff_hunk: task.diff_hunk.clone(),
        };

        let output = match self.agent.run(&request, workdir).await {
            Ok(output) => output,
            Err(e) => {
                error!(comment_id = task.comment_id, error = %e, "fix agent failed");
                return FixReport::failure(e.to_string());
            }
        };
        info!(
            comment_id = task.comment_id,
            output_len = output.len(),
            "fix agent completed"
        );

        let dirty = match workspaces.is_dirty(workdir).await {
            Ok(dirty) => dirty,
            Err(e) => {
                warn!(error = %e, "status check failed, treating tree as unchanged");
                false
            }
        };
        if !dirty {
            warn!(comment_id = task.comment_id, "agent made no file changes");
            return FixReport::outcome(FixOutcome::NoChanges);
        }

        let message = commit_message(task);
        if let Err(e) = workspaces.commit_all(workdir, &message).await {
            error!(comment_id = task.comment_id, error = %e, "commit failed");
            return FixReport::failure(format!("commit failed: {e}"));
        }
        if let Err(e) = workspaces.push(workdir, branch).await {
            error!(comment_id = task.comment_id, error = %e, branch, "push failed");
            return FixReport::failure(format!("push failed: {e}"));
        }

        info!(comment_id = task.comment_id, branch, commit = %message, "pushed fix");
        FixReport {
            outcome: FixOutcome::Fixed,
            detail: None,
            commit: Some(message),
        }
    }
}

/// Commit message summarizing the fix: the task title, or the leading 60
/// characters of the description when the title is empty.
fn commit_message(task: &TaskDescriptor) -> String {
    let summary = if task.title.is_empty() {
        task.description.chars().take(60).collect::<String>()
    } else {
        task.title.clone()
    };
    format!("fix: address review comment — {summary}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;
    use git2::{Repository, Signature};
    use std::fs;
    use tempfile::TempDir;

    fn sig() -> Signature<'static> {
        Signature::now("tester", "tester@localhost").unwrap()
    }

    fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> git2::Oid {
        let workdir = repo.workdir().unwrap();
        fs::write(workdir.join(name), content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig(), &sig(), message, &tree, &parents)
            .unwrap()
    }

    /// Bare origin with a `feature` branch plus a clone checked out on it.
    fn origin_and_clone() -> (TempDir, TempDir) {
        let seed = TempDir::new().unwrap();
        let seed_repo = Repository::init(seed.path()).unwrap();
        commit_file(&seed_repo, "a.txt", "one\n", "init");
        let tip = seed_repo.head().unwrap().peel_to_commit().unwrap();
        seed_repo.branch("feature", &tip, false).unwrap();

        let origin = TempDir::new().unwrap();
        let origin_repo = Repository::init_bare(origin.path()).unwrap();
        seed_repo
            .remote("origin", origin.path().to_str().unwrap())
            .unwrap();
        seed_repo
            .find_remote("origin")
            .unwrap()
            .push(&["refs/heads/feature:refs/heads/feature"], None)
            .unwrap();
        origin_repo.set_head("refs/heads/feature").unwrap();

        let clone = TempDir::new().unwrap();
        let clone_into = clone.path().join("work");
        Repository::clone(origin.path().to_str().unwrap(), &clone_into).unwrap();
        (origin, clone)
    }

    #[cfg(unix)]
    fn fake_agent(dir: &Path, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("agent.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn task(path: &str) -> TaskDescriptor {
        TaskDescriptor {
            comment_id: 42,
            node_id: "PRRC_x".into(),
            path: path.into(),
            line: Some(1),
            start_line: None,
            diff_hunk: None,
            title: "Tighten the guard".into(),
            description: "The check happens after the dereference.".into(),
            priority: Priority::P1,
        }
    }

    fn executor(bin: impl Into<std::path::PathBuf>) -> FixExecutor {
        FixExecutor::new(FixAgentService::new(fix_agent::AgentConfig::new(
            bin,
            std::time::Duration::from_secs(10),
        )))
    }

    #[test]
    fn commit_message_prefers_title() {
        let with_title = task("a.txt");
        assert_eq!(
            commit_message(&with_title),
            "fix: address review comment — Tighten the guard"
        );

        let mut untitled = task("a.txt");
        untitled.title.clear();
        untitled.description = "x".repeat(100);
        let message = commit_message(&untitled);
        assert!(message.ends_with(&"x".repeat(60)));
        assert_eq!(message.chars().count(), "fix: address review comment — ".chars().count() + 60);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_file_skips_without_invoking_agent() {
        let (_origin, clone) = origin_and_clone();
        let workdir = clone.path().join("work");
        let bin = fake_agent(clone.path(), "touch invoked.marker");
        let workspaces = WorkspaceManager::new(clone.path());

        let report = executor(&bin)
            .apply(&workspaces, &workdir, "feature", &task("missing.txt"))
            .await;

        assert_eq!(report.outcome, FixOutcome::FileNotFound);
        assert!(!workdir.join("invoked.marker").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn untouched_tree_reports_no_changes() {
        let (_origin, clone) = origin_and_clone();
        let workdir = clone.path().join("work");
        let bin = fake_agent(clone.path(), "cat >/dev/null");
        let workspaces = WorkspaceManager::new(clone.path());

        let repo = Repository::open(&workdir).unwrap();
        let before = repo.head().unwrap().peel_to_commit().unwrap().id();

        let report = executor(&bin)
            .apply(&workspaces, &workdir, "feature", &task("a.txt"))
            .await;

        assert_eq!(report.outcome, FixOutcome::NoChanges);
        assert_eq!(repo.head().unwrap().peel_to_commit().unwrap().id(), before);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn edited_tree_is_committed_and_pushed() {
        let (origin, clone) = origin_and_clone();
        let workdir = clone.path().join("work");
        let bin = fake_agent(clone.path(), "cat >/dev/null\necho fixed >> a.txt");
        let workspaces = WorkspaceManager::new(clone.path());

        let report = executor(&bin)
            .apply(&workspaces, &workdir, "feature", &task("a.txt"))
            .await;

        assert_eq!(report.outcome, FixOutcome::Fixed);
        let message = report.commit.unwrap();
        assert!(message.starts_with("fix: address review comment"), "{message}");

        let origin_repo = Repository::open(origin.path()).unwrap();
        let pushed = origin_repo
            .find_reference("refs/heads/feature")
            .unwrap()
            .peel_to_commit()
            .unwrap();
        assert_eq!(pushed.message(), Some(message.as_str()));

        let repo = Repository::open(&workdir).unwrap();
        assert_eq!(repo.head().unwrap().peel_to_commit().unwrap().id(), pushed.id());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn agent_failure_is_terminal_with_detail() {
        let (_origin, clone) = origin_and_clone();
        let workdir = clone.path().join("work");
        let bin = fake_agent(clone.path(), "cat >/dev/null\necho boom >&2\nexit 2");
        let workspaces = WorkspaceManager::new(clone.path());

        let report = executor(&bin)
            .apply(&workspaces, &workdir, "feature", &task("a.txt"))
            .await;

        assert_eq!(report.outcome, FixOutcome::AgentFailure);
        let detail = report.detail.unwrap();
        assert!(detail.contains("status 2"), "{detail}");
    }
}

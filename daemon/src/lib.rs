//! Process shell for the review responder.
//!
//! Owns everything outside the pipeline itself: flag parsing, environment
//! configuration, startup preflight, signal handling and the poll loop.

use std::error::Error;
use std::time::Duration;

mod config;
mod notify;

use clap::Parser;
use fix_agent::{AgentConfig, FixAgentService};
use github_client::{ClientConfig, GitHubClient, RepoId};
use repo_workspace::WorkspaceManager;
use review_pipeline::{FixExecutor, JsonFileLedger, Ledger, Orchestrator};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use config::{AppConfig, ConfigError};

/// Command-line surface; all credentials and tuning come from environment.
#[derive(Debug, Parser)]
#[command(
    name = "review-responder",
    about = "Applies automated review-bot comments to open pull requests",
    version
)]
struct Flags {
    /// Run a single poll cycle and exit.
    #[arg(long)]
    once: bool,

    /// Restrict this run to one configured repository (owner/name).
    #[arg(long)]
    repo: Option<String>,
}

/// Boots the daemon and runs it until completion or shutdown signal.
pub async fn start() -> Result<(), Box<dyn Error>> {
    let flags = Flags::parse();
    let cfg = AppConfig::from_env()?;
    let repos = select_repos(&cfg.repos, flags.repo.as_deref())?;

    let client = GitHubClient::from_config(ClientConfig {
        base_api: cfg.api_base.clone(),
        token: cfg.github_token.clone(),
    })?;
    let agent = FixAgentService::new(AgentConfig::from_env()?);
    let ledger = JsonFileLedger::open(&cfg.state_dir).await?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        repos = %cfg
            .repos
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        poll_interval_secs = cfg.poll_interval.as_secs(),
        once = flags.once,
        repo_filter = flags.repo.as_deref().unwrap_or("-"),
        state_file = %ledger.path().display(),
        processed_count = ledger.len(),
        "review responder starting"
    );

    preflight(&client, &agent).await?;

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    let mut orchestrator = Orchestrator::new(
        client,
        WorkspaceManager::new(&cfg.clone_base),
        FixExecutor::new(agent),
        ledger,
        cfg.bot_login.clone(),
    );

    if flags.once {
        let stats = orchestrator.poll_once(&repos, &cancel).await?;
        info!(
            processed = stats.processed,
            fixed = stats.fixed,
            skipped = stats.skipped,
            errors = stats.errors,
            "single poll complete"
        );

        if let (Some(token), Some(chat_id)) = (&cfg.telegram_bot_token, &cfg.telegram_chat_id) {
            if stats.processed > 0 {
                notify::send_telegram(token, chat_id, &notify::summary_message(&stats)).await;
            }
        }
    } else {
        poll_loop(&mut orchestrator, &repos, cfg.poll_interval, &cancel).await;
        info!("shutting down");
    }

    Ok(())
}

/// Applies the `--repo` flag to the configured repository list.
fn select_repos(configured: &[RepoId], filter: Option<&str>) -> Result<Vec<RepoId>, Box<dyn Error>> {
    let Some(filter) = filter else {
        return Ok(configured.to_vec());
    };

    let wanted = RepoId::parse(filter)?;
    let selected: Vec<RepoId> = configured.iter().filter(|r| **r == wanted).cloned().collect();
    if selected.is_empty() {
        warn!(repo = %wanted, "repository filter matches nothing in REVIEW_RESPONDER_REPOS");
    }
    Ok(selected)
}

/// Verifies the fix agent binary and the GitHub token before polling.
async fn preflight(client: &GitHubClient, agent: &FixAgentService) -> Result<(), Box<dyn Error>> {
    match agent.version().await {
        Ok(version) => info!(version = %version, "preflight: fix agent"),
        Err(e) => {
            error!(error = %e, "preflight failed: fix agent unavailable");
            return Err(e.into());
        }
    }

    match client.authenticated_login().await {
        Ok(login) => info!(login = %login, "preflight: github auth"),
        Err(e) => {
            error!(error = %e, "preflight failed: github authentication");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Polls forever with an interruptible pause between cycles.
///
/// A failed cycle is logged and the loop keeps going; the quiet case
/// (nothing processed) stays out of the log.
async fn poll_loop<L: Ledger>(
    orchestrator: &mut Orchestrator<L>,
    repos: &[RepoId],
    interval: Duration,
    cancel: &CancellationToken,
) {
    info!("starting poll loop");

    while !cancel.is_cancelled() {
        match orchestrator.poll_once(repos, cancel).await {
            Ok(stats) if stats.processed > 0 => info!(
                processed = stats.processed,
                fixed = stats.fixed,
                skipped = stats.skipped,
                errors = stats.errors,
                "poll cycle complete"
            ),
            Ok(_) => {}
            Err(e) => error!(error = %e, "poll cycle failed"),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// Cancels the token once SIGINT or SIGTERM arrives.
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("shutdown signal received");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable, handling Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Vec<RepoId> {
        vec![
            RepoId::new("octo", "hello"),
            RepoId::new("octo", "world"),
        ]
    }

    #[test]
    fn no_filter_keeps_every_configured_repo() {
        let repos = select_repos(&configured(), None).unwrap();
        assert_eq!(repos.len(), 2);
    }

    #[test]
    fn filter_narrows_to_one_repo() {
        let repos = select_repos(&configured(), Some("octo/world")).unwrap();
        assert_eq!(repos, vec![RepoId::new("octo", "world")]);
    }

    #[test]
    fn filter_outside_configured_set_selects_nothing() {
        let repos = select_repos(&configured(), Some("other/repo")).unwrap();
        assert!(repos.is_empty());
    }

    #[test]
    fn malformed_filter_is_an_error() {
        assert!(select_repos(&configured(), Some("not-a-repo")).is_err());
    }
}

//! Daemon configuration, loaded strictly from environment variables.
//!
//! # Env
//! - `GITHUB_TOKEN` (required) PAT used for REST, GraphQL and git pushes.
//! - `REVIEW_RESPONDER_REPOS` (required) comma-separated `owner/name` list.
//! - `REVIEW_RESPONDER_BOT_LOGIN` review bot whose comments are picked up.
//! - `REVIEW_RESPONDER_CLONE_BASE` directory holding local clones.
//! - `REVIEW_RESPONDER_STATE_DIR` directory holding the processed-comment ledger.
//! - `REVIEW_RESPONDER_POLL_INTERVAL_SECS` pause between poll cycles.
//! - `GITHUB_API_BASE` REST/GraphQL endpoint, override for GHE.
//! - `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID` optional summary notifications.
//!
//! # Defaults
//! - bot login: `chatgpt-codex-connector[bot]`
//! - clone base: `/tmp/review-responder`
//! - state dir: `$HOME/.review-responder`
//! - poll interval: 60 seconds
//! - API base: `https://api.github.com`

use std::path::{Path, PathBuf};
use std::time::Duration;

use github_client::RepoId;
use thiserror::Error;

const DEFAULT_BOT_LOGIN: &str = "chatgpt-codex-connector[bot]";
const DEFAULT_CLONE_BASE: &str = "/tmp/review-responder";
const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Environment-validation errors raised at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("[Daemon] Missing required env var: {0}")]
    MissingVar(&'static str),

    #[error("[Daemon] Invalid number in {var}: {reason}")]
    InvalidNumber { var: &'static str, reason: String },

    #[error("[Daemon] Invalid repository list: {0}")]
    InvalidRepos(String),
}

/// Fully-resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub github_token: String,
    pub api_base: String,
    pub repos: Vec<RepoId>,
    pub bot_login: String,
    pub clone_base: PathBuf,
    pub state_dir: PathBuf,
    pub poll_interval: Duration,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl AppConfig {
    /// Reads and validates the full configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a required variable is absent, a numeric
    /// variable does not parse, or the repository list is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let github_token = must_env("GITHUB_TOKEN")?;
        let repos = parse_repos(&must_env("REVIEW_RESPONDER_REPOS")?)?;

        Ok(Self {
            github_token,
            api_base: env_or("GITHUB_API_BASE", DEFAULT_API_BASE),
            repos,
            bot_login: env_or("REVIEW_RESPONDER_BOT_LOGIN", DEFAULT_BOT_LOGIN),
            clone_base: PathBuf::from(env_or("REVIEW_RESPONDER_CLONE_BASE", DEFAULT_CLONE_BASE)),
            state_dir: env_path_or("REVIEW_RESPONDER_STATE_DIR", default_state_dir),
            poll_interval: Duration::from_secs(env_u64_or(
                "REVIEW_RESPONDER_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            telegram_bot_token: env_opt("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: env_opt("TELEGRAM_CHAT_ID"),
        })
    }
}

/// Splits a comma-separated `owner/name` list into repository identifiers.
pub(crate) fn parse_repos(raw: &str) -> Result<Vec<RepoId>, ConfigError> {
    let mut repos = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = RepoId::parse(part).map_err(|e| ConfigError::InvalidRepos(e.to_string()))?;
        repos.push(id);
    }
    if repos.is_empty() {
        return Err(ConfigError::InvalidRepos(
            "no repositories configured".to_string(),
        ));
    }
    Ok(repos)
}

fn must_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_path_or(name: &str, default: fn() -> PathBuf) -> PathBuf {
    env_opt(name).map(PathBuf::from).unwrap_or_else(default)
}

fn env_u64_or(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env_opt(name) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber {
            var: name,
            reason: format!("expected an integer, got {raw:?}"),
        }),
        None => Ok(default),
    }
}

fn default_state_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) if !home.trim().is_empty() => Path::new(&home).join(".review-responder"),
        _ => PathBuf::from(".review-responder"),
    }
}

//! Crate-wide error hierarchy for review-pipeline.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - Transparent wrapping of collaborator errors (hosting API, workspace,
//!   fix agent, ledger store) so `?` composes across crate boundaries.
//! - No dynamic dispatch, no async-trait.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type PipelineResult<T> = Result<T, Error>;

/// Root error type for the review-pipeline crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Hosting-platform API failure (REST or GraphQL surface).
    #[error(transparent)]
    Github(#[from] github_client::GithubError),

    /// Local git workspace failure (clone/fetch/checkout/commit/push).
    #[error(transparent)]
    Workspace(#[from] repo_workspace::errors::WorkspaceError),

    /// Fix-agent subprocess failure (spawn/timeout/non-zero exit).
    #[error(transparent)]
    Agent(#[from] fix_agent::AgentError),

    /// Ledger store (file I/O / JSON) failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Input validation errors (bad repository ids, etc.).
    #[error("validation error: {0}")]
    Validation(String),

    /// Generic catch-all error when nothing else fits.
    #[error("other error: {0}")]
    Other(String),
}

/// Ledger store related errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

// ===== Conversions for `?` ergonomics =====

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Ledger(LedgerError::Io(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Ledger(LedgerError::Serde(e))
    }
}

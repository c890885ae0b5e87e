//! Unified error handling for `fix-agent`.
//!
//! One top-level [`AgentError`] for the whole crate, with configuration
//! errors grouped in a nested [`ConfigError`] enum. All messages include the
//! prefix `[Fix Agent]` to simplify attribution in logs.

use std::time::Duration;
use thiserror::Error;

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Top-level error for the `fix-agent` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AgentError {
    /// Configuration/validation errors (startup/readiness).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failed to spawn the subprocess or talk to its pipes.
    #[error("[Fix Agent] subprocess I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The agent did not finish before the wall-clock deadline and was killed.
    #[error("[Fix Agent] agent timed out after {0:?}")]
    Timeout(Duration),

    /// The agent terminated on its own with a non-zero status.
    #[error("[Fix Agent] agent exited with status {code}: {snippet}")]
    NonZeroExit {
        /// Process exit code (`-1` when terminated by a signal).
        code: i32,
        /// Short snippet of the captured stderr (trimmed).
        snippet: String,
    },
}

impl AgentError {
    /// True for the deadline-kill case, which callers report separately.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentError::Timeout(_))
    }
}

/// Error enum for environment-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A number failed to parse (like the per-invocation timeout).
    #[error("[Fix Agent] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `FIX_AGENT_TIMEOUT_SECS`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u64 seconds`).
        reason: &'static str,
    },
}

//! Fix-agent configuration loaded strictly from environment variables.
//!
//! # Environment variables
//!
//! - `FIX_AGENT_BIN`          = path to the agent binary (default: `/usr/bin/claude`)
//! - `FIX_AGENT_TIMEOUT_SECS` = hard wall-clock deadline per invocation (default: 300)

use std::{path::PathBuf, time::Duration};

use crate::errors::{ConfigError, Result};

/// Default agent binary when `FIX_AGENT_BIN` is unset.
pub const DEFAULT_AGENT_BIN: &str = "/usr/bin/claude";

/// Default per-invocation deadline when `FIX_AGENT_TIMEOUT_SECS` is unset.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Settings for one agent binary: where it lives and how long a single
/// invocation may run before it is killed.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub bin: PathBuf,
    pub timeout: Duration,
}

impl AgentConfig {
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    /// Builds the config from environment.
    ///
    /// # Env
    /// - `FIX_AGENT_BIN` (optional)
    /// - `FIX_AGENT_TIMEOUT_SECS` (optional)
    ///
    /// # Defaults
    /// - `bin = /usr/bin/claude`
    /// - `timeout = 300s`
    ///
    /// # Errors
    /// [`ConfigError::InvalidNumber`] if `FIX_AGENT_TIMEOUT_SECS` is set but
    /// not a valid `u64`.
    pub fn from_env() -> Result<Self> {
        let bin = std::env::var("FIX_AGENT_BIN")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AGENT_BIN));

        let timeout_secs = match std::env::var("FIX_AGENT_TIMEOUT_SECS") {
            Ok(v) if !v.trim().is_empty() => {
                v.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                    var: "FIX_AGENT_TIMEOUT_SECS",
                    reason: "expected u64 seconds",
                })?
            }
            _ => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            bin,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

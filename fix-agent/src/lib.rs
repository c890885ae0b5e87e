//! External fix-agent invocation under a hard deadline.
//!
//! The agent (a `claude`-style CLI) is treated as a black box:
//!
//! - one subprocess per request, scoped to a workspace directory;
//! - instruction payload on stdin, stdout captured, stderr captured for
//!   diagnostics;
//! - wall-clock deadline with forced kill, reported as [`AgentError::Timeout`];
//! - non-zero exits reported as [`AgentError::NonZeroExit`] with a stderr
//!   snippet.
//!
//! The agent edits files in the working directory as its side effect; it is
//! told explicitly not to commit or push, the caller owns those steps.

use std::{path::Path, process::Stdio, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::Command,
};
use tracing::{debug, instrument, warn};

pub mod config;
pub mod errors;
pub mod request;

pub use config::AgentConfig;
pub use errors::{AgentError, Result};
pub use request::FixRequest;

/// Runs a configured agent binary against a workspace, one request at a time.
#[derive(Debug, Clone)]
pub struct FixAgentService {
    cfg: AgentConfig,
}

impl FixAgentService {
    pub fn new(cfg: AgentConfig) -> Self {
        Self { cfg }
    }

    /// Identity probe for startup preflight (`<bin> --version`, 10 s cap).
    pub async fn version(&self) -> Result<String> {
        const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

        let output = tokio::time::timeout(
            PROBE_TIMEOUT,
            Command::new(&self.cfg.bin).arg("--version").output(),
        )
        .await
        .map_err(|_| AgentError::Timeout(PROBE_TIMEOUT))??;

        if !output.status.success() {
            let snippet = String::from_utf8_lossy(&output.stderr)
                .trim()
                .chars()
                .take(240)
                .collect::<String>();
            return Err(AgentError::NonZeroExit {
                code: output.status.code().unwrap_or(-1),
                snippet,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Runs one fix request to completion and returns the agent's trimmed
    /// stdout.
    ///
    /// The subprocess is killed once the configured deadline elapses; the
    /// working tree may still contain partial edits at that point, the caller
    /// decides what to do with them.
    #[instrument(skip_all, fields(bin = %self.cfg.bin.display()))]
    pub async fn run(&self, request: &FixRequest, workdir: &Path) -> Result<String> {
        let prompt = request.render_prompt();
        debug!(
            prompt_len = prompt.len(),
            workdir = %workdir.display(),
            "spawning agent"
        );

        let mut child = Command::new(&self.cfg.bin)
            .args(["-p", "--dangerously-skip-permissions"])
            .current_dir(workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("agent stdin not captured"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("agent stdout not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("agent stderr not captured"))?;

        let deadline = self.cfg.timeout;
        let mut out = String::new();
        let mut err = String::new();

        // Feed stdin and drain both output pipes concurrently so a chatty
        // agent can never deadlock against a full pipe buffer.
        let waited = tokio::time::timeout(deadline, async {
            let (write_res, out_res, err_res) = tokio::join!(
                async {
                    let mut stdin = stdin;
                    stdin.write_all(prompt.as_bytes()).await?;
                    drop(stdin);
                    Ok::<_, std::io::Error>(())
                },
                stdout.read_to_string(&mut out),
                stderr.read_to_string(&mut err),
            );
            write_res?;
            out_res?;
            err_res?;
            child.wait().await
        })
        .await;

        let status = match waited {
            Ok(res) => res?,
            Err(_) => {
                // Deadline hit: kill and reap, then report the timeout.
                let _ = child.kill().await;
                let _ = child.wait().await;
                warn!(timeout_secs = deadline.as_secs(), "agent killed on deadline");
                return Err(AgentError::Timeout(deadline));
            }
        };

        if !status.success() {
            let snippet = err.trim().chars().take(240).collect::<String>();
            return Err(AgentError::NonZeroExit {
                code: status.code().unwrap_or(-1),
                snippet,
            });
        }

        let output = out.trim().to_string();
        debug!(output_len = output.len(), "agent completed");
        Ok(output)
    }
}

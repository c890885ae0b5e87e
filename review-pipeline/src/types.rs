//! Core pipeline types: task descriptors, outcomes, ledger entries, tallies.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity tag embedded in reviewer comments as a `P<digit>` badge.
///
/// `P0` is most urgent, `P3` least. Comments without a recognizable badge
/// classify to [`Priority::default`] (the middle of the observed range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    /// Maps a badge digit to a priority; digits outside the closed set are
    /// treated as unrecognized.
    pub fn from_digit(digit: u32) -> Option<Self> {
        match digit {
            0 => Some(Priority::P0),
            1 => Some(Priority::P1),
            2 => Some(Priority::P2),
            3 => Some(Priority::P3),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::P2
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured fix task derived from one actionable review comment.
///
/// Carries both the classified text (title/priority/description) and the
/// structural anchors (path, lines, diff excerpt) the fix agent needs.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    /// REST identifier of the source comment; the ledger key.
    pub comment_id: u64,
    /// GraphQL node id of the source comment.
    pub node_id: String,
    /// File the comment is anchored to (actionable comments always have one).
    pub path: String,
    pub line: Option<u64>,
    pub start_line: Option<u64>,
    /// Diff excerpt the comment was left on.
    pub diff_hunk: Option<String>,
    /// Bold-span title, markup stripped; empty when the body has no bold span.
    pub title: String,
    /// Body text after the title, call-to-action trailer removed.
    pub description: String,
    pub priority: Priority,
}

/// Terminal outcome of one comment's pipeline run.
///
/// The string forms are the wire/ledger representation and never change;
/// ledger files written by older builds must keep deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixOutcome {
    /// Tree mutated, committed and pushed.
    #[serde(rename = "fixed")]
    Fixed,
    /// Target file absent from the workspace; agent never invoked.
    #[serde(rename = "skipped:file_not_found")]
    FileNotFound,
    /// Agent returned cleanly but the working tree is untouched.
    #[serde(rename = "skipped:no_changes")]
    NoChanges,
    /// Agent failure, timeout included, or a failed commit/push.
    #[serde(rename = "error:agent_failure")]
    AgentFailure,
}

impl FixOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            FixOutcome::Fixed => "fixed",
            FixOutcome::FileNotFound => "skipped:file_not_found",
            FixOutcome::NoChanges => "skipped:no_changes",
            FixOutcome::AgentFailure => "error:agent_failure",
        }
    }

    pub fn is_fixed(self) -> bool {
        self == FixOutcome::Fixed
    }
}

impl fmt::Display for FixOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executor verdict for one task: the outcome plus whatever context is worth
/// keeping in the ledger.
#[derive(Debug, Clone)]
pub struct FixReport {
    pub outcome: FixOutcome,
    /// Failure detail (timeout text, exit status, git error).
    pub detail: Option<String>,
    /// Commit message of the pushed fix, present only for [`FixOutcome::Fixed`].
    pub commit: Option<String>,
}

impl FixReport {
    pub fn outcome(outcome: FixOutcome) -> Self {
        Self {
            outcome,
            detail: None,
            commit: None,
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            outcome: FixOutcome::AgentFailure,
            detail: Some(detail.into()),
            commit: None,
        }
    }
}

/// Durable, write-once record of one handled comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub processed_at: DateTime<Utc>,
    pub outcome: FixOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Whether the originating review thread was marked resolved.
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl LedgerEntry {
    pub fn new(report: FixReport, resolved: bool, branch: Option<String>) -> Self {
        Self {
            processed_at: Utc::now(),
            outcome: report.outcome,
            detail: report.detail,
            resolved,
            commit: report.commit,
            branch,
        }
    }
}

/// Outcome tallies for one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Comments that entered the pipeline this cycle.
    pub processed: u32,
    pub fixed: u32,
    pub skipped: u32,
    pub errors: u32,
}

impl CycleStats {
    pub fn tally(&mut self, outcome: FixOutcome) {
        match outcome {
            FixOutcome::Fixed => self.fixed += 1,
            FixOutcome::AgentFailure => self.errors += 1,
            FixOutcome::FileNotFound | FixOutcome::NoChanges => self.skipped += 1,
        }
    }
}

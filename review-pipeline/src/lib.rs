//! Per-comment review-response pipeline.
//!
//! Takes one automated review comment from "discovered" to
//! "fixed-and-resolved" (or a terminal skip/error) exactly once:
//!
//! 1) **Classify**: parse the comment body grammar into a task descriptor
//!    (title, priority, description) or filter it as non-actionable.
//! 2) **Workspace**: clone or fetch the repository, discard leftovers from
//!    earlier runs, check out the PR branch and hard-reset to the remote tip.
//! 3) **Execute**: run the external fix agent under a hard deadline, detect
//!    whether the tree changed, commit and push on success.
//! 4) **Resolve**: correlate the comment's REST id to its GraphQL review
//!    thread and mark the thread resolved (soft step, never fails a run).
//! 5) **Record**: write the outcome to the durable idempotency ledger; a
//!    recorded identifier is never processed again, errors included.
//!
//! The pipeline uses `tracing` for per-decision logging, static dispatch over
//! the [`ledger::Ledger`] trait (no `async-trait`, no `Box<dyn ...>`), and a
//! `CancellationToken` observed at iteration boundaries only.

pub mod classify;
pub mod errors;
pub mod executor;
pub mod ledger;
pub mod orchestrator;
pub mod resolver;
pub mod types;

// -----------------------------------------------------------------------------
// Convenience re-exports for downstream users
// -----------------------------------------------------------------------------

pub use errors::{Error, PipelineResult};
pub use executor::FixExecutor;
pub use ledger::{JsonFileLedger, Ledger};
pub use orchestrator::Orchestrator;
pub use types::{CycleStats, FixOutcome, FixReport, LedgerEntry, Priority, TaskDescriptor};

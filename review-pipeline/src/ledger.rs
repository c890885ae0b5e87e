//! Durable idempotency ledger (JSON on disk).
//!
//! Why a ledger?
//! - Outcomes are at-most-once by policy: a comment identifier, once recorded,
//!   is excluded from all future cycles, errors included. There is no retry
//!   path, which bounds total work on a persistently failing fix.
//! - The store must survive restarts. A missing or corrupt file loads as an
//!   empty ledger, never as a fatal error.
//!
//! Layout: `<state_dir>/state.json` with shape
//! `{ "processed": { "<comment id>": { "processedAt": …, "outcome": …, … } } }`.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::errors::PipelineResult;
use crate::types::LedgerEntry;

/// Durable idempotency-ledger contract.
///
/// `has_processed` is an in-memory lookup over state loaded at open time;
/// `record` must persist before returning so the exclusion holds across a
/// crash immediately after.
#[allow(async_fn_in_trait)]
pub trait Ledger {
    fn has_processed(&self, comment_id: u64) -> bool;
    async fn record(&mut self, comment_id: u64, entry: LedgerEntry) -> PipelineResult<()>;
}

/// File-backed ledger, one JSON document rewritten on every record.
#[derive(Debug)]
pub struct JsonFileLedger {
    path: PathBuf,
    state: LedgerState,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerState {
    processed: BTreeMap<String, LedgerEntry>,
}

impl JsonFileLedger {
    /// Opens (or initializes) the ledger at `<state_dir>/state.json`.
    pub async fn open(state_dir: impl Into<PathBuf>) -> PipelineResult<Self> {
        let dir = state_dir.into();
        fs::create_dir_all(&dir).await?;
        let path = dir.join("state.json");

        let state = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<LedgerState>(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ledger unreadable, starting empty");
                    LedgerState::default()
                }
            },
            Err(_) => LedgerState::default(),
        };

        debug!(path = %path.display(), entries = state.processed.len(), "ledger loaded");
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of recorded comment identifiers.
    pub fn len(&self) -> usize {
        self.state.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.processed.is_empty()
    }

    async fn persist(&self) -> PipelineResult<()> {
        let mut json = serde_json::to_vec_pretty(&self.state)?;
        json.push(b'\n');
        fs::write(&self.path, json).await?;
        Ok(())
    }
}

impl Ledger for JsonFileLedger {
    fn has_processed(&self, comment_id: u64) -> bool {
        self.state.processed.contains_key(&comment_id.to_string())
    }

    async fn record(&mut self, comment_id: u64, entry: LedgerEntry) -> PipelineResult<()> {
        // Write-once: the first recorded outcome stands.
        if self.has_processed(comment_id) {
            debug!(comment_id, "ledger entry already present, keeping first");
            return Ok(());
        }

        self.state.processed.insert(comment_id.to_string(), entry);
        self.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FixOutcome, FixReport};
    use tempfile::TempDir;

    fn entry(outcome: FixOutcome) -> LedgerEntry {
        LedgerEntry::new(FixReport::outcome(outcome), false, None)
    }

    #[tokio::test]
    async fn record_survives_reopen() {
        let dir = TempDir::new().unwrap();

        let mut ledger = JsonFileLedger::open(dir.path()).await.unwrap();
        assert!(!ledger.has_processed(42));
        ledger.record(42, entry(FixOutcome::Fixed)).await.unwrap();
        assert!(ledger.has_processed(42));

        let reopened = JsonFileLedger::open(dir.path()).await.unwrap();
        assert!(reopened.has_processed(42));
        assert_eq!(reopened.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_state_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("state.json"), "{not json").unwrap();

        let mut ledger = JsonFileLedger::open(dir.path()).await.unwrap();
        assert!(ledger.is_empty());

        ledger.record(7, entry(FixOutcome::NoChanges)).await.unwrap();
        let reopened = JsonFileLedger::open(dir.path()).await.unwrap();
        assert!(reopened.has_processed(7));
    }

    #[tokio::test]
    async fn missing_state_dir_is_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");

        let mut ledger = JsonFileLedger::open(&nested).await.unwrap();
        ledger.record(1, entry(FixOutcome::FileNotFound)).await.unwrap();
        assert!(nested.join("state.json").exists());
    }

    #[tokio::test]
    async fn first_recorded_outcome_stands() {
        let dir = TempDir::new().unwrap();
        let mut ledger = JsonFileLedger::open(dir.path()).await.unwrap();

        ledger.record(9, entry(FixOutcome::AgentFailure)).await.unwrap();
        ledger.record(9, entry(FixOutcome::Fixed)).await.unwrap();

        let reopened = JsonFileLedger::open(dir.path()).await.unwrap();
        let raw = std::fs::read_to_string(reopened.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["processed"]["9"]["outcome"], "error:agent_failure");
    }

    #[tokio::test]
    async fn state_file_uses_processed_map_shape() {
        let dir = TempDir::new().unwrap();
        let mut ledger = JsonFileLedger::open(dir.path()).await.unwrap();
        ledger.record(314, entry(FixOutcome::Fixed)).await.unwrap();

        let raw = std::fs::read_to_string(ledger.path()).unwrap();
        assert!(raw.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let rec = &value["processed"]["314"];
        assert_eq!(rec["outcome"], "fixed");
        assert!(rec["processedAt"].is_string());
        assert_eq!(rec["resolved"], false);
    }
}

//! Recording ledger port interface

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ledger::LedgerEntry;

/// Ledger errors
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Failed to read ledger: {0}")]
    ReadFailed(String),

    #[error("Failed to append ledger entry: {0}")]
    WriteFailed(String),
}

/// Port for the append-only record of finalized recordings
#[async_trait]
pub trait RecordingLedger: Send + Sync {
    /// Track ids of every recording finalized so far.
    /// Malformed records are skipped; a missing ledger is empty.
    async fn recorded_ids(&self) -> Result<HashSet<String>, LedgerError>;

    /// Durably append one entry. Returns only after the data is on disk.
    async fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerError>;

    /// Directory that entry file names are relative to
    fn base_dir(&self) -> &Path;
}

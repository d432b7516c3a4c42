//! JSON-lines recording ledger adapter

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::ports::{LedgerError, RecordingLedger};
use crate::domain::config::LEDGER_FILE_NAME;
use crate::domain::ledger::{LedgerEntry, LedgerTrackId};

/// Append-only ledger stored as one JSON object per line
pub struct JsonlLedger {
    path: PathBuf,
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlLedger {
    /// Ledger at the standard file name inside `output_dir`
    pub fn in_dir(output_dir: impl Into<PathBuf>) -> Self {
        let base_dir = output_dir.into();
        Self {
            path: base_dir.join(LEDGER_FILE_NAME),
            base_dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Track ids from ledger text; blank, malformed, or id-less lines are skipped
    fn parse_ids(content: &str) -> HashSet<String> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(index, line)| {
                match serde_json::from_str::<LedgerTrackId>(line) {
                    Ok(record) if !record.track_id.is_empty() => Some(record.track_id),
                    Ok(_) => None,
                    Err(e) => {
                        warn!(line = index + 1, error = %e, "skipping malformed ledger line");
                        None
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl RecordingLedger for JsonlLedger {
    async fn recorded_ids(&self) -> Result<HashSet<String>, LedgerError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(LedgerError::ReadFailed(e.to_string())),
        };

        let ids = Self::parse_ids(&content);
        debug!(path = %self.path.display(), count = ids.len(), "ledger loaded");
        Ok(ids)
    }

    async fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let mut line =
            serde_json::to_string(entry).map_err(|e| LedgerError::WriteFailed(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| LedgerError::WriteFailed(e.to_string()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| LedgerError::WriteFailed(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| LedgerError::WriteFailed(e.to_string()))?;
        file.sync_all()
            .await
            .map_err(|e| LedgerError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

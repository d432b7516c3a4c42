//! Ledger entry value object

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One durable record per successfully finalized recording.
/// Serialized as a single JSON line; never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub track_id: String,
    pub title: String,
    pub artist_str: String,
    pub album: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub original_duration_sec: f64,
    pub ffmpeg_target_duration_sec: f64,
    pub recorded_duration_seconds: f64,
    pub header_rewrite_successful: bool,
    pub ffmpeg_initial_exit_code: i32,
    pub stop_reason: String,
    pub filename: String,
    pub format: String,
}

/// Minimal view used when reading the ledger back for deduplication
#[derive(Debug, Deserialize)]
pub(crate) struct LedgerTrackId {
    pub track_id: String,
}

/// Seconds between two instants rounded to two decimals
pub fn elapsed_secs_rounded(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = (end - start).num_milliseconds() as f64;
    (millis / 10.0).round() / 100.0
}

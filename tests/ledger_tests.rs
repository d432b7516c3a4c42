//! Ledger integration tests

use chrono::{TimeZone, Utc};
use spytorec::application::ports::RecordingLedger;
use spytorec::domain::ledger::LedgerEntry;
use spytorec::infrastructure::JsonlLedger;
use tempfile::TempDir;

fn entry(track_id: &str) -> LedgerEntry {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    LedgerEntry {
        track_id: track_id.to_string(),
        title: "Song".to_string(),
        artist_str: "Artist".to_string(),
        album: "Album".to_string(),
        start_time: start,
        end_time: start + chrono::Duration::seconds(200),
        original_duration_sec: 200.0,
        ffmpeg_target_duration_sec: 199.8,
        recorded_duration_seconds: 200.0,
        header_rewrite_successful: true,
        ffmpeg_initial_exit_code: 0,
        stop_reason: "FFmpeg process ended".to_string(),
        filename: "Artist - Song.flac".to_string(),
        format: "flac".to_string(),
    }
}

#[tokio::test]
async fn missing_ledger_is_empty() {
    let dir = TempDir::new().unwrap();
    let ledger = JsonlLedger::in_dir(dir.path());
    assert!(ledger.recorded_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn appended_ids_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let ledger = JsonlLedger::in_dir(dir.path());
        ledger.append(&entry("T1")).await.unwrap();
        ledger.append(&entry("T2")).await.unwrap();
    }

    let reopened = JsonlLedger::in_dir(dir.path());
    let ids = reopened.recorded_ids().await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains("T1"));
    assert!(ids.contains("T2"));

    let content = std::fs::read_to_string(reopened.path()).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.ends_with('\n'));
}

#[tokio::test]
async fn append_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let ledger = JsonlLedger::in_dir(dir.path().join("nested").join("music"));
    ledger.append(&entry("T1")).await.unwrap();
    assert!(ledger.path().exists());
}

#[tokio::test]
async fn corrupt_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let ledger = JsonlLedger::in_dir(dir.path());
    ledger.append(&entry("T1")).await.unwrap();

    let mut content = std::fs::read_to_string(ledger.path()).unwrap();
    content.push_str("{\"track_id\": \"T2\", \"title\": trunc\n");
    content.push_str("\n");
    std::fs::write(ledger.path(), content).unwrap();
    ledger.append(&entry("T3")).await.unwrap();

    let ids = ledger.recorded_ids().await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains("T1"));
    assert!(ids.contains("T3"));
}

#[tokio::test]
async fn concurrent_appends_keep_whole_lines() {
    let dir = TempDir::new().unwrap();
    let ledger = std::sync::Arc::new(JsonlLedger::in_dir(dir.path()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let ledger = std::sync::Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            ledger.append(&entry(&format!("T{}", i))).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let ids = ledger.recorded_ids().await.unwrap();
    assert_eq!(ids.len(), 8);
}

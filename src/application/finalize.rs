//! Finalization pipeline: validate, repair, tag and log finished captures

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::domain::ledger::{elapsed_secs_rounded, LedgerEntry};
use crate::domain::recording::{AudioFormat, StopReason};
use crate::domain::track::TrackSnapshot;

use super::ports::{
    CaptureProcess, CoverFetcher, Encoder, ProcessExit, RecordingLedger, TagWriter, TrackTags,
    SIGNALLED_EXIT_CODE,
};
use super::queue::{TaskQueue, TaskReceiver};

/// A file must be strictly larger than this to count as a recording
pub const MIN_USABLE_BYTES: u64 = 1024;

/// Queue carrying stopped sessions to the worker
pub type FinalizationQueue = TaskQueue<FinalizationTask>;

/// Callback invoked once per processed task
pub type OutcomeCallback = Arc<dyn Fn(&FinalizationOutcome) + Send + Sync>;

/// Everything the worker needs to finish one stopped capture
pub struct FinalizationTask {
    pub process: Box<dyn CaptureProcess>,
    pub output_path: PathBuf,
    pub format: AudioFormat,
    pub track: TrackSnapshot,
    pub stop_reason: StopReason,
    pub started_at: DateTime<Utc>,
    pub target_duration_secs: f64,
    pub encoder_path: PathBuf,
    /// Whether the graceful-stop byte reached the encoder
    pub stop_signal_sent: bool,
}

impl fmt::Debug for FinalizationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalizationTask")
            .field("output_path", &self.output_path)
            .field("track_id", &self.track.id)
            .field("stop_reason", &self.stop_reason)
            .field("stop_signal_sent", &self.stop_signal_sent)
            .finish_non_exhaustive()
    }
}

/// Result of processing one task
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizationOutcome {
    /// File kept, tagged and logged
    Finalized {
        title: String,
        file_name: String,
        recorded_secs: f64,
        header_rewritten: bool,
        tagged: bool,
    },
    /// Capture judged invalid or unusable; nothing logged
    Rejected {
        title: String,
        exit_code: i32,
        file_deleted: bool,
    },
    /// Something broke while finalizing a valid capture
    Failed { title: String, message: String },
}

impl FinalizationOutcome {
    pub fn title(&self) -> &str {
        match self {
            Self::Finalized { title, .. }
            | Self::Rejected { title, .. }
            | Self::Failed { title, .. } => title,
        }
    }
}

/// Bounded waits used while finalizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeTimeouts {
    /// Natural-exit window before the encoder is killed
    pub graceful: Duration,
    /// Window to wait after a kill
    pub kill: Duration,
    /// Header rewrite pass
    pub rewrite: Duration,
}

impl Default for FinalizeTimeouts {
    fn default() -> Self {
        Self {
            graceful: Duration::from_secs(20),
            kill: Duration::from_secs(5),
            rewrite: Duration::from_secs(120),
        }
    }
}

/// Whether a capture's exit state is acceptable.
///
/// Accepts a clean exit, a graceful stop that ended with 0 or 255, or any
/// early stop that still produced a usable file, whatever its exit code.
pub fn is_valid_capture(
    exit_code: i32,
    stop_signal_sent: bool,
    stop_reason: StopReason,
    usable: bool,
) -> bool {
    exit_code == 0
        || (stop_signal_sent && (exit_code == 0 || exit_code == SIGNALLED_EXIT_CODE))
        || (stop_reason.is_early_stop() && usable)
}

async fn file_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path).await.ok().map(|m| m.len())
}

async fn is_usable(path: &Path) -> bool {
    file_size(path)
        .await
        .is_some_and(|size| size > MIN_USABLE_BYTES)
}

/// `<dir>/<stem><suffix>`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", stem, suffix))
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove file");
        }
    }
}

/// Per-task finalization steps
pub struct Finalizer<E, T, C, L>
where
    E: Encoder,
    T: TagWriter,
    C: CoverFetcher,
    L: RecordingLedger,
{
    encoder: Arc<E>,
    tagger: Arc<T>,
    covers: C,
    ledger: Arc<L>,
    timeouts: FinalizeTimeouts,
}

impl<E, T, C, L> Finalizer<E, T, C, L>
where
    E: Encoder,
    T: TagWriter + 'static,
    C: CoverFetcher,
    L: RecordingLedger,
{
    pub fn new(encoder: Arc<E>, tagger: T, covers: C, ledger: Arc<L>) -> Self {
        Self {
            encoder,
            tagger: Arc::new(tagger),
            covers,
            ledger,
            timeouts: FinalizeTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: FinalizeTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Run every finalization step for one task
    pub async fn process(&self, mut task: FinalizationTask) -> FinalizationOutcome {
        let title = task.track.title.clone();
        let path = task.output_path.clone();

        let exit = task
            .process
            .reap(self.timeouts.graceful, self.timeouts.kill)
            .await;
        let usable = is_usable(&path).await;
        debug!(
            path = %path.display(),
            exit_code = exit.code,
            killed = exit.killed,
            usable,
            "capture reaped"
        );

        let valid = is_valid_capture(exit.code, task.stop_signal_sent, task.stop_reason, usable);
        if !valid || !usable {
            return self.reject(&task, &exit, usable).await;
        }

        let header_rewritten = self.rewrite_headers(&task).await;

        let tagged = if is_usable(&path).await {
            self.tag(&task).await
        } else {
            false
        };

        let end = Utc::now();
        let recorded_secs = elapsed_secs_rounded(task.started_at, end);
        let file_name = self.relative_name(&path);
        let entry = LedgerEntry {
            track_id: task.track.id.clone(),
            title: task.track.title.clone(),
            artist_str: task.track.artist_display(),
            album: task.track.album.clone(),
            start_time: task.started_at,
            end_time: end,
            original_duration_sec: task.track.duration_secs(),
            ffmpeg_target_duration_sec: task.target_duration_secs,
            recorded_duration_seconds: recorded_secs,
            header_rewrite_successful: header_rewritten,
            ffmpeg_initial_exit_code: exit.code,
            stop_reason: task.stop_reason.as_str().to_string(),
            filename: file_name.clone(),
            format: task.format.to_string(),
        };

        if let Err(e) = self.ledger.append(&entry).await {
            error!(track_id = %entry.track_id, error = %e, "ledger append failed");
            return FinalizationOutcome::Failed {
                title,
                message: e.to_string(),
            };
        }

        info!(
            track_id = %entry.track_id,
            file = %file_name,
            recorded_secs,
            header_rewritten,
            tagged,
            "recording finalized"
        );
        FinalizationOutcome::Finalized {
            title,
            file_name,
            recorded_secs,
            header_rewritten,
            tagged,
        }
    }

    async fn reject(
        &self,
        task: &FinalizationTask,
        exit: &ProcessExit,
        usable: bool,
    ) -> FinalizationOutcome {
        let path = &task.output_path;
        warn!(
            path = %path.display(),
            exit_code = exit.code,
            stop_reason = task.stop_reason.as_str(),
            usable,
            stderr = %exit.stderr_tail,
            "capture rejected"
        );

        let mut file_deleted = false;
        if !usable && file_size(path).await.is_some() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => file_deleted = true,
                Err(e) => warn!(path = %path.display(), error = %e, "failed to delete rejected file"),
            }
        }

        FinalizationOutcome::Rejected {
            title: task.track.title.clone(),
            exit_code: exit.code,
            file_deleted,
        }
    }

    /// Second encoder pass into a temp file that then replaces the original
    async fn rewrite_headers(&self, task: &FinalizationTask) -> bool {
        let path = &task.output_path;
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| task.format.extension().to_string());
        let temp = sibling_path(path, &format!("_rewrite_temp.{}", ext));

        let result = self
            .encoder
            .rewrite_headers(&task.encoder_path, path, &temp, self.timeouts.rewrite)
            .await;

        let ok = match result {
            Ok(out) if out.code == 0 => {
                let size = file_size(&temp).await.unwrap_or(0);
                if size >= MIN_USABLE_BYTES {
                    true
                } else {
                    warn!(path = %temp.display(), size, "header rewrite produced an undersized file");
                    false
                }
            }
            Ok(out) => {
                warn!(exit_code = out.code, stderr = %out.stderr, "header rewrite failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "header rewrite failed");
                false
            }
        };

        if ok {
            match tokio::fs::rename(&temp, path).await {
                Ok(()) => return true,
                Err(e) => warn!(error = %e, "failed to replace original with rewritten file"),
            }
        }

        remove_quietly(&temp).await;
        false
    }

    async fn tag(&self, task: &FinalizationTask) -> bool {
        let path = task.output_path.clone();
        let cover = match task.track.cover_url.as_deref() {
            Some(url) if task.format.supports_cover_art() => self.download_cover(&path, url).await,
            _ => None,
        };

        let tags = TrackTags {
            title: task.track.title.clone(),
            artist: task.track.artist_display(),
            album: task.track.album.clone(),
        };
        let tagger = Arc::clone(&self.tagger);
        let cover_for_tagger = cover.clone();
        let target = path.clone();
        let result = tokio::task::spawn_blocking(move || {
            tagger.write_tags(&target, &tags, cover_for_tagger.as_deref())
        })
        .await;

        if let Some(cover) = &cover {
            remove_quietly(cover).await;
        }

        match result {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "tagging failed");
                false
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "tagging task aborted");
                false
            }
        }
    }

    async fn download_cover(&self, audio_path: &Path, url: &str) -> Option<PathBuf> {
        let bytes = match self.covers.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url, error = %e, "cover download failed");
                return None;
            }
        };

        let cover_path = sibling_path(audio_path, "_cover.jpg");
        match tokio::fs::write(&cover_path, &bytes).await {
            Ok(()) => Some(cover_path),
            Err(e) => {
                warn!(path = %cover_path.display(), error = %e, "failed to save cover");
                remove_quietly(&cover_path).await;
                None
            }
        }
    }

    fn relative_name(&self, path: &Path) -> String {
        path.strip_prefix(self.ledger.base_dir())
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

/// Background consumer of the finalization queue
pub struct FinalizationWorker<E, T, C, L>
where
    E: Encoder,
    T: TagWriter,
    C: CoverFetcher,
    L: RecordingLedger,
{
    finalizer: Arc<Finalizer<E, T, C, L>>,
    receiver: TaskReceiver<FinalizationTask>,
    on_outcome: Option<OutcomeCallback>,
}

impl<E, T, C, L> FinalizationWorker<E, T, C, L>
where
    E: Encoder + 'static,
    T: TagWriter + 'static,
    C: CoverFetcher + 'static,
    L: RecordingLedger + 'static,
{
    pub fn new(finalizer: Finalizer<E, T, C, L>, receiver: TaskReceiver<FinalizationTask>) -> Self {
        Self {
            finalizer: Arc::new(finalizer),
            receiver,
            on_outcome: None,
        }
    }

    pub fn on_outcome(mut self, callback: OutcomeCallback) -> Self {
        self.on_outcome = Some(callback);
        self
    }

    /// Process tasks in FIFO order until shutdown and an empty queue.
    ///
    /// Each task runs in its own tokio task; a panic is logged and reported
    /// as [`FinalizationOutcome::Failed`] and the worker moves on.
    pub async fn run(mut self) {
        info!("finalization worker started");
        while let Some((task, _done)) = self.receiver.recv().await {
            let title = task.track.title.clone();
            let finalizer = Arc::clone(&self.finalizer);

            let outcome = match tokio::spawn(async move { finalizer.process(task).await }).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(title = %title, error = %e, "finalization task crashed");
                    FinalizationOutcome::Failed {
                        title,
                        message: format!("internal error: {}", e),
                    }
                }
            };

            if let Some(cb) = &self.on_outcome {
                cb(&outcome);
            }
        }
        info!("finalization worker stopped");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::ports::{
        CaptureRequest, CoverError, LedgerError, RecordingError, RewriteOutput, TaggingError,
        UNKNOWN_EXIT_CODE,
    };
    use crate::application::queue::task_queue;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tempfile::TempDir;

    pub(crate) struct MockProcess {
        pub code: Option<i32>,
        pub exit_code: i32,
        pub stops: Arc<Mutex<u32>>,
    }

    impl MockProcess {
        pub(crate) fn exited(code: i32) -> Self {
            Self {
                code: Some(code),
                exit_code: code,
                stops: Arc::new(Mutex::new(0)),
            }
        }

        pub(crate) fn running(exit_code: i32) -> Self {
            Self {
                code: None,
                exit_code,
                stops: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl CaptureProcess for MockProcess {
        fn try_exit_code(&mut self) -> Option<i32> {
            self.code
        }

        async fn request_stop(&mut self) -> Result<(), RecordingError> {
            *self.stops.lock().unwrap() += 1;
            Ok(())
        }

        async fn reap(&mut self, _graceful: Duration, _kill: Duration) -> ProcessExit {
            ProcessExit {
                code: self.exit_code,
                killed: self.exit_code == UNKNOWN_EXIT_CODE,
                stderr_tail: String::new(),
            }
        }
    }

    /// Rewrites by writing `rewrite_bytes` bytes to the output
    pub(crate) struct MockEncoder {
        pub rewrite_code: i32,
        pub rewrite_bytes: usize,
    }

    #[async_trait]
    impl Encoder for MockEncoder {
        fn spawn_capture(
            &self,
            _request: &CaptureRequest,
        ) -> Result<Box<dyn CaptureProcess>, RecordingError> {
            Ok(Box::new(MockProcess::running(0)))
        }

        async fn rewrite_headers(
            &self,
            _encoder_path: &Path,
            _input: &Path,
            output: &Path,
            _timeout: Duration,
        ) -> Result<RewriteOutput, RecordingError> {
            tokio::fs::write(output, vec![7u8; self.rewrite_bytes])
                .await
                .map_err(|e| RecordingError::Failed(e.to_string()))?;
            Ok(RewriteOutput {
                code: self.rewrite_code,
                stderr: String::new(),
            })
        }
    }

    #[derive(Default)]
    struct MockTagger {
        calls: Arc<Mutex<Vec<(TrackTags, bool)>>>,
    }

    impl TagWriter for MockTagger {
        fn write_tags(
            &self,
            _path: &Path,
            tags: &TrackTags,
            cover_jpeg: Option<&Path>,
        ) -> Result<(), TaggingError> {
            let cover_present = cover_jpeg.is_some_and(|p| p.exists());
            self.calls.lock().unwrap().push((tags.clone(), cover_present));
            Ok(())
        }
    }

    struct MockCovers {
        result: Result<Vec<u8>, CoverError>,
    }

    #[async_trait]
    impl CoverFetcher for MockCovers {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, CoverError> {
            self.result.clone()
        }
    }

    struct MemoryLedger {
        dir: PathBuf,
        entries: Mutex<Vec<LedgerEntry>>,
        panic_on: Option<String>,
    }

    impl MemoryLedger {
        fn new(dir: &Path) -> Self {
            Self {
                dir: dir.to_path_buf(),
                entries: Mutex::new(Vec::new()),
                panic_on: None,
            }
        }

        fn entries(&self) -> Vec<LedgerEntry> {
            self.entries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordingLedger for MemoryLedger {
        async fn recorded_ids(&self) -> Result<HashSet<String>, LedgerError> {
            Ok(self.entries().into_iter().map(|e| e.track_id).collect())
        }

        async fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
            if self.panic_on.as_deref() == Some(entry.track_id.as_str()) {
                panic!("ledger exploded");
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn base_dir(&self) -> &Path {
            &self.dir
        }
    }

    pub(crate) fn track(id: &str) -> TrackSnapshot {
        TrackSnapshot {
            id: id.to_string(),
            title: "Song".to_string(),
            artists: vec!["Artist".to_string()],
            album: "Album".to_string(),
            cover_url: Some("http://covers.test/a.jpg".to_string()),
            duration_ms: 200_000,
            is_playing: true,
        }
    }

    fn task(
        dir: &Path,
        process: MockProcess,
        reason: StopReason,
        signal_sent: bool,
    ) -> FinalizationTask {
        FinalizationTask {
            process: Box::new(process),
            output_path: dir.join("Artist - Song.flac"),
            format: AudioFormat::Flac,
            track: track("T1"),
            stop_reason: reason,
            started_at: Utc::now(),
            target_duration_secs: 199.8,
            encoder_path: PathBuf::from("ffmpeg"),
            stop_signal_sent: signal_sent,
        }
    }

    struct Fixture {
        dir: TempDir,
        ledger: Arc<MemoryLedger>,
        tag_calls: Arc<Mutex<Vec<(TrackTags, bool)>>>,
    }

    fn finalizer(
        rewrite_code: i32,
        covers: Result<Vec<u8>, CoverError>,
    ) -> (
        Finalizer<MockEncoder, MockTagger, MockCovers, MemoryLedger>,
        Fixture,
    ) {
        let dir = TempDir::new().unwrap();
        let ledger = Arc::new(MemoryLedger::new(dir.path()));
        let tagger = MockTagger::default();
        let tag_calls = Arc::clone(&tagger.calls);
        let finalizer = Finalizer::new(
            Arc::new(MockEncoder {
                rewrite_code,
                rewrite_bytes: 2048,
            }),
            tagger,
            MockCovers { result: covers },
            Arc::clone(&ledger),
        );
        (
            finalizer,
            Fixture {
                dir,
                ledger,
                tag_calls,
            },
        )
    }

    #[test]
    fn validity_rules() {
        assert!(is_valid_capture(0, false, StopReason::EncoderExited, false));
        assert!(is_valid_capture(255, true, StopReason::TrackChanged, false));
        assert!(!is_valid_capture(255, false, StopReason::EncoderExited, true));
        assert!(!is_valid_capture(1, true, StopReason::EncoderExited, true));
        assert!(is_valid_capture(-1, false, StopReason::PlaybackStopped, true));
        assert!(!is_valid_capture(-1, false, StopReason::PlaybackStopped, false));
    }

    #[test]
    fn sibling_paths_keep_directory() {
        let path = Path::new("/music/A/B/Artist - Song.flac");
        assert_eq!(
            sibling_path(path, "_cover.jpg"),
            PathBuf::from("/music/A/B/Artist - Song_cover.jpg")
        );
        assert_eq!(
            sibling_path(path, "_rewrite_temp.flac"),
            PathBuf::from("/music/A/B/Artist - Song_rewrite_temp.flac")
        );
    }

    #[tokio::test]
    async fn finalizes_clean_capture() {
        let (finalizer, fx) = finalizer(0, Ok(vec![1, 2, 3]));
        let t = task(fx.dir.path(), MockProcess::exited(0), StopReason::EncoderExited, false);
        let path = t.output_path.clone();
        std::fs::write(&path, vec![0u8; 4096]).unwrap();

        let outcome = finalizer.process(t).await;

        match outcome {
            FinalizationOutcome::Finalized {
                file_name,
                header_rewritten,
                tagged,
                ..
            } => {
                assert_eq!(file_name, "Artist - Song.flac");
                assert!(header_rewritten);
                assert!(tagged);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // Rewritten file replaced the original, temp and cover are gone
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2048);
        assert!(!fx.dir.path().join("Artist - Song_rewrite_temp.flac").exists());
        assert!(!fx.dir.path().join("Artist - Song_cover.jpg").exists());

        let calls = fx.tag_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.artist, "Artist");
        assert!(calls[0].1, "cover file should exist while tagging");

        let entries = fx.ledger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].track_id, "T1");
        assert_eq!(entries[0].stop_reason, "FFmpeg process ended");
        assert_eq!(entries[0].format, "flac");
        assert_eq!(entries[0].ffmpeg_target_duration_sec, 199.8);
        assert!(entries[0].header_rewrite_successful);
    }

    #[tokio::test]
    async fn undersized_capture_is_deleted_without_entry() {
        let (finalizer, fx) = finalizer(0, Ok(vec![1]));
        let t = task(
            fx.dir.path(),
            MockProcess::running(SIGNALLED_EXIT_CODE),
            StopReason::TrackChanged,
            true,
        );
        let path = t.output_path.clone();
        std::fs::write(&path, vec![0u8; 500]).unwrap();

        let outcome = finalizer.process(t).await;

        assert_eq!(
            outcome,
            FinalizationOutcome::Rejected {
                title: "Song".to_string(),
                exit_code: SIGNALLED_EXIT_CODE,
                file_deleted: true,
            }
        );
        assert!(!path.exists());
        assert!(fx.ledger.entries().is_empty());
        assert!(fx.tag_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_exit_keeps_usable_file_but_logs_nothing() {
        let (finalizer, fx) = finalizer(0, Ok(vec![1]));
        let t = task(fx.dir.path(), MockProcess::exited(1), StopReason::EncoderExited, false);
        let path = t.output_path.clone();
        std::fs::write(&path, vec![0u8; 4096]).unwrap();

        let outcome = finalizer.process(t).await;

        assert!(matches!(
            outcome,
            FinalizationOutcome::Rejected {
                exit_code: 1,
                file_deleted: false,
                ..
            }
        ));
        assert!(path.exists());
        assert!(fx.ledger.entries().is_empty());
    }

    #[tokio::test]
    async fn early_stop_with_usable_file_is_accepted_even_when_killed() {
        let (finalizer, fx) = finalizer(0, Ok(vec![1]));
        let t = task(
            fx.dir.path(),
            MockProcess::running(UNKNOWN_EXIT_CODE),
            StopReason::UserInterrupted,
            false,
        );
        std::fs::write(&t.output_path, vec![0u8; 4096]).unwrap();

        let outcome = finalizer.process(t).await;

        assert!(matches!(outcome, FinalizationOutcome::Finalized { .. }));
        let entries = fx.ledger.entries();
        assert_eq!(entries[0].ffmpeg_initial_exit_code, UNKNOWN_EXIT_CODE);
        assert_eq!(entries[0].stop_reason, "User interrupted");
    }

    #[tokio::test]
    async fn failed_rewrite_keeps_original() {
        let (finalizer, fx) = finalizer(1, Ok(vec![1]));
        let t = task(fx.dir.path(), MockProcess::exited(0), StopReason::EncoderExited, false);
        let path = t.output_path.clone();
        std::fs::write(&path, vec![0u8; 4096]).unwrap();

        let outcome = finalizer.process(t).await;

        assert!(matches!(
            outcome,
            FinalizationOutcome::Finalized {
                header_rewritten: false,
                ..
            }
        ));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4096);
        assert!(!fx.dir.path().join("Artist - Song_rewrite_temp.flac").exists());
        assert!(!fx.ledger.entries()[0].header_rewrite_successful);
    }

    #[tokio::test]
    async fn cover_failure_still_tags_text() {
        let (finalizer, fx) = finalizer(0, Err(CoverError::HttpStatus(404)));
        let t = task(fx.dir.path(), MockProcess::exited(0), StopReason::EncoderExited, false);
        std::fs::write(&t.output_path, vec![0u8; 4096]).unwrap();

        let outcome = finalizer.process(t).await;

        assert!(matches!(
            outcome,
            FinalizationOutcome::Finalized { tagged: true, .. }
        ));
        let calls = fx.tag_calls.lock().unwrap();
        assert!(!calls[0].1);
    }

    #[tokio::test]
    async fn entry_file_name_is_relative_to_ledger_dir() {
        let (finalizer, fx) = finalizer(0, Ok(vec![1]));
        let nested = fx.dir.path().join("Artist").join("Album");
        std::fs::create_dir_all(&nested).unwrap();
        let mut t = task(fx.dir.path(), MockProcess::exited(0), StopReason::EncoderExited, false);
        t.output_path = nested.join("Artist - Song.flac");
        std::fs::write(&t.output_path, vec![0u8; 4096]).unwrap();

        finalizer.process(t).await;

        let expected = Path::new("Artist")
            .join("Album")
            .join("Artist - Song.flac")
            .to_string_lossy()
            .into_owned();
        assert_eq!(fx.ledger.entries()[0].filename, expected);
    }

    #[tokio::test]
    async fn worker_drains_queue_and_survives_a_crash() {
        let dir = TempDir::new().unwrap();
        let mut ledger = MemoryLedger::new(dir.path());
        ledger.panic_on = Some("T1".to_string());
        let ledger = Arc::new(ledger);
        let finalizer = Finalizer::new(
            Arc::new(MockEncoder {
                rewrite_code: 0,
                rewrite_bytes: 2048,
            }),
            MockTagger::default(),
            MockCovers { result: Ok(vec![1]) },
            Arc::clone(&ledger),
        );

        let (queue, receiver) = task_queue();
        for id in ["T1", "T2"] {
            let sub = dir.path().join(id);
            std::fs::create_dir_all(&sub).unwrap();
            let mut t = task(&sub, MockProcess::exited(0), StopReason::EncoderExited, false);
            t.track = track(id);
            std::fs::write(&t.output_path, vec![0u8; 4096]).unwrap();
            queue.enqueue(t).unwrap();
        }
        queue.shutdown();

        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcomes);
        let worker = FinalizationWorker::new(finalizer, receiver)
            .on_outcome(Arc::new(move |o| sink.lock().unwrap().push(o.clone())));

        tokio::time::timeout(Duration::from_secs(5), worker.run())
            .await
            .unwrap();

        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], FinalizationOutcome::Failed { .. }));
        assert!(matches!(outcomes[1], FinalizationOutcome::Finalized { .. }));
        assert_eq!(queue.pending(), 0);
        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(ledger.entries()[0].track_id, "T2");
    }
}

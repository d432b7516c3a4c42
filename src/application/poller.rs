//! Playback poller: the main record loop

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::recording::StopReason;
use crate::domain::track::TrackSnapshot;

use super::capture::{stop_reason_for, CaptureSessionManager, StartError};
use super::ports::{Encoder, PlaybackSource};

/// Callback for live status updates, invoked once per tick
pub type StatusCallback = Arc<dyn Fn(&PollStatus) + Send + Sync>;

/// What one poll tick observed or did
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// Nothing eligible is playing
    Idle,
    /// Playing track was already recorded or attempted
    AlreadyHandled { title: String },
    /// The output file already exists; reported once per track
    SkippedExisting { title: String, path: PathBuf },
    /// A capture is running
    Recording {
        title: String,
        elapsed_secs: f64,
        total_secs: f64,
    },
    Started {
        title: String,
        artist: String,
        path: PathBuf,
        target_secs: f64,
    },
    StartFailed {
        title: String,
        message: String,
        /// Whether the track will be tried again on a later tick
        will_retry: bool,
    },
    Stopped { title: String, reason: StopReason },
}

/// Drives capture start/stop decisions from playback state
pub struct PlaybackPoller<P, E>
where
    P: PlaybackSource,
    E: Encoder,
{
    source: P,
    manager: Arc<CaptureSessionManager<E>>,
    recorded: HashSet<String>,
    attempted: HashSet<String>,
    on_status: Option<StatusCallback>,
}

impl<P, E> PlaybackPoller<P, E>
where
    P: PlaybackSource,
    E: Encoder,
{
    /// `recorded` holds the ids already in the ledger
    pub fn new(
        source: P,
        manager: Arc<CaptureSessionManager<E>>,
        recorded: HashSet<String>,
    ) -> Self {
        Self {
            source,
            manager,
            recorded,
            attempted: HashSet::new(),
            on_status: None,
        }
    }

    pub fn on_status(mut self, callback: StatusCallback) -> Self {
        self.on_status = Some(callback);
        self
    }

    pub fn was_attempted(&self, track_id: &str) -> bool {
        self.attempted.contains(track_id)
    }

    /// Run one poll iteration
    pub async fn tick(&mut self) -> PollStatus {
        let snapshot = match self.source.current_playback().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "failed to fetch playback state");
                None
            }
        };

        if let Some(active) = self.manager.active_status().await {
            return match stop_reason_for(&active, snapshot.as_ref()) {
                Some(reason) => {
                    self.manager.stop(reason).await;
                    PollStatus::Stopped {
                        title: active.title,
                        reason,
                    }
                }
                None => PollStatus::Recording {
                    title: active.title,
                    elapsed_secs: active.elapsed.as_secs_f64(),
                    total_secs: active.duration_secs,
                },
            };
        }

        match snapshot {
            Some(track) if track.is_playing && !track.id.is_empty() => self.consider(track).await,
            _ => PollStatus::Idle,
        }
    }

    async fn consider(&mut self, track: TrackSnapshot) -> PollStatus {
        if self.recorded.contains(&track.id) || self.attempted.contains(&track.id) {
            return PollStatus::AlreadyHandled { title: track.title };
        }

        if self.manager.settings().skip_existing_file {
            let path = self.manager.output_path_for(&track);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                info!(track_id = %track.id, path = %path.display(), "output exists, skipping");
                self.attempted.insert(track.id);
                return PollStatus::SkippedExisting {
                    title: track.title,
                    path,
                };
            }
        }

        match self.manager.start(&track).await {
            Ok(started) => {
                self.attempted.insert(track.id.clone());
                PollStatus::Started {
                    artist: track.artist_display(),
                    title: track.title,
                    path: started.output_path,
                    target_secs: started.target_duration_secs,
                }
            }
            Err(e) => {
                let too_short = matches!(e, StartError::TooShort { .. });
                if too_short {
                    debug!(track_id = %track.id, error = %e, "not recording");
                    self.attempted.insert(track.id.clone());
                } else {
                    warn!(track_id = %track.id, error = %e, "failed to start capture");
                }
                PollStatus::StartFailed {
                    title: track.title,
                    message: e.to_string(),
                    will_retry: !too_short,
                }
            }
        }
    }

    /// Poll until `shutdown` turns true, sleeping one interval between ticks.
    ///
    /// Leaves any active capture running; the caller decides how to stop it.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.manager.settings().interval;
        info!(interval_ms = interval.as_millis() as u64, "playback poller started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let status = self.tick().await;
            if let Some(cb) = &self.on_status {
                cb(&status);
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("playback poller stopped");
    }
}

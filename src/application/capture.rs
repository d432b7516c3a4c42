//! Capture session manager: the single "currently recording" slot

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::config::RecordSettings;
use crate::domain::recording::{AudioFormat, StopReason};
use crate::domain::track::TrackSnapshot;

use super::finalize::{FinalizationQueue, FinalizationTask};
use super::ports::{CaptureProcess, CaptureRequest, Encoder, RecordingError};

/// Errors from starting a capture
#[derive(Debug, Error)]
pub enum StartError {
    #[error("Track too short ({duration_secs:.1}s < {min_secs}s)")]
    TooShort { duration_secs: f64, min_secs: u64 },

    #[error("A capture is already active")]
    SessionActive,

    #[error("Failed to create directory {path}: {message}")]
    CreateDir { path: PathBuf, message: String },

    #[error(transparent)]
    Recording(#[from] RecordingError),
}

/// The one active capture
pub struct CaptureSession {
    process: Box<dyn CaptureProcess>,
    track: TrackSnapshot,
    started_at: DateTime<Utc>,
    started: Instant,
    output_path: PathBuf,
    format: AudioFormat,
    target_duration_secs: f64,
    encoder_path: PathBuf,
}

impl CaptureSession {
    /// Consume the session into a finalization task
    fn into_task(self, stop_reason: StopReason, stop_signal_sent: bool) -> FinalizationTask {
        FinalizationTask {
            process: self.process,
            output_path: self.output_path,
            format: self.format,
            track: self.track,
            stop_reason,
            started_at: self.started_at,
            target_duration_secs: self.target_duration_secs,
            encoder_path: self.encoder_path,
            stop_signal_sent,
        }
    }
}

/// Shared handle to the capture slot
#[derive(Clone, Default)]
pub struct SessionSlot(Arc<Mutex<Option<CaptureSession>>>);

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_active(&self) -> bool {
        self.0.lock().await.is_some()
    }
}

/// Details of a freshly started capture
#[derive(Debug, Clone, PartialEq)]
pub struct StartedCapture {
    pub output_path: PathBuf,
    pub target_duration_secs: f64,
}

/// Read-only view of the active capture, for the poll loop
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCapture {
    pub track_id: String,
    pub title: String,
    pub duration_secs: f64,
    pub elapsed: Duration,
    pub encoder_exited: bool,
}

/// Decide whether the active capture must stop, given the latest poll.
///
/// Checked in order: encoder exited, nothing playing, different track.
pub fn stop_reason_for(
    active: &ActiveCapture,
    snapshot: Option<&TrackSnapshot>,
) -> Option<StopReason> {
    if active.encoder_exited {
        return Some(StopReason::EncoderExited);
    }
    match snapshot {
        Some(s) if !s.is_playing => Some(StopReason::PlaybackStopped),
        None => Some(StopReason::PlaybackStopped),
        Some(s) if s.id != active.track_id => Some(StopReason::TrackChanged),
        Some(_) => None,
    }
}

/// Starts captures and hands stopped ones to the finalization queue
pub struct CaptureSessionManager<E: Encoder> {
    encoder: Arc<E>,
    slot: SessionSlot,
    queue: FinalizationQueue,
    settings: RecordSettings,
}

impl<E: Encoder> CaptureSessionManager<E> {
    pub fn new(encoder: Arc<E>, queue: FinalizationQueue, settings: RecordSettings) -> Self {
        Self {
            encoder,
            slot: SessionSlot::new(),
            queue,
            settings,
        }
    }

    pub fn settings(&self) -> &RecordSettings {
        &self.settings
    }

    pub async fn is_active(&self) -> bool {
        self.slot.is_active().await
    }

    /// Where a capture of `track` would be written
    pub fn output_path_for(&self, track: &TrackSnapshot) -> PathBuf {
        self.settings.layout().path_for(track)
    }

    /// Launch a capture for `track` and occupy the slot.
    ///
    /// Leaves no process and no slot entry behind on error.
    pub async fn start(&self, track: &TrackSnapshot) -> Result<StartedCapture, StartError> {
        let mut slot = self.slot.0.lock().await;
        if slot.is_some() {
            return Err(StartError::SessionActive);
        }

        let duration_secs = track.duration_secs();
        if duration_secs < self.settings.min_duration_secs as f64 {
            return Err(StartError::TooShort {
                duration_secs,
                min_secs: self.settings.min_duration_secs,
            });
        }

        let output_path = self.output_path_for(track);
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StartError::CreateDir {
                    path: parent.to_path_buf(),
                    message: e.to_string(),
                })?;
        }

        let target_duration_secs = self.settings.target_duration_secs(duration_secs);
        let request = CaptureRequest {
            encoder_path: self.settings.ffmpeg_path.clone(),
            device: self.settings.device.clone(),
            target_duration_secs,
            format: self.settings.format,
            ogg_quality: self.settings.ogg_quality,
            output_path: output_path.clone(),
        };

        let process = self.encoder.spawn_capture(&request)?;
        info!(
            track_id = %track.id,
            path = %output_path.display(),
            target_secs = target_duration_secs,
            "capture started"
        );

        *slot = Some(CaptureSession {
            process,
            track: track.clone(),
            started_at: Utc::now(),
            started: Instant::now(),
            output_path: output_path.clone(),
            format: self.settings.format,
            target_duration_secs,
            encoder_path: request.encoder_path,
        });

        Ok(StartedCapture {
            output_path,
            target_duration_secs,
        })
    }

    /// Stop the active capture, if any, and enqueue it for finalization.
    ///
    /// Never waits for the encoder to exit.
    ///
    /// # Returns
    /// Whether a session was stopped
    pub async fn stop(&self, reason: StopReason) -> bool {
        let session = self.slot.0.lock().await.take();
        let Some(mut session) = session else {
            return false;
        };

        let mut signal_sent = false;
        if session.process.try_exit_code().is_none() {
            match session.process.request_stop().await {
                Ok(()) => signal_sent = true,
                Err(e) => warn!(error = %e, "failed to send stop signal to encoder"),
            }
        }

        info!(
            track_id = %session.track.id,
            reason = reason.as_str(),
            signal_sent,
            "capture stopped"
        );

        let task = session.into_task(reason, signal_sent);
        if let Err(task) = self.queue.enqueue(task) {
            error!(
                path = %task.output_path.display(),
                "finalization queue closed, dropping capture"
            );
        } else {
            debug!(pending = self.queue.pending(), "capture queued for finalization");
        }
        true
    }

    /// Snapshot of the active capture, polling the encoder's exit state
    pub async fn active_status(&self) -> Option<ActiveCapture> {
        let mut slot = self.slot.0.lock().await;
        let session = slot.as_mut()?;
        let encoder_exited = session.process.try_exit_code().is_some();
        Some(ActiveCapture {
            track_id: session.track.id.clone(),
            title: session.track.title.clone(),
            duration_secs: session.track.duration_secs(),
            elapsed: session.started.elapsed(),
            encoder_exited,
        })
    }
}

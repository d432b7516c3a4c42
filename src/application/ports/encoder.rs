//! Encoder port interfaces

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::AudioFormat;

/// Encoder errors
#[derive(Debug, Clone, Error)]
pub enum RecordingError {
    #[error("FFmpeg executable not found at '{0}'. Please check the path or install FFmpeg.")]
    EncoderNotFound(String),

    #[error("Failed to start recording: {0}")]
    StartFailed(String),

    #[error("Failed to send stop signal: {0}")]
    SignalFailed(String),

    #[error("Encoder timed out after {0:?}")]
    Timeout(Duration),

    #[error("Encoder failed: {0}")]
    Failed(String),
}

/// Exit code used when no real code is available (killed by signal, wait failed)
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Exit code FFmpeg reports after being stopped through its stdin `q` command
pub const SIGNALLED_EXIT_CODE: i32 = 255;

/// Everything needed to launch one capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub encoder_path: PathBuf,
    pub device: String,
    pub target_duration_secs: f64,
    pub format: AudioFormat,
    pub ogg_quality: u8,
    pub output_path: PathBuf,
}

/// Final state of a reaped capture process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, or [`UNKNOWN_EXIT_CODE`]
    pub code: i32,
    /// Whether the process had to be killed after the graceful window
    pub killed: bool,
    /// Last lines of the encoder's diagnostic output
    pub stderr_tail: String,
}

/// Result of a header rewrite pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutput {
    pub code: i32,
    pub stderr: String,
}

/// Handle to a running capture process
#[async_trait]
pub trait CaptureProcess: Send + Sync {
    /// Exit code if the process has already exited, without blocking
    fn try_exit_code(&mut self) -> Option<i32>;

    /// Write the single graceful-stop byte to the process's stdin
    async fn request_stop(&mut self) -> Result<(), RecordingError>;

    /// Wait for the process to exit.
    ///
    /// Waits up to `graceful` for a natural exit, then kills the process and
    /// waits up to `kill` for it to go away.
    async fn reap(&mut self, graceful: Duration, kill: Duration) -> ProcessExit;
}

/// Port for the external encoder
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Launch a capture process. Never leaves a process behind on error.
    fn spawn_capture(&self, request: &CaptureRequest)
        -> Result<Box<dyn CaptureProcess>, RecordingError>;

    /// Copy the audio stream of `input` into a fresh container at `output`,
    /// stripping container metadata.
    async fn rewrite_headers(
        &self,
        encoder_path: &Path,
        input: &Path,
        output: &Path,
        timeout: Duration,
    ) -> Result<RewriteOutput, RecordingError>;
}

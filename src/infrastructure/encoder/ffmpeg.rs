//! FFmpeg-based capture and header rewrite adapter

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::application::ports::{
    CaptureProcess, CaptureRequest, Encoder, ProcessExit, RecordingError, RewriteOutput,
    UNKNOWN_EXIT_CODE,
};
use crate::domain::recording::{ProcessLifecycle, Termination};

/// Lines of encoder stderr kept for diagnostics
const STDERR_TAIL_LINES: usize = 20;

/// Byte that asks FFmpeg to finish the file and exit
const GRACEFUL_STOP: &[u8] = b"q";

/// FFmpeg input backend for the current platform
pub const fn capture_backend() -> &'static str {
    if cfg!(target_os = "windows") {
        "dshow"
    } else if cfg!(target_os = "macos") {
        "avfoundation"
    } else {
        "alsa"
    }
}

/// Rolling buffer of the last stderr lines
#[derive(Debug, Default, Clone)]
struct StderrTail(Arc<Mutex<VecDeque<String>>>);

impl StderrTail {
    fn push(&self, line: String) {
        if let Ok(mut lines) = self.0.lock() {
            if lines.len() == STDERR_TAIL_LINES {
                lines.pop_front();
            }
            lines.push_back(line);
        }
    }

    fn joined(&self) -> String {
        self.0
            .lock()
            .map(|lines| lines.iter().cloned().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default()
    }
}

/// Drain stderr continuously so the encoder never blocks on a full pipe
fn spawn_stderr_drain(stderr: ChildStderr, tail: StderrTail) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    trace!(target: "spytorec::ffmpeg", "{}", line);
                    tail.push(line);
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "stopped reading encoder stderr");
                    break;
                }
            }
        }
    })
}

fn map_spawn_error(program: &Path, e: std::io::Error) -> RecordingError {
    if e.kind() == std::io::ErrorKind::NotFound {
        RecordingError::EncoderNotFound(program.display().to_string())
    } else {
        RecordingError::StartFailed(e.to_string())
    }
}

/// FFmpeg encoder
#[derive(Debug, Default, Clone)]
pub struct FfmpegEncoder;

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Build FFmpeg args for a capture
    pub fn build_capture_args(request: &CaptureRequest) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-f".to_string(),
            capture_backend().to_string(),
            "-i".to_string(),
            request.device.clone(),
            "-t".to_string(),
            request.target_duration_secs.to_string(),
        ];
        args.extend(request.format.codec_args(request.ogg_quality));
        args.push(request.output_path.to_string_lossy().to_string());
        args
    }

    /// Build FFmpeg args for the header rewrite pass
    pub fn build_rewrite_args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-acodec".to_string(),
            "copy".to_string(),
            "-vn".to_string(),
            "-map_metadata".to_string(),
            "-1".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    fn spawn_capture(
        &self,
        request: &CaptureRequest,
    ) -> Result<Box<dyn CaptureProcess>, RecordingError> {
        let args = Self::build_capture_args(request);
        debug!(program = %request.encoder_path.display(), ?args, "spawning capture");

        let mut child = Command::new(&request.encoder_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| map_spawn_error(&request.encoder_path, e))?;

        let stdin = child.stdin.take();
        let tail = StderrTail::default();
        let drain = child
            .stderr
            .take()
            .map(|stderr| spawn_stderr_drain(stderr, tail.clone()));

        Ok(Box::new(FfmpegCapture {
            child,
            stdin,
            lifecycle: ProcessLifecycle::new(),
            exit_code: None,
            tail,
            drain,
        }))
    }

    async fn rewrite_headers(
        &self,
        encoder_path: &Path,
        input: &Path,
        output: &Path,
        timeout: Duration,
    ) -> Result<RewriteOutput, RecordingError> {
        let args = Self::build_rewrite_args(input, output);
        debug!(program = %encoder_path.display(), ?args, "rewriting headers");

        let child = Command::new(encoder_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| map_spawn_error(encoder_path, e))?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| RecordingError::Timeout(timeout))?
            .map_err(|e| RecordingError::Failed(e.to_string()))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr_tail = stderr
            .lines()
            .rev()
            .take(STDERR_TAIL_LINES)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");

        Ok(RewriteOutput {
            code: output.status.code().unwrap_or(UNKNOWN_EXIT_CODE),
            stderr: stderr_tail,
        })
    }
}

/// A running FFmpeg capture
pub struct FfmpegCapture {
    child: Child,
    stdin: Option<ChildStdin>,
    lifecycle: ProcessLifecycle,
    exit_code: Option<i32>,
    tail: StderrTail,
    drain: Option<JoinHandle<()>>,
}

impl FfmpegCapture {
    fn record_exit(&mut self, code: i32, how: Termination) -> i32 {
        // A second terminate only happens after an earlier poll saw the exit
        let _ = self.lifecycle.terminate(how);
        self.exit_code = Some(code);
        code
    }

    async fn collect_tail(&mut self) -> String {
        if let Some(drain) = self.drain.take() {
            if tokio::time::timeout(Duration::from_secs(1), drain).await.is_err() {
                debug!("encoder stderr still open after exit");
            }
        }
        self.tail.joined()
    }
}

#[async_trait]
impl CaptureProcess for FfmpegCapture {
    fn try_exit_code(&mut self) -> Option<i32> {
        if self.exit_code.is_some() {
            return self.exit_code;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                let code = status.code().unwrap_or(UNKNOWN_EXIT_CODE);
                Some(self.record_exit(code, Termination::Exited))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "failed to poll encoder status");
                None
            }
        }
    }

    async fn request_stop(&mut self) -> Result<(), RecordingError> {
        self.lifecycle
            .signal()
            .map_err(|e| RecordingError::SignalFailed(e.to_string()))?;

        let mut stdin = self
            .stdin
            .take()
            .ok_or_else(|| RecordingError::SignalFailed("stdin already closed".to_string()))?;
        stdin
            .write_all(GRACEFUL_STOP)
            .await
            .map_err(|e| RecordingError::SignalFailed(e.to_string()))?;
        stdin
            .flush()
            .await
            .map_err(|e| RecordingError::SignalFailed(e.to_string()))?;
        Ok(())
    }

    async fn reap(&mut self, graceful: Duration, kill: Duration) -> ProcessExit {
        if let Some(code) = self.try_exit_code() {
            return ProcessExit {
                code,
                killed: false,
                stderr_tail: self.collect_tail().await,
            };
        }

        let (code, killed) = match tokio::time::timeout(graceful, self.child.wait()).await {
            Ok(Ok(status)) => {
                let code = status.code().unwrap_or(UNKNOWN_EXIT_CODE);
                (self.record_exit(code, Termination::Exited), false)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "failed to wait for encoder");
                (self.record_exit(UNKNOWN_EXIT_CODE, Termination::Exited), false)
            }
            Err(_) => {
                warn!(
                    state = %self.lifecycle.state(),
                    timeout_secs = graceful.as_secs(),
                    "encoder did not exit in time, killing"
                );
                if let Err(e) = self.child.start_kill() {
                    warn!(error = %e, "failed to kill encoder");
                }
                if tokio::time::timeout(kill, self.child.wait()).await.is_err() {
                    warn!("encoder still alive after kill");
                }
                (self.record_exit(UNKNOWN_EXIT_CODE, Termination::Killed), true)
            }
        };

        // Closing stdin lets an unsignalled encoder see EOF
        self.stdin = None;

        ProcessExit {
            code,
            killed,
            stderr_tail: self.collect_tail().await,
        }
    }
}

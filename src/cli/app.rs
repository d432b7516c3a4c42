//! Main app runner for record mode

use std::collections::HashSet;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::application::ports::{ConfigStore, RecordingLedger};
use crate::application::{
    task_queue, CaptureSessionManager, FinalizationWorker, Finalizer, PlaybackPoller,
};
use crate::domain::config::{AppConfig, RecordSettings, SpotifyConfig};
use crate::domain::error::ConfigError;
use crate::domain::recording::StopReason;
use crate::infrastructure::{
    FfmpegEncoder, HttpCoverFetcher, JsonlLedger, LoftyTagWriter, SpotifyPlayback,
    XdgConfigStore,
};

use super::args::RecordArgs;
use super::presenter::Presenter;
use super::signals::{ShutdownKind, ShutdownSignal};

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Environment variable holding the tracing filter
pub const LOG_ENV: &str = "SPYTOREC_LOG";

/// How long to wait for the finalization worker once its queue is drained
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Grace for the signal task to report which signal stopped the loop
const SIGNAL_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Install the stderr tracing subscriber.
///
/// Filter comes from `SPYTOREC_LOG`, defaulting to `spytorec=info`.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("spytorec=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run record mode until interrupted
pub async fn run_record(args: RecordArgs) -> ExitCode {
    let presenter = Arc::new(Presenter::new());

    let config = load_merged_config(args.to_config()).await;
    let settings = match RecordSettings::try_from(&config) {
        Ok(settings) => settings,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let credentials = config.spotify_or_default();
    if !has_credentials(&credentials) {
        presenter.error(&ConfigError::MissingCredentials.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    if let Err(e) = tokio::fs::create_dir_all(&settings.output_dir).await {
        presenter.error(&format!(
            "Cannot create output directory {}: {}",
            settings.output_dir.display(),
            e
        ));
        return ExitCode::from(EXIT_ERROR);
    }

    presenter.settings(&settings);

    let ledger = Arc::new(JsonlLedger::in_dir(&settings.output_dir));
    let recorded = match ledger.recorded_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "could not load ledger, starting empty");
            presenter.warn(&format!("Could not read {}: {}", ledger.path().display(), e));
            HashSet::new()
        }
    };
    info!(count = recorded.len(), path = %ledger.path().display(), "ledger loaded");
    if !recorded.is_empty() {
        presenter.info(&format!("{} track(s) already recorded", recorded.len()));
    }

    // Finalization pipeline
    let encoder = Arc::new(FfmpegEncoder::new());
    let (queue, receiver) = task_queue();
    let finalizer = Finalizer::new(
        Arc::clone(&encoder),
        LoftyTagWriter::new(),
        HttpCoverFetcher::new(),
        Arc::clone(&ledger),
    );
    let worker_presenter = Arc::clone(&presenter);
    let worker = FinalizationWorker::new(finalizer, receiver)
        .on_outcome(Arc::new(move |outcome| worker_presenter.finalization(outcome)));
    let worker_handle = tokio::spawn(worker.run());

    let manager = Arc::new(CaptureSessionManager::new(
        encoder,
        queue.clone(),
        settings,
    ));

    let shutdown = ShutdownSignal::new();
    let signal_handle = match shutdown.setup() {
        Ok(handle) => handle,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            queue.shutdown();
            let _ = worker_handle.await;
            return ExitCode::from(EXIT_ERROR);
        }
    };

    // Poll loop
    let poll_presenter = Arc::clone(&presenter);
    let mut poller = PlaybackPoller::new(
        SpotifyPlayback::new(credentials),
        Arc::clone(&manager),
        recorded,
    )
    .on_status(Arc::new(move |status| poll_presenter.poll_status(status)));

    presenter.start_spinner("Waiting for Spotify playback...");
    let shutdown_rx = shutdown.subscribe();
    let loop_result = tokio::spawn(async move { poller.run(shutdown_rx).await }).await;
    presenter.stop_spinner();

    let reason = match loop_result {
        Err(e) => {
            error!(error = %e, "poll loop crashed");
            presenter.error(&format!("Main loop error: {}", e));
            signal_handle.abort();
            StopReason::LoopError
        }
        Ok(()) => stop_reason(received_signal(signal_handle, SIGNAL_JOIN_TIMEOUT).await),
    };
    presenter.info("Shutting down...");

    if manager.stop(reason).await {
        presenter.info(&format!("Stopped active recording ({})", reason));
    }
    // Anything started after the first stop
    manager.stop(StopReason::Shutdown).await;

    // Drain the queue, then wait for the worker
    let pending = queue.pending();
    if pending > 0 {
        presenter.start_spinner(&format!("Finalizing {} recording(s)...", pending));
    }
    queue.shutdown();
    queue.join().await;
    presenter.stop_spinner();

    let exit = match tokio::time::timeout(WORKER_JOIN_TIMEOUT, worker_handle).await {
        Ok(Ok(())) => EXIT_SUCCESS,
        Ok(Err(e)) => {
            error!(error = %e, "finalization worker crashed");
            presenter.error(&format!("Finalization worker crashed: {}", e));
            EXIT_ERROR
        }
        Err(_) => {
            warn!("finalization worker did not stop in time");
            presenter.warn("Finalization worker did not stop in time, exiting anyway");
            EXIT_ERROR
        }
    };

    if exit == EXIT_SUCCESS {
        presenter.success("Done");
    }
    ExitCode::from(exit)
}

/// Which signal the handler task saw, waiting at most `wait` for it to report
async fn received_signal(handle: JoinHandle<ShutdownKind>, wait: Duration) -> Option<ShutdownKind> {
    let abort = handle.abort_handle();
    match tokio::time::timeout(wait, handle).await {
        Ok(Ok(kind)) => Some(kind),
        Ok(Err(_)) => None,
        Err(_) => {
            abort.abort();
            None
        }
    }
}

/// SIGTERM stops the capture as a shutdown; anything else counts as Ctrl+C
fn stop_reason(signal: Option<ShutdownKind>) -> StopReason {
    match signal {
        Some(ShutdownKind::Terminate) => StopReason::Shutdown,
        Some(ShutdownKind::Interrupt) | None => StopReason::UserInterrupted,
    }
}

/// An access token alone, or the full refresh-token grant
pub fn has_credentials(spotify: &SpotifyConfig) -> bool {
    spotify.access_token.is_some()
        || (spotify.client_id.is_some()
            && spotify.client_secret.is_some()
            && spotify.refresh_token.is_some())
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// The environment layer of the configuration stack
pub fn env_config() -> AppConfig {
    let spotify = SpotifyConfig {
        client_id: env_value("SPOTIFY_CLIENT_ID"),
        client_secret: env_value("SPOTIFY_CLIENT_SECRET"),
        refresh_token: env_value("SPOTIFY_REFRESH_TOKEN"),
        access_token: env_value("SPOTIFY_ACCESS_TOKEN"),
    };
    let any_spotify = spotify.client_id.is_some()
        || spotify.client_secret.is_some()
        || spotify.refresh_token.is_some()
        || spotify.access_token.is_some();

    AppConfig {
        ffmpeg_path: env_value("SPYTOREC_FFMPEG"),
        spotify: any_spotify.then_some(spotify),
        ..Default::default()
    }
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, path = %store.path().display(), "ignoring unreadable config file");
            AppConfig::empty()
        }
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config())
        .merge(cli_config)
}

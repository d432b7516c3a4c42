//! CLI presenter for output formatting

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::{FinalizationOutcome, PollStatus};
use crate::domain::config::RecordSettings;
use crate::domain::track::format_clock;

/// Presenter for CLI output formatting.
///
/// Shared between the poll loop and the finalization worker; status lines
/// are printed above the live spinner while it runs.
pub struct Presenter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn current_spinner(&self) -> Option<ProgressBar> {
        self.spinner.lock().ok().and_then(|s| s.clone())
    }

    /// Start a spinner with message
    pub fn start_spinner(&self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(old) = slot.replace(spinner) {
                old.finish_and_clear();
            }
        }
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(spinner) = self.current_spinner() {
            spinner.set_message(message.to_string());
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&self) {
        if let Some(spinner) = self.spinner.lock().ok().and_then(|mut s| s.take()) {
            spinner.finish_and_clear();
        }
    }

    /// Print a line to stderr, above the spinner if one is running
    fn line(&self, text: String) {
        match self.current_spinner() {
            Some(spinner) => spinner.println(text),
            None => eprintln!("{}", text),
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        self.line(format!("{} {}", "ℹ".cyan(), message));
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        self.line(format!("{} {}", "✓".green(), message));
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        self.line(format!("{} {}", "⚠".yellow(), message));
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        self.line(format!("{} {}", "✗".red(), message));
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Live status text for an active capture
    pub fn format_recording(&self, title: &str, elapsed_secs: f64, total_secs: f64) -> String {
        format!(
            "Recording: {} [{} / {}]",
            title,
            format_clock(elapsed_secs),
            format_clock(total_secs)
        )
    }

    /// Render one poll tick
    pub fn poll_status(&self, status: &PollStatus) {
        match status {
            PollStatus::Idle => self.update_spinner("Waiting for Spotify playback..."),
            PollStatus::AlreadyHandled { title } => {
                self.update_spinner(&format!("Already recorded: {}", title))
            }
            PollStatus::SkippedExisting { title, path } => {
                self.info(&format!(
                    "Skipping '{}': {} already exists",
                    title,
                    display_name(path)
                ));
                self.update_spinner("Waiting for next track...");
            }
            PollStatus::Recording {
                title,
                elapsed_secs,
                total_secs,
            } => self.update_spinner(&self.format_recording(title, *elapsed_secs, *total_secs)),
            PollStatus::Started {
                title,
                artist,
                path,
                target_secs,
            } => {
                self.line(format!(
                    "{} Recording {} - {} ({}) -> {}",
                    "●".red(),
                    artist.bold(),
                    title.bold(),
                    format_clock(*target_secs),
                    display_name(path)
                ));
                self.update_spinner(&self.format_recording(title, 0.0, *target_secs));
            }
            PollStatus::StartFailed {
                title,
                message,
                will_retry,
            } => {
                if *will_retry {
                    self.error(&format!("Could not start recording '{}': {}", title, message));
                } else {
                    self.info(&format!("Not recording '{}': {}", title, message));
                }
            }
            PollStatus::Stopped { title, reason } => {
                self.info(&format!("Stopped '{}' ({})", title, reason));
            }
        }
    }

    /// Report the result of a finalization
    pub fn finalization(&self, outcome: &FinalizationOutcome) {
        match outcome {
            FinalizationOutcome::Finalized {
                file_name,
                recorded_secs,
                header_rewritten,
                tagged,
                ..
            } => {
                let mut notes = Vec::new();
                if !header_rewritten {
                    notes.push("header not rewritten");
                }
                if !tagged {
                    notes.push("untagged");
                }
                let suffix = if notes.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", notes.join(", ")).yellow().to_string()
                };
                self.success(&format!(
                    "Saved {} [{}]{}",
                    file_name,
                    format_clock(*recorded_secs),
                    suffix
                ));
            }
            FinalizationOutcome::Rejected {
                title,
                exit_code,
                file_deleted,
            } => {
                let action = if *file_deleted { ", file deleted" } else { "" };
                self.warn(&format!(
                    "Discarded '{}' (FFmpeg exit code {}{})",
                    title, exit_code, action
                ));
            }
            FinalizationOutcome::Failed { title, message } => {
                self.error(&format!("Failed to finalize '{}': {}", title, message));
            }
        }
    }

    /// Print the effective record settings
    pub fn settings(&self, settings: &RecordSettings) {
        self.key_value("Output directory", &settings.output_dir.display().to_string());
        self.key_value("Format", &settings.format.to_string());
        if settings.format == crate::domain::recording::AudioFormat::Ogg {
            self.key_value("OGG quality", &settings.ogg_quality.to_string());
        }
        self.key_value("Device", &settings.device);
        self.key_value("FFmpeg", &settings.ffmpeg_path.display().to_string());
        self.key_value(
            "Polling interval",
            &format!("{}s", settings.interval.as_secs_f64()),
        );
        self.key_value("Min duration", &format!("{}s", settings.min_duration_secs));
        self.key_value(
            "Recording buffer",
            &format!("{}s", settings.recording_buffer_secs),
        );
        self.key_value("Skip existing", &settings.skip_existing_file.to_string());
        self.key_value("Organize", &settings.organize.to_string());
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

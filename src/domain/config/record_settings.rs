//! Validated settings for record mode

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::error::ConfigError;
use crate::domain::recording::{AudioFormat, DEFAULT_OGG_QUALITY};
use crate::domain::track::OutputLayout;

use super::app_config::{
    default_device, AppConfig, DEFAULT_INTERVAL_SECS, DEFAULT_MIN_DURATION_SECS,
    DEFAULT_RECORDING_BUFFER_SECS,
};

/// Name of the ledger file kept in the output directory
pub const LEDGER_FILE_NAME: &str = "spytorec_metadata.jsonl";

/// Maximum accepted Vorbis quality
pub const MAX_OGG_QUALITY: u8 = 10;

/// Record-mode settings, parsed and validated once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSettings {
    pub output_dir: PathBuf,
    pub format: AudioFormat,
    pub ogg_quality: u8,
    pub interval: Duration,
    pub device: String,
    pub ffmpeg_path: PathBuf,
    pub skip_existing_file: bool,
    pub min_duration_secs: u64,
    pub recording_buffer_secs: f64,
    pub organize: bool,
}

impl RecordSettings {
    /// Output layout derived from these settings
    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(self.output_dir.clone(), self.format, self.organize)
    }

    /// Path of the ledger file for this output directory
    pub fn ledger_path(&self) -> PathBuf {
        self.output_dir.join(LEDGER_FILE_NAME)
    }

    /// Capture duration for a track of the given nominal length:
    /// `max(0.1, nominal + buffer)` seconds
    pub fn target_duration_secs(&self, nominal_secs: f64) -> f64 {
        (nominal_secs + self.recording_buffer_secs).max(0.1)
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.into(),
    }
}

impl TryFrom<&AppConfig> for RecordSettings {
    type Error = ConfigError;

    fn try_from(config: &AppConfig) -> Result<Self, Self::Error> {
        let format = match config.format.as_deref() {
            Some(s) => s
                .parse::<AudioFormat>()
                .map_err(|e| invalid("format", e.to_string()))?,
            None => AudioFormat::default(),
        };

        let ogg_quality = config.ogg_quality.unwrap_or(DEFAULT_OGG_QUALITY);
        if ogg_quality > MAX_OGG_QUALITY {
            return Err(invalid("ogg_quality", "Value must be between 0 and 10"));
        }

        let interval_secs = config.interval.unwrap_or(DEFAULT_INTERVAL_SECS);
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(invalid("interval", "Value must be a positive number of seconds"));
        }

        let recording_buffer_secs = config
            .recording_buffer
            .unwrap_or(DEFAULT_RECORDING_BUFFER_SECS);
        if !recording_buffer_secs.is_finite() {
            return Err(invalid("recording_buffer", "Value must be a finite number"));
        }

        let device = config
            .device
            .clone()
            .unwrap_or_else(|| default_device().to_string());
        if device.trim().is_empty() {
            return Err(invalid("device", "Value must not be empty"));
        }

        Ok(Self {
            output_dir: PathBuf::from(config.output_directory_or_default()),
            format,
            ogg_quality,
            interval: Duration::from_secs_f64(interval_secs),
            device,
            ffmpeg_path: PathBuf::from(config.ffmpeg_path_or_default()),
            skip_existing_file: config.skip_existing_file.unwrap_or(false),
            min_duration_secs: config.min_duration.unwrap_or(DEFAULT_MIN_DURATION_SECS),
            recording_buffer_secs,
            organize: config.organize.unwrap_or(false),
        })
    }
}

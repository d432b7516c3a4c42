//! Application configuration value object

use serde::{Deserialize, Serialize};

use crate::domain::recording::{AudioFormat, DEFAULT_OGG_QUALITY};

/// Default output directory for recordings
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "Recordings";
/// Default poll interval in seconds
pub const DEFAULT_INTERVAL_SECS: f64 = 0.5;
/// Default minimum track duration in seconds
pub const DEFAULT_MIN_DURATION_SECS: u64 = 25;
/// Default capture buffer in seconds (negative compensates start/stop latency)
pub const DEFAULT_RECORDING_BUFFER_SECS: f64 = -0.2;
/// Default FFmpeg binary
pub const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";

/// Default capture device for the current platform
pub fn default_device() -> &'static str {
    if cfg!(target_os = "windows") {
        "audio=CABLE Output (VB-Audio Virtual Cable)"
    } else if cfg!(target_os = "macos") {
        "0"
    } else {
        "default"
    }
}

/// Spotify API credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub output_directory: Option<String>,
    pub format: Option<String>,
    pub ogg_quality: Option<u8>,
    pub interval: Option<f64>,
    pub device: Option<String>,
    pub ffmpeg_path: Option<String>,
    pub skip_existing_file: Option<bool>,
    pub min_duration: Option<u64>,
    pub recording_buffer: Option<f64>,
    pub organize: Option<bool>,
    pub spotify: Option<SpotifyConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            output_directory: Some(DEFAULT_OUTPUT_DIRECTORY.to_string()),
            format: Some(AudioFormat::default().to_string()),
            ogg_quality: Some(DEFAULT_OGG_QUALITY),
            interval: Some(DEFAULT_INTERVAL_SECS),
            device: Some(default_device().to_string()),
            ffmpeg_path: Some(DEFAULT_FFMPEG_PATH.to_string()),
            skip_existing_file: Some(false),
            min_duration: Some(DEFAULT_MIN_DURATION_SECS),
            recording_buffer: Some(DEFAULT_RECORDING_BUFFER_SECS),
            organize: Some(false),
            spotify: None,
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            output_directory: other.output_directory.or(self.output_directory),
            format: other.format.or(self.format),
            ogg_quality: other.ogg_quality.or(self.ogg_quality),
            interval: other.interval.or(self.interval),
            device: other.device.or(self.device),
            ffmpeg_path: other.ffmpeg_path.or(self.ffmpeg_path),
            skip_existing_file: other.skip_existing_file.or(self.skip_existing_file),
            min_duration: other.min_duration.or(self.min_duration),
            recording_buffer: other.recording_buffer.or(self.recording_buffer),
            organize: other.organize.or(self.organize),
            spotify: Self::merge_spotify_config(self.spotify, other.spotify),
        }
    }

    /// Merge Spotify credential sections
    fn merge_spotify_config(
        base: Option<SpotifyConfig>,
        other: Option<SpotifyConfig>,
    ) -> Option<SpotifyConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(SpotifyConfig {
                client_id: o.client_id.or(b.client_id),
                client_secret: o.client_secret.or(b.client_secret),
                refresh_token: o.refresh_token.or(b.refresh_token),
                access_token: o.access_token.or(b.access_token),
            }),
        }
    }

    /// Get output directory, or "Recordings" if not set
    pub fn output_directory_or_default(&self) -> &str {
        self.output_directory
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_DIRECTORY)
    }

    /// Get FFmpeg path, or "ffmpeg" if not set
    pub fn ffmpeg_path_or_default(&self) -> &str {
        self.ffmpeg_path.as_deref().unwrap_or(DEFAULT_FFMPEG_PATH)
    }

    /// Get Spotify credentials section, or an empty one
    pub fn spotify_or_default(&self) -> SpotifyConfig {
        self.spotify.clone().unwrap_or_default()
    }
}

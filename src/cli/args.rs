//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::config::AppConfig;
use crate::domain::recording::AudioFormat;

/// SpytoRec - record what Spotify is playing, one tagged file per track
#[derive(Parser, Debug)]
#[command(name = "spytorec")]
#[command(version)]
#[command(about = "Record the currently playing Spotify track with FFmpeg")]
#[command(long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Record options when no subcommand is given
    #[command(flatten)]
    pub record: RecordArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Record options, whether given bare or after `record`
    pub fn record_args(&self) -> Option<&RecordArgs> {
        match &self.command {
            None => Some(&self.record),
            Some(Commands::Record(args)) => Some(args),
            Some(Commands::Config { .. }) => None,
        }
    }
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record tracks as they play (default action)
    #[command(visible_alias = "rec")]
    Record(RecordArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for record mode. Unset options fall back to config, then defaults.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RecordArgs {
    /// Audio format
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<FormatArg>,

    /// Output directory
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// OGG quality (0-10)
    #[arg(long, value_name = "Q")]
    pub quality: Option<u8>,

    /// Polling interval in seconds
    #[arg(long, value_name = "SECS")]
    pub interval: Option<f64>,

    /// Audio input device for FFmpeg
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Path to the FFmpeg executable
    #[arg(long, value_name = "PATH")]
    pub ffmpeg_path: Option<String>,

    /// Skip tracks whose output file already exists
    #[arg(long, overrides_with = "no_skip_existing_file")]
    pub skip_existing_file: bool,

    #[arg(long, overrides_with = "skip_existing_file", hide = true)]
    pub no_skip_existing_file: bool,

    /// Minimum track duration to record, in seconds
    #[arg(long, value_name = "SECS")]
    pub min_duration: Option<u64>,

    /// Seconds added to the track duration for the capture length (may be negative)
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    pub recording_buffer: Option<f64>,

    /// Organize into Artist/Album folders
    #[arg(long, overrides_with = "no_organize")]
    pub organize: bool,

    #[arg(long, overrides_with = "organize", hide = true)]
    pub no_organize: bool,
}

/// Resolve a `--flag` / `--no-flag` pair; `None` when neither was given
fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl RecordArgs {
    /// The CLI layer of the configuration stack
    pub fn to_config(&self) -> AppConfig {
        AppConfig {
            output_directory: self.dir.as_ref().map(|d| d.to_string_lossy().to_string()),
            format: self.format.map(|f| AudioFormat::from(f).to_string()),
            ogg_quality: self.quality,
            interval: self.interval,
            device: self.device.clone(),
            ffmpeg_path: self.ffmpeg_path.clone(),
            skip_existing_file: flag_pair(self.skip_existing_file, self.no_skip_existing_file),
            min_duration: self.min_duration,
            recording_buffer: self.recording_buffer,
            organize: flag_pair(self.organize, self.no_organize),
            spotify: None,
        }
    }
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Format argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Flac,
    Ogg,
}

impl From<FormatArg> for AudioFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Flac => AudioFormat::Flac,
            FormatArg::Ogg => AudioFormat::Ogg,
        }
    }
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "output_directory",
    "format",
    "ogg_quality",
    "interval",
    "device",
    "ffmpeg_path",
    "skip_existing_file",
    "min_duration",
    "recording_buffer",
    "organize",
    "spotify.client_id",
    "spotify.client_secret",
    "spotify.refresh_token",
    "spotify.access_token",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

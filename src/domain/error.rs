//! Domain error types

use thiserror::Error;

/// Error when an unsupported audio format is requested
#[derive(Debug, Clone, Error)]
#[error("Unsupported format: \"{input}\". Supported formats are: flac, ogg")]
pub struct InvalidFormatError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),

    #[error("Missing Spotify credentials. Set SPOTIFY_ACCESS_TOKEN, or SPOTIFY_CLIENT_ID, SPOTIFY_CLIENT_SECRET and SPOTIFY_REFRESH_TOKEN (or configure via 'spytorec config set')")]
    MissingCredentials,
}

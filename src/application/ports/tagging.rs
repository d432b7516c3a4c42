//! Tagging and cover art port interfaces

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Tag embedding errors
#[derive(Debug, Clone, Error)]
pub enum TaggingError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Failed to read audio file: {0}")]
    ReadFailed(String),

    #[error("Failed to write tags: {0}")]
    WriteFailed(String),
}

/// Cover download errors
#[derive(Debug, Clone, Error)]
pub enum CoverError {
    #[error("Cover request failed: {0}")]
    RequestFailed(String),

    #[error("Cover server returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Empty cover image")]
    Empty,
}

/// Descriptive text tags for a recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
}

/// Port for writing tags into an audio file in place
pub trait TagWriter: Send + Sync {
    /// Set title/artist/album and, when `cover_jpeg` points at an image
    /// file, embed it as the front cover (formats that support it only).
    fn write_tags(
        &self,
        path: &Path,
        tags: &TrackTags,
        cover_jpeg: Option<&Path>,
    ) -> Result<(), TaggingError>;
}

/// Port for downloading cover art
#[async_trait]
pub trait CoverFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, CoverError>;
}

//! Playback source port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::track::TrackSnapshot;

/// Playback fetch errors
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error("Invalid or expired access token")]
    Unauthorized,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),
}

/// Port for reading what the streaming service is currently playing
#[async_trait]
pub trait PlaybackSource: Send + Sync {
    /// Fetch the current playback state.
    ///
    /// # Returns
    /// `Ok(None)` when nothing (or nothing track-shaped) is playing
    async fn current_playback(&self) -> Result<Option<TrackSnapshot>, PlaybackError>;
}

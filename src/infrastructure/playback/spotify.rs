//! Spotify Web API playback adapter

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::application::ports::{PlaybackError, PlaybackSource};
use crate::domain::config::SpotifyConfig;
use crate::domain::track::{TrackSnapshot, UNKNOWN_ALBUM};

/// Spotify Web API base URL
pub const API_BASE_URL: &str = "https://api.spotify.com";

/// Spotify accounts service base URL
pub const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Refresh this long before the reported expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// Response types for the Spotify API

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(default)]
    is_playing: bool,
    item: Option<PlayerItem>,
}

#[derive(Debug, Deserialize)]
struct PlayerItem {
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    artists: Vec<ArtistRef>,
    album: Option<AlbumRef>,
    duration_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    name: Option<String>,
    #[serde(default)]
    images: Vec<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Cached bearer token
#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .map_or(true, |deadline| Instant::now() + EXPIRY_MARGIN < deadline)
    }
}

/// Spotify playback source
pub struct SpotifyPlayback {
    client: reqwest::Client,
    api_base: String,
    accounts_base: String,
    credentials: SpotifyConfig,
    token: Mutex<Option<AccessToken>>,
}

impl SpotifyPlayback {
    /// Create a client against the public Spotify endpoints
    pub fn new(credentials: SpotifyConfig) -> Self {
        Self::with_base_urls(credentials, API_BASE_URL, ACCOUNTS_BASE_URL)
    }

    /// Create a client against custom endpoints
    pub fn with_base_urls(
        credentials: SpotifyConfig,
        api_base: impl Into<String>,
        accounts_base: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let token = credentials.access_token.clone().map(|value| AccessToken {
            value,
            expires_at: None,
        });

        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            accounts_base: accounts_base.into().trim_end_matches('/').to_string(),
            credentials,
            token: Mutex::new(token),
        }
    }

    /// Whether a refresh-token grant is configured
    pub fn can_refresh(&self) -> bool {
        self.credentials.refresh_token.is_some()
            && self.credentials.client_id.is_some()
            && self.credentials.client_secret.is_some()
    }

    fn player_url(&self) -> String {
        format!("{}/v1/me/player", self.api_base)
    }

    fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_base)
    }

    /// Current bearer token, refreshing when absent or about to expire
    async fn bearer(&self) -> Result<String, PlaybackError> {
        {
            let token = self.token.lock().await;
            if let Some(token) = token.as_ref() {
                if token.is_fresh() || !self.can_refresh() {
                    return Ok(token.value.clone());
                }
            }
        }
        self.refresh().await
    }

    /// Exchange the refresh token for a new access token
    async fn refresh(&self) -> Result<String, PlaybackError> {
        let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
            self.credentials.client_id.as_deref(),
            self.credentials.client_secret.as_deref(),
            self.credentials.refresh_token.as_deref(),
        ) else {
            return Err(PlaybackError::TokenRefreshFailed(
                "no refresh token and client credentials configured".to_string(),
            ));
        };

        let response = self
            .client
            .post(self.token_url())
            .basic_auth(client_id, Some(client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| PlaybackError::TokenRefreshFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PlaybackError::TokenRefreshFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| PlaybackError::ParseError(e.to_string()))?;

        info!("spotify access token refreshed");
        let value = body.access_token.clone();
        *self.token.lock().await = Some(AccessToken {
            value: body.access_token,
            expires_at: body
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        });
        Ok(value)
    }

    async fn fetch_player(&self, token: &str) -> Result<reqwest::Response, PlaybackError> {
        self.client
            .get(self.player_url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlaybackError::Timeout
                } else {
                    PlaybackError::RequestFailed(e.to_string())
                }
            })
    }

    /// Convert a player response into a snapshot; non-track items yield none
    fn to_snapshot(response: PlayerResponse) -> Option<TrackSnapshot> {
        let item = response.item?;
        if item.kind.as_deref() != Some("track") {
            return None;
        }

        let (album, cover_url) = match item.album {
            Some(album) => (
                album.name.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
                album.images.into_iter().next().map(|image| image.url),
            ),
            None => (UNKNOWN_ALBUM.to_string(), None),
        };

        Some(TrackSnapshot {
            id: item.id?,
            title: item.name.unwrap_or_default(),
            artists: item.artists.into_iter().map(|a| a.name).collect(),
            album,
            cover_url,
            duration_ms: item.duration_ms.unwrap_or(0),
            is_playing: response.is_playing,
        })
    }
}

#[async_trait]
impl PlaybackSource for SpotifyPlayback {
    async fn current_playback(&self) -> Result<Option<TrackSnapshot>, PlaybackError> {
        let token = self.bearer().await?;
        let mut response = self.fetch_player(&token).await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED && self.can_refresh() {
            debug!("access token rejected, refreshing");
            let token = self.refresh().await?;
            response = self.fetch_player(&token).await?;
        }

        let status = response.status();

        // Handle HTTP errors
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(PlaybackError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PlaybackError::RateLimited);
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PlaybackError::RequestFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PlaybackError::RequestFailed(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let player: PlayerResponse =
            serde_json::from_str(&body).map_err(|e| PlaybackError::ParseError(e.to_string()))?;
        Ok(Self::to_snapshot(player))
    }
}

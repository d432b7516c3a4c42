//! Track snapshot value object

/// Album name used when the service reports none
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Artist name used when the service reports no artists
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Point-in-time description of what the playback service reports as playing.
/// Produced fresh on every poll and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSnapshot {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub cover_url: Option<String>,
    pub duration_ms: u64,
    pub is_playing: bool,
}

impl TrackSnapshot {
    /// All artists joined for display and tagging ("A & B")
    pub fn artist_display(&self) -> String {
        self.artists.join(" & ")
    }

    /// First listed artist, used for the artist folder
    pub fn primary_artist(&self) -> &str {
        self.artists
            .first()
            .map(String::as_str)
            .unwrap_or(UNKNOWN_ARTIST)
    }

    /// Nominal track duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

/// Format seconds as `mm:ss`, or `--:--` for negative / non-finite input
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "--:--".to_string();
    }
    let total = seconds as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

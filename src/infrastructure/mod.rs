//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with external systems like FFmpeg, the Spotify Web API,
//! audio tag containers and the filesystem.

pub mod config;
pub mod cover;
pub mod encoder;
pub mod ledger;
pub mod playback;
pub mod tagging;

// Re-export adapters
pub use config::XdgConfigStore;
pub use cover::HttpCoverFetcher;
pub use encoder::FfmpegEncoder;
pub use ledger::JsonlLedger;
pub use playback::SpotifyPlayback;
pub use tagging::LoftyTagWriter;

//! Playback state infrastructure module

mod spotify;

pub use spotify::{SpotifyPlayback, ACCOUNTS_BASE_URL, API_BASE_URL};

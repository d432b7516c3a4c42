//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod config;
pub mod encoder;
pub mod ledger;
pub mod playback;
pub mod tagging;

// Re-export common types
pub use config::ConfigStore;
pub use encoder::{
    CaptureProcess, CaptureRequest, Encoder, ProcessExit, RecordingError, RewriteOutput,
    SIGNALLED_EXIT_CODE, UNKNOWN_EXIT_CODE,
};
pub use ledger::{LedgerError, RecordingLedger};
pub use playback::{PlaybackError, PlaybackSource};
pub use tagging::{CoverError, CoverFetcher, TagWriter, TaggingError, TrackTags};

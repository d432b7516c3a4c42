//! Why a capture session was stopped

use std::fmt;

/// Reason a capture session was handed off to finalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The encoder process exited on its own (target duration reached or crash)
    EncoderExited,
    /// Nothing is playing any more, or the track became unavailable
    PlaybackStopped,
    /// A different track started playing
    TrackChanged,
    /// The user interrupted the recorder
    UserInterrupted,
    /// The recorder is shutting down with a capture still active
    Shutdown,
    /// The poll loop hit a fatal error
    LoopError,
}

impl StopReason {
    /// Human-readable reason, also written to the ledger
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EncoderExited => "FFmpeg process ended",
            Self::PlaybackStopped => "Playback stopped or track unavailable",
            Self::TrackChanged => "Track changed",
            Self::UserInterrupted => "User interrupted",
            Self::Shutdown => "Shutdown",
            Self::LoopError => "Main loop error",
        }
    }

    /// Stops initiated by the recorder rather than by the encoder.
    ///
    /// A capture cut short this way is accepted when its file is usable,
    /// regardless of the encoder's exit code.
    pub const fn is_early_stop(&self) -> bool {
        !matches!(self, Self::EncoderExited)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

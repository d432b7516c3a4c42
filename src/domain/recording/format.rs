//! Audio output format value object

use std::fmt;
use std::str::FromStr;

use crate::domain::error::InvalidFormatError;

/// Default Vorbis quality for OGG output (FFmpeg `-qscale:a`, 0-10)
pub const DEFAULT_OGG_QUALITY: u8 = 7;

/// Supported output container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AudioFormat {
    #[default]
    Flac,
    Ogg,
}

impl AudioFormat {
    /// File extension (without dot)
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Ogg => "ogg",
        }
    }

    /// Whether the container can carry an embedded cover image
    pub const fn supports_cover_art(&self) -> bool {
        matches!(self, Self::Flac)
    }

    /// FFmpeg codec arguments for a capture into this format
    pub fn codec_args(&self, ogg_quality: u8) -> Vec<String> {
        match self {
            Self::Flac => vec![
                "-acodec".to_string(),
                "flac".to_string(),
                "-vn".to_string(),
            ],
            Self::Ogg => vec![
                "-acodec".to_string(),
                "libvorbis".to_string(),
                "-qscale:a".to_string(),
                ogg_quality.to_string(),
                "-vn".to_string(),
            ],
        }
    }
}

impl FromStr for AudioFormat {
    type Err = InvalidFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flac" => Ok(Self::Flac),
            "ogg" => Ok(Self::Ogg),
            _ => Err(InvalidFormatError {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

//! Output file layout for recorded tracks

use std::path::{Path, PathBuf};

use super::sanitize::sanitize_segment;
use super::snapshot::TrackSnapshot;
use crate::domain::recording::AudioFormat;

/// File name for a track: `"<artist> - <title>.<ext>"`, both parts sanitized
pub fn track_file_name(artist_display: &str, title: &str, format: AudioFormat) -> String {
    format!(
        "{} - {}.{}",
        sanitize_segment(artist_display),
        sanitize_segment(title),
        format.extension()
    )
}

/// Where recordings are written under an output root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    format: AudioFormat,
    organize: bool,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, format: AudioFormat, organize: bool) -> Self {
        Self {
            root: root.into(),
            format,
            organize,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Directory a track's file lives in: the root, or `root/<artist>/<album>`
    pub fn directory_for(&self, track: &TrackSnapshot) -> PathBuf {
        if self.organize {
            self.root
                .join(sanitize_segment(track.primary_artist()))
                .join(sanitize_segment(&track.album))
        } else {
            self.root.clone()
        }
    }

    /// Full output path for a track
    pub fn path_for(&self, track: &TrackSnapshot) -> PathBuf {
        self.directory_for(track).join(track_file_name(
            &track.artist_display(),
            &track.title,
            self.format,
        ))
    }
}

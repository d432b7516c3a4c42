//! Tag writer adapter using lofty

use std::path::Path;

use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::Tag;
use tracing::debug;

use crate::application::ports::{TagWriter, TaggingError, TrackTags};

/// Writes Vorbis comments (and FLAC front covers) in place
#[derive(Debug, Default, Clone)]
pub struct LoftyTagWriter;

impl LoftyTagWriter {
    pub fn new() -> Self {
        Self
    }
}

impl TagWriter for LoftyTagWriter {
    fn write_tags(
        &self,
        path: &Path,
        tags: &TrackTags,
        cover_jpeg: Option<&Path>,
    ) -> Result<(), TaggingError> {
        let probe = Probe::open(path)
            .map_err(|e| TaggingError::ReadFailed(e.to_string()))?
            .guess_file_type()
            .map_err(|e| TaggingError::ReadFailed(e.to_string()))?;

        let file_type = probe
            .file_type()
            .ok_or_else(|| TaggingError::UnsupportedFile(path.display().to_string()))?;

        let mut tagged_file = probe
            .read()
            .map_err(|e| TaggingError::ReadFailed(e.to_string()))?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.primary_tag().is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .primary_tag_mut()
            .ok_or_else(|| TaggingError::WriteFailed("no writable tag".to_string()))?;

        tag.set_title(tags.title.clone());
        tag.set_artist(tags.artist.clone());
        tag.set_album(tags.album.clone());

        if let Some(cover) = cover_jpeg {
            if file_type == lofty::file::FileType::Flac {
                let data = std::fs::read(cover)
                    .map_err(|e| TaggingError::ReadFailed(e.to_string()))?;
                tag.remove_picture_type(PictureType::CoverFront);
                tag.push_picture(Picture::new_unchecked(
                    PictureType::CoverFront,
                    Some(MimeType::Jpeg),
                    None,
                    data,
                ));
            } else {
                debug!(path = %path.display(), "format has no cover support, skipping picture");
            }
        }

        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| TaggingError::WriteFailed(e.to_string()))?;

        debug!(path = %path.display(), "tags written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tags() -> TrackTags {
        TrackTags {
            title: "Song".to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
        }
    }

    /// `fLaC` marker plus a lone STREAMINFO block: 44.1 kHz, stereo, 16 bit
    fn minimal_flac() -> Vec<u8> {
        let mut bytes = b"fLaC".to_vec();
        bytes.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]);
        bytes.extend_from_slice(&4096u16.to_be_bytes());
        bytes.extend_from_slice(&4096u16.to_be_bytes());
        bytes.extend_from_slice(&[0; 6]);
        let packed: u64 = (44_100u64 << 44) | (1 << 41) | (15 << 36);
        bytes.extend_from_slice(&packed.to_be_bytes());
        bytes.extend_from_slice(&[0; 16]);
        bytes
    }

    #[test]
    fn writes_tags_and_front_cover_into_flac() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Artist - Song.flac");
        std::fs::write(&path, minimal_flac()).unwrap();
        let cover = dir.path().join("Artist - Song_cover.jpg");
        std::fs::write(&cover, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9]).unwrap();

        LoftyTagWriter::new()
            .write_tags(&path, &tags(), Some(&cover))
            .unwrap();

        let tagged = Probe::open(&path).unwrap().read().unwrap();
        let tag = tagged.primary_tag().unwrap();
        assert_eq!(tag.title().as_deref(), Some("Song"));
        assert_eq!(tag.artist().as_deref(), Some("Artist"));
        assert_eq!(tag.album().as_deref(), Some("Album"));
        assert_eq!(tag.pictures().len(), 1);
        assert_eq!(tag.pictures()[0].pic_type(), PictureType::CoverFront);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let result = LoftyTagWriter::new().write_tags(&dir.path().join("nope.flac"), &tags(), None);
        assert!(matches!(result, Err(TaggingError::ReadFailed(_))));
    }

    #[test]
    fn garbage_flac_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.flac");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let result = LoftyTagWriter::new().write_tags(&path, &tags(), None);
        assert!(result.is_err());
    }
}

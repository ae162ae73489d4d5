//! Audio file metadata extraction.
//!
//! Finalization asks for tags and stream properties of each imported file to
//! feed the naming variables. Extraction is best effort: a file that cannot
//! be read yields empty metadata, never an import failure.

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::ItemKey;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },
}

/// Tags and stream properties of one audio file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMetadata {
    pub duration_secs: Option<f64>,
    /// Lowercase container format, usually the file extension.
    pub format: Option<String>,
    pub bitrate_kbps: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
}

/// Reads metadata from a file on disk.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<FileMetadata, MetadataError>;
}

fn extension_format(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
}

/// Extract, logging and swallowing failures. The format still falls back to
/// the extension so `{Quality}` has something to work with.
pub fn extract_or_default(extractor: &dyn MetadataExtractor, path: &Path) -> FileMetadata {
    match extractor.extract(path) {
        Ok(mut meta) => {
            if meta.format.is_none() {
                meta.format = extension_format(path);
            }
            meta
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "metadata extraction failed: {e}");
            FileMetadata {
                format: extension_format(path),
                ..Default::default()
            }
        }
    }
}

/// Tag reader backed by lofty.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyExtractor;

fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

impl MetadataExtractor for LoftyExtractor {
    fn extract(&self, path: &Path) -> Result<FileMetadata, MetadataError> {
        let tagged = read_from_path(path).map_err(|e| MetadataError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let properties = tagged.properties();
        let duration = properties.duration();
        let mut meta = FileMetadata {
            duration_secs: (!duration.is_zero()).then(|| duration.as_secs_f64()),
            format: extension_format(path),
            bitrate_kbps: properties.audio_bitrate(),
            sample_rate: properties.sample_rate(),
            channels: properties.channels(),
            ..Default::default()
        };

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            meta.title = tag.title().map(|s| s.into_owned());
            meta.artist = tag.artist().map(|s| s.into_owned());
            meta.album = tag.album().map(|s| s.into_owned());
            meta.album_artist = tag.get_string(ItemKey::AlbumArtist).map(str::to_string);
            meta.year = tag
                .get_string(ItemKey::Year)
                .or_else(|| tag.get_string(ItemKey::RecordingDate))
                .and_then(leading_number);
            meta.track_number = tag.track();
            meta.disc_number = tag.disk();
        }

        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl MetadataExtractor for Failing {
        fn extract(&self, path: &Path) -> Result<FileMetadata, MetadataError> {
            Err(MetadataError::Read {
                path: path.display().to_string(),
                message: "boom".to_string(),
            })
        }
    }

    #[test]
    fn failure_yields_extension_only() {
        let meta = extract_or_default(&Failing, Path::new("/tmp/book/Chapter 1.MP3"));
        assert_eq!(meta.format.as_deref(), Some("mp3"));
        assert!(meta.title.is_none());
        assert!(meta.bitrate_kbps.is_none());
    }

    #[test]
    fn lofty_rejects_non_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.xyz");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(LoftyExtractor.extract(&path).is_err());
        let meta = extract_or_default(&LoftyExtractor, &path);
        assert_eq!(meta.format.as_deref(), Some("xyz"));
    }

    #[test]
    fn leading_number_parses_dates() {
        assert_eq!(leading_number("1965"), Some(1965));
        assert_eq!(leading_number("2019-04-01"), Some(2019));
        assert_eq!(leading_number("n/a"), None);
    }
}

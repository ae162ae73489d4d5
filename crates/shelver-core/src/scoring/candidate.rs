//! Normalized search result as produced by an indexer adapter.

use serde::{Deserialize, Serialize};

/// Where a candidate would be fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    #[default]
    Torrent,
    Usenet,
    DirectDownload,
    /// Catalog entry with no payload of its own.
    MetadataOnly,
}

/// One search result. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateResult {
    pub id: String,
    pub title: String,
    pub size_bytes: Option<u64>,
    /// Free-form quality label, e.g. "MP3 320kbps" or "FLAC".
    pub quality: Option<String>,
    pub seeders: Option<u32>,
    pub leechers: Option<u32>,
    /// Usenet / direct-download popularity.
    pub grabs: Option<u32>,
    pub source: SourceKind,
    /// Unix seconds.
    pub published_at: Option<i64>,
    pub language: Option<String>,
    pub format: Option<String>,
}

impl CandidateResult {
    /// Seeders for torrents, grabs for everything else.
    pub fn health(&self) -> u32 {
        match self.source {
            SourceKind::Torrent => self.seeders.unwrap_or(0),
            SourceKind::Usenet | SourceKind::DirectDownload => self.grabs.unwrap_or(0),
            SourceKind::MetadataOnly => 0,
        }
    }

    pub fn size_mb(&self) -> Option<f64> {
        self.size_bytes.map(|b| b as f64 / (1024.0 * 1024.0))
    }
}

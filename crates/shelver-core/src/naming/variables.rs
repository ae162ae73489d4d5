//! Naming variable bindings and the author/title heuristics that feed them.

use std::collections::BTreeMap;

use crate::config::NamingConfig;
use crate::library_db::{Download, MetaKey};
use crate::metadata::FileMetadata;

/// Variable name -> value. Empty values are never stored, so `get` doubles
/// as the "is this variable present" check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingVariables {
    values: BTreeMap<String, String>,
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

impl NamingVariables {
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.values.remove(name);
        } else {
            self.values.insert(name.to_string(), value.trim().to_string());
        }
    }

    pub fn set_opt(&mut self, name: &str, value: Option<impl Into<String>>) {
        match value {
            Some(v) => self.set(name, v),
            None => {
                self.values.remove(name);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Bindings for one file of a completed download.
    ///
    /// Explicit download metadata wins over embedded tags; tags win over what
    /// can be guessed from the release title.
    pub fn for_file(
        download: &Download,
        tags: &FileMetadata,
        naming: &NamingConfig,
        disk_number: Option<u32>,
        chapter_number: Option<u32>,
    ) -> Self {
        let meta = &download.metadata;
        let split = split_author_title(&download.title);

        let title = non_empty(meta.get(MetaKey::BookTitle))
            .or_else(|| non_empty(tags.album.as_deref()))
            .or_else(|| non_empty(tags.title.as_deref()))
            .or_else(|| split.as_ref().map(|(_, t)| t.as_str()))
            .or_else(|| non_empty(Some(download.title.as_str())))
            .unwrap_or(naming.unknown_title.as_str())
            .to_string();

        // A series equal to the title would only repeat the title folder.
        let series = non_empty(meta.get(MetaKey::Series))
            .filter(|s| !s.eq_ignore_ascii_case(&title))
            .map(str::to_string);

        let author = non_empty(meta.get(MetaKey::Author))
            .map(str::to_string)
            .or_else(|| {
                choose_author(
                    tags.artist.as_deref(),
                    tags.album_artist.as_deref(),
                    &title,
                    series.as_deref(),
                )
            })
            .or_else(|| split.as_ref().map(|(a, _)| a.clone()))
            .unwrap_or_else(|| naming.unknown_author.clone());

        let year = non_empty(meta.get(MetaKey::Year))
            .map(str::to_string)
            .or_else(|| tags.year.map(|y| y.to_string()));

        let quality = tags
            .bitrate_kbps
            .map(|b| format!("{b}kbps"))
            .or_else(|| tags.format.clone());

        let mut vars = NamingVariables::default();
        vars.set("Author", author);
        vars.set("Title", title);
        vars.set_opt("Series", series);
        vars.set_opt("SeriesNumber", non_empty(meta.get(MetaKey::SeriesNumber)));
        vars.set_opt("Year", year);
        vars.set_opt("Quality", quality);
        vars.set_opt(
            "DiskNumber",
            disk_number.or(tags.disc_number).map(|n| n.to_string()),
        );
        vars.set_opt(
            "ChapterNumber",
            chapter_number.or(tags.track_number).map(|n| n.to_string()),
        );
        vars
    }
}

/// Pick the author from noisy tags. When the primary artist contains the
/// title, or equals the title or series, the album artist is preferred.
pub fn choose_author(
    artist: Option<&str>,
    album_artist: Option<&str>,
    title: &str,
    series: Option<&str>,
) -> Option<String> {
    let artist = non_empty(artist);
    let album_artist = non_empty(album_artist);
    let primary = artist.or(album_artist)?;
    let alternate = album_artist.or(artist);

    let title = title.trim();
    let looks_like_title = !title.is_empty()
        && (primary.to_lowercase().contains(&title.to_lowercase())
            || series.is_some_and(|s| primary.eq_ignore_ascii_case(s.trim())));

    if looks_like_title {
        return alternate.map(str::to_string);
    }
    Some(primary.to_string())
}

/// Split release titles shaped like `Author - Title`.
pub fn split_author_title(title: &str) -> Option<(String, String)> {
    let (author, rest) = title.split_once(" - ")?;
    let (author, rest) = (author.trim(), rest.trim());
    if author.is_empty() || rest.is_empty() {
        return None;
    }
    Some((author.to_string(), rest.to_string()))
}

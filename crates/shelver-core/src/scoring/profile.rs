//! User preferences a candidate is scored against (`[scoring]` in config.toml).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringProfile {
    /// Canonical language name ("English"); `None` disables language scoring.
    pub preferred_language: Option<String>,
    /// Formats that are acceptable. A present format outside this list is undesirable.
    /// Empty means every format is acceptable.
    pub preferred_formats: Vec<String>,
    /// Formats that are always undesirable.
    pub undesirable_formats: Vec<String>,
    /// Every word must appear in the title or the candidate is rejected.
    pub must_contain: Vec<String>,
    /// Any word appearing in the title rejects the candidate.
    pub must_not_contain: Vec<String>,
    /// Each word present in the title adds `preferred_word_bonus`.
    pub preferred_words: Vec<String>,
    pub min_size_mb: Option<u64>,
    pub max_size_mb: Option<u64>,
    /// Torrents only.
    pub min_seeders: Option<u32>,
    pub max_age_days: Option<u32>,
    pub language_mismatch_penalty: i32,
    pub format_penalty: i32,
    pub preferred_word_bonus: i32,
    /// Label substring (case-insensitive) -> base quality, checked before the built-in table.
    pub quality_overrides: BTreeMap<String, i32>,
}

impl Default for ScoringProfile {
    fn default() -> Self {
        Self {
            preferred_language: Some("English".to_string()),
            preferred_formats: ["m4b", "flac", "opus", "m4a", "aac", "mp3"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            undesirable_formats: Vec::new(),
            must_contain: Vec::new(),
            must_not_contain: Vec::new(),
            preferred_words: Vec::new(),
            min_size_mb: None,
            max_size_mb: None,
            min_seeders: None,
            max_age_days: None,
            language_mismatch_penalty: -10,
            format_penalty: -8,
            preferred_word_bonus: 5,
            quality_overrides: BTreeMap::new(),
        }
    }
}

impl ScoringProfile {
    /// A present, normalized format is undesirable when explicitly listed as such,
    /// or when a preferred list exists and does not contain it.
    pub fn is_undesirable_format(&self, format: &str) -> bool {
        let matches = |list: &[String]| list.iter().any(|f| f.eq_ignore_ascii_case(format));
        if matches(&self.undesirable_formats) {
            return true;
        }
        !self.preferred_formats.is_empty() && !matches(&self.preferred_formats)
    }
}

//! Base quality score from a free-form quality label.

use std::collections::BTreeMap;

/// Ordered table: first substring hit wins. Codecs and VBR presets are
/// checked before bitrates ("AAC 256" is AAC, "MP3 V2 256" is V2), and an
/// explicit 192 beats a bare VBR/CBR marker.
const QUALITY_TABLE: &[(&[&str], i32)] = &[
    (&["flac"], 100),
    (&["aax"], 95),
    (&["m4b"], 90),
    (&["opus"], 85),
    (&["v0"], 82),
    (&["v1"], 76),
    (&["v2"], 70),
    (&["aac", "m4a"], 78),
    (&["320"], 80),
    (&["256"], 74),
    (&["192"], 60),
    (&["vbr", "cbr"], 65),
    (&["128"], 50),
    (&["64"], 40),
    (&["mp3"], 65),
];

/// Base score for a quality label. Unknown or empty labels score 0.
pub fn quality_score(label: &str) -> i32 {
    let lower = label.trim().to_ascii_lowercase();
    if lower.is_empty() {
        return 0;
    }
    QUALITY_TABLE
        .iter()
        .find(|(tokens, _)| tokens.iter().any(|t| lower.contains(t)))
        .map(|(_, score)| *score)
        .unwrap_or(0)
}

/// Like `quality_score`, consulting `overrides` (substring -> score) first.
pub fn quality_score_with_overrides(label: &str, overrides: &BTreeMap<String, i32>) -> i32 {
    let lower = label.trim().to_ascii_lowercase();
    overrides
        .iter()
        .find(|(token, _)| !token.is_empty() && lower.contains(&token.to_ascii_lowercase()))
        .map(|(_, score)| *score)
        .unwrap_or_else(|| quality_score(label))
}

//! Composite "smart" score for automatic picks. Fidelity dominates popularity:
//! one quality point outweighs the full range of the seed component.

use std::collections::BTreeMap;

use super::breakdown::ScoreComponent;
use super::candidate::{CandidateResult, SourceKind};

const QUALITY_WEIGHT: i64 = 1000;
const FORMAT_WEIGHT: i64 = 100;
const SEED_WEIGHT: i64 = 100;
const AGE_WEIGHT: i64 = 10;
const SIZE_WEIGHT: i64 = 10;

const DAY_SECS: i64 = 86_400;

/// 0-100 container/codec fidelity. Falls back to the quality label when the
/// format is absent; 50 when neither says anything.
pub fn format_fidelity(format: Option<&str>, quality: Option<&str>) -> i32 {
    let lookup = |s: &str| -> Option<i32> {
        let lower = s.to_ascii_lowercase();
        let table: &[(&str, i32)] = &[
            ("m4b", 100),
            ("flac", 95),
            ("opus", 90),
            ("m4a", 85),
            ("aac", 85),
            ("mp3", 75),
            ("ogg", 70),
            ("vorbis", 70),
            ("wma", 40),
            ("ra", 30),
        ];
        table
            .iter()
            .find(|(token, _)| {
                lower
                    .split(|c: char| !c.is_ascii_alphanumeric())
                    .any(|part| part == *token)
            })
            .map(|(_, s)| *s)
    };
    format
        .and_then(lookup)
        .or_else(|| quality.and_then(lookup))
        .unwrap_or(50)
}

fn log_curve(n: u32) -> i32 {
    if n == 0 {
        return 0;
    }
    (20.0 + (n as f64).log10() * 20.0).min(100.0) as i32
}

/// 0-100 availability health.
fn seed_health(c: &CandidateResult) -> i32 {
    match c.source {
        SourceKind::Torrent => {
            let seeders = c.seeders.unwrap_or(0);
            let mut score = log_curve(seeders);
            if let Some(leechers) = c.leechers.filter(|l| *l > 0) {
                if seeders >= leechers.saturating_mul(2) {
                    score += 10;
                }
            }
            score.min(100)
        }
        SourceKind::Usenet | SourceKind::DirectDownload => log_curve(c.grabs.unwrap_or(0)),
        SourceKind::MetadataOnly => 0,
    }
}

fn age_tier(published_at: Option<i64>, now: i64) -> i32 {
    let Some(published) = published_at else {
        return 50;
    };
    let days = (now - published).max(0) / DAY_SECS;
    match days {
        0 => 100,
        1..=6 => 90,
        7..=29 => 75,
        30..=89 => 60,
        90..=364 => 40,
        _ => 20,
    }
}

fn size_tier(size_mb: Option<f64>) -> i32 {
    let Some(mb) = size_mb else {
        return 50;
    };
    if (100.0..=800.0).contains(&mb) {
        100
    } else if (50.0..100.0).contains(&mb) || (800.0..=1500.0).contains(&mb) {
        80
    } else if (10.0..50.0).contains(&mb) || (1500.0..=3000.0).contains(&mb) {
        50
    } else if mb < 10.0 {
        20
    } else {
        30
    }
}

pub(crate) fn smart_components(
    c: &CandidateResult,
    quality: i32,
    now: i64,
) -> BTreeMap<ScoreComponent, i64> {
    let mut out = BTreeMap::new();
    out.insert(ScoreComponent::Quality, quality as i64 * QUALITY_WEIGHT);
    out.insert(
        ScoreComponent::Format,
        format_fidelity(c.format.as_deref(), c.quality.as_deref()) as i64 * FORMAT_WEIGHT,
    );
    out.insert(ScoreComponent::Seed, seed_health(c) as i64 * SEED_WEIGHT);
    out.insert(ScoreComponent::Age, age_tier(c.published_at, now) as i64 * AGE_WEIGHT);
    out.insert(ScoreComponent::Size, size_tier(c.size_mb()) as i64 * SIZE_WEIGHT);
    out
}

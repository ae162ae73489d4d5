//! Deterministic scoring and ranking of candidates against a profile.

use serde::Serialize;
use std::cmp::Ordering;

use super::breakdown::{ScoreBreakdown, ScoreComponent};
use super::candidate::{CandidateResult, SourceKind};
use super::language::{detect_language_in_title, normalize_token, parse_language_token};
use super::profile::ScoringProfile;
use super::quality::quality_score_with_overrides;
use super::smart::smart_components;
use crate::clock::unix_timestamp;

const DAY_SECS: i64 = 86_400;

/// A candidate together with its score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub candidate: CandidateResult,
    pub score: ScoreBreakdown,
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    profile: ScoringProfile,
}

impl ScoringEngine {
    pub fn new(profile: ScoringProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ScoringProfile {
        &self.profile
    }

    /// Score against the current wall clock (age rules and the age tier read it).
    pub fn score(&self, candidate: &CandidateResult) -> ScoreBreakdown {
        self.score_at(candidate, unix_timestamp())
    }

    /// Score with an explicit "now" in Unix seconds. Same inputs, same output.
    pub fn score_at(&self, c: &CandidateResult, now: i64) -> ScoreBreakdown {
        let profile = &self.profile;
        let mut score = ScoreBreakdown::default();
        let title_lower = c.title.to_lowercase();

        self.apply_rejections(c, &title_lower, now, &mut score);

        let quality_label = normalize_token(c.quality.as_deref());
        let quality = quality_label
            .as_deref()
            .map(|q| quality_score_with_overrides(q, &profile.quality_overrides))
            .unwrap_or(0);
        score.add(ScoreComponent::Quality, quality);

        if let (Some(preferred), Some(detected)) =
            (profile.preferred_language.as_deref(), detected_language(c))
        {
            let preferred = parse_language_token(preferred).unwrap_or(preferred);
            if !detected.eq_ignore_ascii_case(preferred) {
                score.add(ScoreComponent::Language, profile.language_mismatch_penalty);
            }
        }

        if let Some(format) = normalize_token(c.format.as_deref()) {
            if profile.is_undesirable_format(&format) {
                score.add(ScoreComponent::Format, profile.format_penalty);
            }
        }

        let preferred_hits = profile
            .preferred_words
            .iter()
            .filter(|w| !w.trim().is_empty() && title_lower.contains(&w.trim().to_lowercase()))
            .count() as i32;
        if preferred_hits > 0 {
            score.add(
                ScoreComponent::PreferredWords,
                preferred_hits * profile.preferred_word_bonus,
            );
        }

        score.smart_breakdown = smart_components(c, quality, now);
        score.smart_score = score.smart_breakdown.values().sum();
        score
    }

    fn apply_rejections(
        &self,
        c: &CandidateResult,
        title_lower: &str,
        now: i64,
        score: &mut ScoreBreakdown,
    ) {
        let profile = &self.profile;
        for word in profile.must_not_contain.iter().map(|w| w.trim()) {
            if !word.is_empty() && title_lower.contains(&word.to_lowercase()) {
                score.reject(format!("contains forbidden word '{word}'"));
            }
        }
        for word in profile.must_contain.iter().map(|w| w.trim()) {
            if !word.is_empty() && !title_lower.contains(&word.to_lowercase()) {
                score.reject(format!("missing required word '{word}'"));
            }
        }

        // Usenet sizes are frequently reported for the whole post set.
        if c.source != SourceKind::Usenet {
            if let Some(mb) = c.size_mb() {
                if let Some(min) = profile.min_size_mb.filter(|m| mb < *m as f64) {
                    score.reject(format!("size {mb:.0} MB below minimum {min} MB"));
                }
                if let Some(max) = profile.max_size_mb.filter(|m| mb > *m as f64) {
                    score.reject(format!("size {mb:.0} MB above maximum {max} MB"));
                }
            }
        }

        if c.source == SourceKind::Torrent {
            let seeders = c.seeders.unwrap_or(0);
            if let Some(min) = profile.min_seeders.filter(|m| seeders < *m) {
                score.reject(format!("{seeders} seeders below minimum {min}"));
            }
        }

        if let (Some(max_days), Some(published)) = (profile.max_age_days, c.published_at) {
            let days = (now - published).max(0) / DAY_SECS;
            if days > max_days as i64 {
                score.reject(format!("{days} days old, limit {max_days}"));
            }
        }
    }

    /// Score every candidate and order them for display: accepted before
    /// rejected, then total score descending, then health, then newest.
    pub fn rank(&self, candidates: Vec<CandidateResult>) -> Vec<ScoredCandidate> {
        self.rank_at(candidates, unix_timestamp())
    }

    pub fn rank_at(&self, candidates: Vec<CandidateResult>, now: i64) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|candidate| {
                let score = self.score_at(&candidate, now);
                ScoredCandidate { candidate, score }
            })
            .collect();
        scored.sort_by(|a, b| {
            a.score
                .is_rejected()
                .cmp(&b.score.is_rejected())
                .then_with(|| b.score.total_score.cmp(&a.score.total_score))
                .then_with(|| tie_break(a, b))
        });
        scored
    }

    /// Automatic pick: highest smart score among accepted candidates.
    pub fn best_pick(&self, candidates: Vec<CandidateResult>) -> Option<ScoredCandidate> {
        self.best_pick_at(candidates, unix_timestamp())
    }

    pub fn best_pick_at(
        &self,
        candidates: Vec<CandidateResult>,
        now: i64,
    ) -> Option<ScoredCandidate> {
        self.rank_at(candidates, now)
            .into_iter()
            .filter(|s| !s.score.is_rejected())
            .min_by(|a, b| {
                b.score
                    .smart_score
                    .cmp(&a.score.smart_score)
                    .then_with(|| tie_break(a, b))
            })
    }
}

/// Higher health first, then newer, then id for a total order.
fn tie_break(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.candidate
        .health()
        .cmp(&a.candidate.health())
        .then_with(|| b.candidate.published_at.cmp(&a.candidate.published_at))
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}

/// Language from the label, or inferred from title tags for sources that carry them.
fn detected_language(c: &CandidateResult) -> Option<&'static str> {
    if let Some(label) = normalize_token(c.language.as_deref()) {
        return parse_language_token(&label);
    }
    match c.source {
        SourceKind::MetadataOnly => None,
        _ => detect_language_in_title(&c.title),
    }
}

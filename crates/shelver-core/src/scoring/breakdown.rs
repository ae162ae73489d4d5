//! Score result: named components plus the derived totals.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Named contributor to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ScoreComponent {
    Quality,
    Language,
    Format,
    PreferredWords,
    Seed,
    Size,
    Age,
}

impl ScoreComponent {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreComponent::Quality => "Quality",
            ScoreComponent::Language => "Language",
            ScoreComponent::Format => "Format",
            ScoreComponent::PreferredWords => "PreferredWords",
            ScoreComponent::Seed => "Seed",
            ScoreComponent::Size => "Size",
            ScoreComponent::Age => "Age",
        }
    }
}

impl fmt::Display for ScoreComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Base quality plus profile deltas. May be negative.
    pub total_score: i32,
    /// Weighted composite used for automatic picks.
    pub smart_score: i64,
    /// Signed contributions that make up `total_score`. Always has `Quality`.
    pub breakdown: BTreeMap<ScoreComponent, i32>,
    /// Weighted contributions that make up `smart_score`.
    pub smart_breakdown: BTreeMap<ScoreComponent, i64>,
    /// Non-empty when the profile rules the candidate out.
    pub rejection_reasons: Vec<String>,
}

impl ScoreBreakdown {
    pub fn is_rejected(&self) -> bool {
        !self.rejection_reasons.is_empty()
    }

    pub fn component(&self, c: ScoreComponent) -> Option<i32> {
        self.breakdown.get(&c).copied()
    }

    pub(crate) fn add(&mut self, c: ScoreComponent, delta: i32) {
        *self.breakdown.entry(c).or_insert(0) += delta;
        self.total_score += delta;
    }

    pub(crate) fn reject(&mut self, reason: impl Into<String>) {
        self.rejection_reasons.push(reason.into());
    }
}

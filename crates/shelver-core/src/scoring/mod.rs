//! Candidate scoring and ranking.
//!
//! Pure functions only: a candidate search result plus a profile yields a
//! `ScoreBreakdown`. Nothing in here touches disk, the database or the clock
//! unless the caller asks for "now" via `ScoringEngine::score`.

mod breakdown;
mod candidate;
mod engine;
mod language;
mod profile;
mod quality;
mod smart;

pub use breakdown::{ScoreBreakdown, ScoreComponent};
pub use candidate::{CandidateResult, SourceKind};
pub use engine::{ScoredCandidate, ScoringEngine};
pub use language::{detect_language_in_title, normalize_token, parse_language_token};
pub use profile::ScoringProfile;
pub use quality::{quality_score, quality_score_with_overrides};
pub use smart::format_fidelity;

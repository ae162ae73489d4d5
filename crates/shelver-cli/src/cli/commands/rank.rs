//! `shelver rank` – score candidates from a JSON file.

use anyhow::{Context, Result};
use shelver_core::config::ShelverConfig;
use shelver_core::scoring::{CandidateResult, ScoringEngine};
use std::path::Path;

pub fn run_rank(cfg: &ShelverConfig, path: &Path, json: bool) -> Result<()> {
    let data = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let candidates: Vec<CandidateResult> =
        serde_json::from_str(&data).with_context(|| format!("parse {}", path.display()))?;

    let engine = ScoringEngine::new(cfg.scoring.clone());
    let ranked = engine.rank(candidates.clone());
    let best = engine.best_pick(candidates);

    if json {
        let out = serde_json::json!({ "ranked": ranked, "best_pick": best });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if ranked.is_empty() {
        println!("No candidates.");
        return Ok(());
    }
    println!("{:>6} {:>8} {:<20} {}", "SCORE", "SMART", "ID", "TITLE");
    for s in &ranked {
        println!(
            "{:>6} {:>8} {:<20} {}",
            s.score.total_score, s.score.smart_score, s.candidate.id, s.candidate.title
        );
        for reason in &s.score.rejection_reasons {
            println!("{:>16} rejected: {reason}", "");
        }
    }
    match best {
        Some(b) => println!("\nbest pick: {} ({})", b.candidate.id, b.candidate.title),
        None => println!("\nno acceptable candidate"),
    }
    Ok(())
}

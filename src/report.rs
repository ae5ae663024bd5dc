//! Recommendation ranking and per-farm report assembly.
//!
//! Ranks scored species, surfaces the highest-impact score records as key
//! reasons, merges exclusion output, and wraps everything per farm. Batch
//! evaluation runs farms in parallel with per-farm failure isolation.

use chrono::Utc;
use rayon::prelude::*;
use serde::Serialize;

use crate::aggregate::{aggregate, SpeciesEvaluation, SpeciesScore};
use crate::config::{GlobalConfig, OverrideTable, ResolvedRules};
use crate::error::ConfigError;
use crate::exclusion::{run_exclusions, ExclusionOutcome, ExclusionRule};
use crate::profile::{FarmId, FarmProfile, SpeciesCatalog, SpeciesId};

/// One ranked recommendation. An unscored species (zero aggregation
/// denominator) keeps its entry with `score_mcda` and `rank_overall` both
/// null; that state is explicit, never folded into 0 or 1.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationEntry {
    pub species_id: SpeciesId,
    pub species_name: String,
    pub species_common_name: String,
    pub score_mcda: Option<f64>,
    pub rank_overall: Option<u32>,
    pub key_reasons: Vec<String>,
}

/// One excluded species with every reason that fired. Species unknown to
/// the catalog carry null names and the divergence note as their reason.
#[derive(Debug, Clone, Serialize)]
pub struct ExcludedEntry {
    pub species_id: SpeciesId,
    pub species_name: Option<String>,
    pub species_common_name: Option<String>,
    pub reasons: Vec<String>,
}

/// Complete scoring report for one farm.
#[derive(Debug, Clone, Serialize)]
pub struct FarmReport {
    pub farm_id: FarmId,
    pub timestamp_utc: String,
    pub recommendations: Vec<RecommendationEntry>,
    pub excluded_species: Vec<ExcludedEntry>,
}

/// Per-farm result of a batch run: either a complete report or an explicit
/// failure marker with the fatal configuration detail. Never a partially
/// populated report.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FarmOutcome {
    Report(FarmReport),
    Failed { farm_id: FarmId, error: ConfigError },
}

impl FarmOutcome {
    pub fn report(&self) -> Option<&FarmReport> {
        match self {
            FarmOutcome::Report(report) => Some(report),
            FarmOutcome::Failed { .. } => None,
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Pick the top contributing score records as summary reasons, formatted
/// `"<short_name>:<reason>"`. Contribution is weight × score; missing-data
/// records rank last but still surface when little else exists.
fn key_reasons(eval: &SpeciesEvaluation, limit: usize) -> Vec<String> {
    let mut order: Vec<usize> = (0..eval.records.len()).collect();
    // Stable sort keeps configuration order among equal contributions.
    order.sort_by(|&a, &b| {
        eval.records[b]
            .contribution()
            .partial_cmp(&eval.records[a].contribution())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    order
        .into_iter()
        .take(limit)
        .map(|i| {
            let record = &eval.records[i];
            format!("{}:{}", record.short_name, record.reason)
        })
        .collect()
}

/// Rank evaluations into the final recommendation list.
///
/// Scored species order by total score descending, ties stable by ascending
/// species id; ranks are dense, so exact ties share a rank. Unscored species
/// follow, ordered by id, unranked.
pub fn rank_recommendations(
    evaluations: &[SpeciesEvaluation],
    key_reason_limit: usize,
) -> Vec<RecommendationEntry> {
    let mut scored: Vec<&SpeciesEvaluation> = Vec::new();
    let mut unscored: Vec<&SpeciesEvaluation> = Vec::new();
    for eval in evaluations {
        match eval.score {
            SpeciesScore::Scored(_) => scored.push(eval),
            SpeciesScore::Unscored => unscored.push(eval),
        }
    }

    scored.sort_by(|a, b| {
        let score_a = a.score.value().unwrap_or(0.0);
        let score_b = b.score.value().unwrap_or(0.0);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.species_id.cmp(&b.species_id))
    });
    unscored.sort_by_key(|e| e.species_id);

    let mut entries = Vec::with_capacity(evaluations.len());
    let mut last_score: Option<f64> = None;
    let mut current_rank = 0u32;

    for eval in scored {
        let score = eval.score.value().unwrap_or(0.0);
        if last_score != Some(score) {
            current_rank += 1;
            last_score = Some(score);
        }
        entries.push(RecommendationEntry {
            species_id: eval.species_id,
            species_name: eval.species_name.clone(),
            species_common_name: eval.species_common_name.clone(),
            score_mcda: Some(round3(score)),
            rank_overall: Some(current_rank),
            key_reasons: key_reasons(eval, key_reason_limit),
        });
    }

    for eval in unscored {
        entries.push(RecommendationEntry {
            species_id: eval.species_id,
            species_name: eval.species_name.clone(),
            species_common_name: eval.species_common_name.clone(),
            score_mcda: None,
            rank_overall: None,
            key_reasons: key_reasons(eval, key_reason_limit),
        });
    }

    entries
}

/// Build the excluded-species list from the exclusion outcome, in catalog
/// order, with unknown-species divergence notes appended.
fn excluded_entries(catalog: &SpeciesCatalog, exclusions: &ExclusionOutcome) -> Vec<ExcludedEntry> {
    let mut entries: Vec<ExcludedEntry> = catalog
        .iter()
        .filter_map(|sp| {
            let record = exclusions.record(sp.id)?;
            if !record.excluded {
                return None;
            }
            Some(ExcludedEntry {
                species_id: sp.id,
                species_name: Some(sp.name.clone()),
                species_common_name: Some(sp.common_name.clone()),
                reasons: record.reasons.clone(),
            })
        })
        .collect();

    for note in &exclusions.unknown_species {
        entries.push(ExcludedEntry {
            species_id: note.species_id,
            species_name: None,
            species_common_name: None,
            reasons: vec![format!("unknown species: {}", note.note)],
        });
    }

    entries
}

/// Evaluate one farm: exclusion, aggregation with inline explanations,
/// ranking. A `ConfigError` aborts this farm only.
pub fn evaluate_farm(
    farm: &FarmProfile,
    catalog: &SpeciesCatalog,
    global: &GlobalConfig,
    rules: &ResolvedRules,
    exclusion_rules: &[ExclusionRule],
    timestamp_utc: &str,
) -> Result<FarmReport, ConfigError> {
    let exclusions = if global.enable_exclusions {
        run_exclusions(farm, catalog, exclusion_rules)
    } else {
        ExclusionOutcome::pass_all()
    };

    let evaluations = aggregate(farm, catalog, &exclusions, rules, global)?;
    let recommendations = rank_recommendations(&evaluations, global.key_reason_limit);

    Ok(FarmReport {
        farm_id: farm.id,
        timestamp_utc: timestamp_utc.to_string(),
        recommendations,
        excluded_species: excluded_entries(catalog, &exclusions),
    })
}

/// Evaluate a batch of farms at a fixed timestamp.
///
/// Rules are pre-resolved once and shared read-only across rayon workers;
/// farms are independent, so evaluation is embarrassingly parallel. Output
/// order matches input order. One farm's fatal error becomes its own
/// failure marker and never aborts sibling farms.
pub fn evaluate_batch_at(
    farms: &[FarmProfile],
    catalog: &SpeciesCatalog,
    global: &GlobalConfig,
    overrides: &OverrideTable,
    exclusion_rules: &[ExclusionRule],
    timestamp_utc: &str,
) -> Vec<FarmOutcome> {
    let rules = ResolvedRules::build(catalog, global, overrides);

    farms
        .par_iter()
        .map(|farm| {
            match evaluate_farm(farm, catalog, global, &rules, exclusion_rules, timestamp_utc) {
                Ok(report) => FarmOutcome::Report(report),
                Err(error) => {
                    tracing::error!(farm_id = farm.id, %error, "farm evaluation failed");
                    FarmOutcome::Failed {
                        farm_id: farm.id,
                        error,
                    }
                }
            }
        })
        .collect()
}

/// Evaluate a batch of farms stamped with the current UTC time.
pub fn evaluate_batch(
    farms: &[FarmProfile],
    catalog: &SpeciesCatalog,
    global: &GlobalConfig,
    overrides: &OverrideTable,
    exclusion_rules: &[ExclusionRule],
) -> Vec<FarmOutcome> {
    let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    evaluate_batch_at(farms, catalog, global, overrides, exclusion_rules, &timestamp)
}

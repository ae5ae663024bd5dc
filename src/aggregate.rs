//! Suitability aggregation: weighted-mean combination of per-feature scores
//! with missing-data-safe renormalization.
//!
//! The explanation is built inline, one score record per scorer invocation,
//! so the audit trail always reflects exactly the inputs that produced the
//! number.

use serde::Serialize;

use crate::config::{FeatureKind, GlobalConfig, ResolvedRules};
use crate::error::ConfigError;
use crate::exclusion::ExclusionOutcome;
use crate::profile::{FarmProfile, FeatureValue, Requirement, SpeciesCatalog, SpeciesId, SpeciesProfile};
use crate::scoring::score_feature;

/// Full audit record for one (farm, species, feature) scoring decision.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRecord {
    pub feature: String,
    pub short_name: String,
    pub kind: FeatureKind,
    /// The farm value the scorer saw (absent means missing data).
    pub farm_value: Option<FeatureValue>,
    /// Snapshot of the species requirement the scorer saw.
    pub requirement: Option<Requirement>,
    pub weight: f64,
    /// `None` is a missing score: it contributes to neither the numerator
    /// nor the denominator of the aggregate.
    pub score: Option<f64>,
    pub reason: String,
}

impl ScoreRecord {
    /// Weight contribution used to pick summary key reasons. Missing scores
    /// sort below every scored record.
    pub fn contribution(&self) -> f64 {
        match self.score {
            Some(score) => self.weight * score,
            None => f64::NEG_INFINITY,
        }
    }
}

/// Total suitability for one species. `Unscored` is the explicit sentinel
/// for a zero aggregation denominator (every feature missing or
/// zero-weighted) and is surfaced, never defaulted to 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeciesScore {
    Scored(f64),
    Unscored,
}

impl SpeciesScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            SpeciesScore::Scored(v) => Some(*v),
            SpeciesScore::Unscored => None,
        }
    }
}

/// Scored species with its complete feature-by-feature explanation.
#[derive(Debug, Clone, Serialize)]
pub struct SpeciesEvaluation {
    pub species_id: SpeciesId,
    pub species_name: String,
    pub species_common_name: String,
    pub score: SpeciesScore,
    /// One record per configured feature, in configuration order.
    pub records: Vec<ScoreRecord>,
}

/// Score one species across every configured feature.
///
/// Total = Σ(wᵢ·sᵢ) / Σ(wᵢ) over records with a present score and positive
/// weight; missing scores and zero weights contribute to neither side.
pub fn score_species(
    farm: &FarmProfile,
    species: &SpeciesProfile,
    rules: &ResolvedRules,
    global: &GlobalConfig,
) -> Result<SpeciesEvaluation, ConfigError> {
    let mut records = Vec::with_capacity(global.features.len());
    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for rule in rules.for_species(species.id) {
        let feature = global.feature(&rule.feature)?;
        let result = score_feature(farm, species, rule, feature)?;

        if let Some(score) = result.score {
            if rule.weight > 0.0 {
                numerator += rule.weight * score;
                denominator += rule.weight;
            }
        }

        records.push(ScoreRecord {
            feature: rule.feature.clone(),
            short_name: rule.short_name.clone(),
            kind: rule.kind,
            farm_value: farm.get(&rule.feature).cloned(),
            requirement: species.requirement(&rule.feature).cloned(),
            weight: rule.weight,
            score: result.score,
            reason: result.reason,
        });
    }

    let score = if denominator > 0.0 {
        SpeciesScore::Scored(numerator / denominator)
    } else {
        SpeciesScore::Unscored
    };

    Ok(SpeciesEvaluation {
        species_id: species.id,
        species_name: species.name.clone(),
        species_common_name: species.common_name.clone(),
        score,
        records,
    })
}

/// Score every species that survived exclusion, in catalog order.
pub fn aggregate(
    farm: &FarmProfile,
    catalog: &SpeciesCatalog,
    exclusions: &ExclusionOutcome,
    rules: &ResolvedRules,
    global: &GlobalConfig,
) -> Result<Vec<SpeciesEvaluation>, ConfigError> {
    catalog
        .iter()
        .filter(|sp| exclusions.is_candidate(sp.id))
        .map(|sp| score_species(farm, sp, rules, global))
        .collect()
}

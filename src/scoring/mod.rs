//! Feature scorers: pure functions from (farm value, species requirement,
//! resolved rule) to a score in [0, 1] plus a reason string.
//!
//! Dispatch is an exhaustive match over the closed `ScoreMethod` set, so the
//! scorer family is compiler-checked and extensible only deliberately.

pub mod categorical;
pub mod numeric;

pub use categorical::{categorical_compat_score, categorical_exact_score};
pub use numeric::{derive_trapezoid, numeric_range_score, trapezoid_score};

use crate::config::{FeatureConfig, FeatureKind, ResolvedRule, ScoreMethod};
use crate::error::ConfigError;
use crate::profile::{FarmProfile, SpeciesProfile};

/// Result of scoring one feature: `None` means the feature could not be
/// evaluated (missing data) and must stay out of the aggregate entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScore {
    pub score: Option<f64>,
    pub reason: String,
}

impl FeatureScore {
    pub fn scored(score: f64, reason: impl Into<String>) -> Self {
        Self {
            score: Some(score),
            reason: reason.into(),
        }
    }

    pub fn missing(reason: impl Into<String>) -> Self {
        Self {
            score: None,
            reason: reason.into(),
        }
    }
}

/// Score one feature of `species` against `farm` under the resolved rule.
///
/// A method/kind mismatch is a structurally invalid rule and therefore a
/// fatal `ConfigError`, per the engine's error policy.
pub fn score_feature(
    farm: &FarmProfile,
    species: &SpeciesProfile,
    rule: &ResolvedRule,
    feature: &FeatureConfig,
) -> Result<FeatureScore, ConfigError> {
    let mismatch = || ConfigError::MethodMismatch {
        feature: rule.feature.clone(),
        method: rule.score_method,
        kind: rule.kind,
    };

    match rule.score_method {
        ScoreMethod::NumRange => {
            if rule.kind != FeatureKind::Numeric {
                return Err(mismatch());
            }
            let (min, max) = species.range(&rule.feature);
            Ok(numeric_range_score(farm.number(&rule.feature), min, max))
        }
        ScoreMethod::NumTrapezoid => {
            if rule.kind != FeatureKind::Numeric {
                return Err(mismatch());
            }
            let farm_value = match farm.number(&rule.feature) {
                Some(v) => v,
                None => return Ok(FeatureScore::missing("missing farm data")),
            };
            let (min, max) = species.range(&rule.feature);
            let (min, max) = match (min, max) {
                (Some(min), Some(max)) => (min, max),
                _ => return Ok(FeatureScore::missing("missing species data")),
            };
            let points =
                derive_trapezoid(&rule.feature, min, max, rule.left_tol, rule.right_tol)?;
            Ok(trapezoid_score(farm_value, points))
        }
        ScoreMethod::CatExact => {
            if rule.kind != FeatureKind::Categorical {
                return Err(mismatch());
            }
            let accepted = species.accepted(&rule.feature).unwrap_or(&[]);
            Ok(categorical_exact_score(farm.text(&rule.feature), accepted))
        }
        ScoreMethod::CatCompat => {
            if rule.kind != FeatureKind::Categorical {
                return Err(mismatch());
            }
            let accepted = species.accepted(&rule.feature).unwrap_or(&[]);
            Ok(categorical_compat_score(
                farm.text(&rule.feature),
                accepted,
                feature,
            ))
        }
    }
}

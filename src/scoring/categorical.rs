//! Categorical scorers: exact membership and compatibility-matrix partial
//! credit.

use crate::config::FeatureConfig;
use crate::scoring::FeatureScore;

/// Exact-match scoring: 1.0 when the farm value is one of the species'
/// acceptable values, 0.0 otherwise. Missing when either side is absent.
/// Matching is case-sensitive; upstream ingestion normalizes case.
pub fn categorical_exact_score(value: Option<&str>, accepted: &[String]) -> FeatureScore {
    let value = match value {
        Some(v) => v,
        None => return FeatureScore::missing("missing farm data"),
    };
    if accepted.is_empty() {
        return FeatureScore::missing("missing or no preference");
    }

    if accepted.iter().any(|a| a == value) {
        FeatureScore::scored(1.0, "exact match")
    } else {
        FeatureScore::scored(0.0, "no match")
    }
}

/// Compatibility scoring: exact membership always wins with 1.0 regardless
/// of matrix contents; otherwise the best substitute among the species'
/// preferred values decides, using the feature's compatibility matrix.
/// A farm value the matrix knows nothing about scores 0.0.
pub fn categorical_compat_score(
    value: Option<&str>,
    accepted: &[String],
    feature: &FeatureConfig,
) -> FeatureScore {
    let value = match value {
        Some(v) => v,
        None => return FeatureScore::missing("missing farm data"),
    };
    if accepted.is_empty() {
        return FeatureScore::missing("missing or no preference");
    }

    if accepted.iter().any(|a| a == value) {
        return FeatureScore::scored(1.0, "exact match");
    }

    // Best substitute wins; the first-listed preference wins exact ties.
    let mut best: Option<(&str, f64)> = None;
    for preferred in accepted {
        if let Some(score) = feature.compatibility(value, preferred) {
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((preferred, score));
            }
        }
    }

    match best {
        Some((preferred, score)) => FeatureScore::scored(
            score,
            format!("closest preferred category '{preferred}' (compatibility {score})"),
        ),
        None => FeatureScore::scored(0.0, format!("no compatibility data for '{value}'")),
    }
}

//! Error taxonomy for the suitability engine.
//!
//! Only configuration problems are fatal, and fatal for a single farm's
//! evaluation only. Missing data and catalog divergence are ordinary output
//! values (score-record reasons and exclusion notes), never `Err`.

use serde::Serialize;
use thiserror::Error;

use crate::config::{FeatureKind, ScoreMethod};

/// Fatal configuration problem. Aborts the farm being evaluated; batch
/// callers surface it as a per-farm failure marker and continue with the
/// remaining farms.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum ConfigError {
    /// A rule or override referenced a feature the global configuration
    /// does not define.
    #[error("feature '{feature}' is not defined in the global configuration")]
    UnknownFeature { feature: String },

    /// The resolved scoring method cannot score the feature's kind
    /// (e.g. `cat_exact` on a numeric feature).
    #[error("score method '{method}' cannot score {kind} feature '{feature}'")]
    MethodMismatch {
        feature: String,
        method: ScoreMethod,
        kind: FeatureKind,
    },

    /// A species numeric requirement is inverted (max below min), so no
    /// well-formed trapezoid exists for it.
    #[error("feature '{feature}': max ({max}) < min ({min})")]
    InvalidRange {
        feature: String,
        min: f64,
        max: f64,
    },
}

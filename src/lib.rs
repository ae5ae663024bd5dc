//! Tree-species suitability engine.
//!
//! Scores candidate tree species against a farm's environmental profile and
//! produces ranked, fully-traceable planting recommendations:
//!
//! - `config`: global feature configuration, per-species overrides, and the
//!   cascading resolution into per-(species, feature) rules
//! - `profile`: farm and species input profiles
//! - `scoring`: the pure feature scorers (range, trapezoid, exact,
//!   compatibility matrix)
//! - `exclusion`: hard pass/fail gates applied before scoring
//! - `aggregate`: weighted-mean suitability with missing-data-safe
//!   renormalization and inline explanations
//! - `report`: ranking, key reasons, and parallel batch evaluation
//!
//! The engine performs no I/O and holds no state between runs; persistence,
//! geospatial attribute extraction, and the API surface are external
//! collaborators.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod exclusion;
pub mod profile;
pub mod report;
pub mod scoring;

// Re-export commonly used types
pub use aggregate::{aggregate, score_species, ScoreRecord, SpeciesEvaluation, SpeciesScore};
pub use config::{
    resolve, CompatibilityPair, FeatureConfig, FeatureKind, GlobalConfig, IdAliases, OverrideRow,
    OverrideTable, ResolvedRule, ResolvedRules, ScoreMethod, Tolerance,
};
pub use error::ConfigError;
pub use exclusion::{
    run_exclusions, ExclusionOutcome, ExclusionPredicate, ExclusionRecord, ExclusionRule,
    UnknownSpeciesNote,
};
pub use profile::{
    FarmId, FarmProfile, FeatureValue, Requirement, SpeciesCatalog, SpeciesId, SpeciesProfile,
};
pub use report::{
    evaluate_batch, evaluate_batch_at, evaluate_farm, rank_recommendations, ExcludedEntry,
    FarmOutcome, FarmReport, RecommendationEntry,
};

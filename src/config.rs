//! Global feature configuration, species parameter overrides, and the
//! cascading resolution that merges the two into per-(species, feature)
//! scoring rules.
//!
//! Resolution is a field-by-field coalesce: an override field that is present
//! wins, an absent field inherits the global default. The merged rule is the
//! only shape the feature scorers consume.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::profile::{SpeciesCatalog, SpeciesId};

/// Feature kind: decides which family of scorers may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKind::Numeric => write!(f, "numeric"),
            FeatureKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// Scoring method. A closed set: dispatch is an exhaustive match, so adding
/// a method is a compiler-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMethod {
    NumRange,
    NumTrapezoid,
    CatExact,
    CatCompat,
}

impl std::fmt::Display for ScoreMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScoreMethod::NumRange => "num_range",
            ScoreMethod::NumTrapezoid => "num_trapezoid",
            ScoreMethod::CatExact => "cat_exact",
            ScoreMethod::CatCompat => "cat_compat",
        };
        write!(f, "{name}")
    }
}

/// Trapezoid shoulder widths applied outward of a species' preferred range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub right: f64,
}

/// One partial-credit entry of a categorical compatibility matrix.
/// Lookups are symmetric: (from, to) and (to, from) carry the same score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityPair {
    pub from: String,
    pub to: String,
    pub score: f64,
}

/// Global default scoring rule for one feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub name: String,

    /// Short display name used in key-reason strings. Falls back to `name`.
    #[serde(default)]
    pub short: Option<String>,

    #[serde(rename = "type")]
    pub kind: FeatureKind,

    pub score_method: ScoreMethod,

    #[serde(default)]
    pub default_weight: f64,

    /// Numeric features only.
    #[serde(default)]
    pub tolerance: Tolerance,

    /// Categorical features only.
    #[serde(default)]
    pub compatibility_pairs: Vec<CompatibilityPair>,
}

impl FeatureConfig {
    pub fn short_name(&self) -> &str {
        self.short.as_deref().unwrap_or(&self.name)
    }

    /// Symmetric compatibility lookup between a farm value and one preferred
    /// category. `None` when the matrix has no entry for the pair.
    pub fn compatibility(&self, farm: &str, preferred: &str) -> Option<f64> {
        self.compatibility_pairs
            .iter()
            .find(|p| {
                (p.from == farm && p.to == preferred) || (p.from == preferred && p.to == farm)
            })
            .map(|p| p.score)
    }

    /// Whether the matrix mentions `value` on either side of any pair.
    pub fn has_compatibility_entries(&self, value: &str) -> bool {
        self.compatibility_pairs
            .iter()
            .any(|p| p.from == value || p.to == value)
    }
}

/// Key-name aliases for the identifier fields of externally supplied rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAliases {
    #[serde(default = "default_id_key")]
    pub farm: String,
    #[serde(default = "default_id_key")]
    pub species: String,
}

fn default_id_key() -> String {
    "id".to_string()
}

impl Default for IdAliases {
    fn default() -> Self {
        Self {
            farm: default_id_key(),
            species: default_id_key(),
        }
    }
}

fn default_key_reason_limit() -> usize {
    3
}

fn default_enable_exclusions() -> bool {
    true
}

/// Global engine configuration: the ordered feature set plus engine toggles.
///
/// Features are an ordered `Vec` rather than a map so scoring and reports
/// always iterate in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub features: Vec<FeatureConfig>,

    #[serde(default)]
    pub ids: IdAliases,

    #[serde(default = "default_enable_exclusions")]
    pub enable_exclusions: bool,

    /// How many score records surface as summary key reasons per species.
    #[serde(default = "default_key_reason_limit")]
    pub key_reason_limit: usize,
}

impl GlobalConfig {
    /// Look up a feature's default rule. A feature absent from the global
    /// configuration is fatal: the whole feature set is undefined without it.
    pub fn feature(&self, name: &str) -> Result<&FeatureConfig, ConfigError> {
        self.features
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ConfigError::UnknownFeature {
                feature: name.to_string(),
            })
    }

    fn has_feature(&self, name: &str) -> bool {
        self.features.iter().any(|f| f.name == name)
    }
}

/// One sparse override row. Any `None` cell inherits the global default for
/// the feature. Row order is insignificant except that later rows for the
/// same (species, feature) key overwrite earlier ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverrideRow {
    pub species_id: SpeciesId,
    pub feature: String,
    #[serde(default)]
    pub score_method: Option<ScoreMethod>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub trap_left_tol: Option<f64>,
    #[serde(default)]
    pub trap_right_tol: Option<f64>,
}

/// Sparse override table keyed by (species id, feature name).
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    rows: FxHashMap<(SpeciesId, String), OverrideRow>,
}

impl OverrideTable {
    pub fn from_rows(rows: impl IntoIterator<Item = OverrideRow>) -> Self {
        let mut table = FxHashMap::default();
        for row in rows {
            table.insert((row.species_id, row.feature.clone()), row);
        }
        Self { rows: table }
    }

    pub fn get(&self, species_id: SpeciesId, feature: &str) -> Option<&OverrideRow> {
        self.rows.get(&(species_id, feature.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn keys(&self) -> impl Iterator<Item = &(SpeciesId, String)> {
        self.rows.keys()
    }
}

/// Fully-merged scoring rule for one (species, feature) pair. The only shape
/// the feature scorers consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRule {
    pub feature: String,
    pub short_name: String,
    pub kind: FeatureKind,
    pub score_method: ScoreMethod,
    pub weight: f64,
    pub left_tol: f64,
    pub right_tol: f64,
}

/// Merge the global default for `feature_name` with the override row for
/// (`species_id`, `feature_name`), if any. Pure; safe to memoize per pair.
///
/// Validity of the merged values (e.g. method/kind agreement) is the
/// scorer's responsibility, not the resolver's.
pub fn resolve(
    species_id: SpeciesId,
    feature_name: &str,
    global: &GlobalConfig,
    overrides: &OverrideTable,
) -> Result<ResolvedRule, ConfigError> {
    let defaults = global.feature(feature_name)?;
    let row = overrides.get(species_id, feature_name);

    let pick = |field: fn(&OverrideRow) -> Option<f64>, default: f64| -> f64 {
        row.and_then(field).unwrap_or(default)
    };

    Ok(ResolvedRule {
        feature: defaults.name.clone(),
        short_name: defaults.short_name().to_string(),
        kind: defaults.kind,
        score_method: row
            .and_then(|r| r.score_method)
            .unwrap_or(defaults.score_method),
        weight: pick(|r| r.weight, defaults.default_weight),
        left_tol: pick(|r| r.trap_left_tol, defaults.tolerance.left),
        right_tol: pick(|r| r.trap_right_tol, defaults.tolerance.right),
    })
}

/// Every (species, feature) rule pre-resolved once per run.
///
/// Built before scoring starts and read-only afterwards, so batch callers can
/// share it across parallel per-farm workers without synchronization.
#[derive(Debug, Clone)]
pub struct ResolvedRules {
    by_species: FxHashMap<SpeciesId, Vec<ResolvedRule>>,
}

impl ResolvedRules {
    /// Resolve rules for every catalog species over the configured feature
    /// set. Override rows naming a feature absent from the global
    /// configuration are ignored with a warning, never fabricated into
    /// rules.
    pub fn build(catalog: &SpeciesCatalog, global: &GlobalConfig, overrides: &OverrideTable) -> Self {
        for (species_id, feature) in overrides.keys() {
            if !global.has_feature(feature) {
                tracing::warn!(
                    species_id = *species_id,
                    feature = %feature,
                    "ignoring override for feature not in global configuration"
                );
            }
        }

        let mut by_species = FxHashMap::default();
        for species in catalog.iter() {
            let rules: Vec<ResolvedRule> = global
                .features
                .iter()
                .map(|f| {
                    // Cannot fail: the feature comes from the configuration itself.
                    resolve(species.id, &f.name, global, overrides)
                        .unwrap_or_else(|_| unreachable!("feature taken from global configuration"))
                })
                .collect();
            by_species.insert(species.id, rules);
        }
        Self { by_species }
    }

    /// Rules for one species, in global feature order.
    pub fn for_species(&self, species_id: SpeciesId) -> &[ResolvedRule] {
        self.by_species
            .get(&species_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::SpeciesProfile;
    use approx::assert_relative_eq;

    fn basic_config() -> GlobalConfig {
        GlobalConfig {
            features: vec![
                FeatureConfig {
                    name: "ph".to_string(),
                    short: Some("ph".to_string()),
                    kind: FeatureKind::Numeric,
                    score_method: ScoreMethod::NumTrapezoid,
                    default_weight: 0.5,
                    tolerance: Tolerance { left: 0.25, right: 0.6 },
                    compatibility_pairs: vec![],
                },
                FeatureConfig {
                    name: "soil_texture".to_string(),
                    short: Some("soil".to_string()),
                    kind: FeatureKind::Categorical,
                    score_method: ScoreMethod::CatExact,
                    default_weight: 0.5,
                    tolerance: Tolerance::default(),
                    compatibility_pairs: vec![],
                },
            ],
            ids: IdAliases::default(),
            enable_exclusions: true,
            key_reason_limit: 3,
        }
    }

    fn override_rows() -> Vec<OverrideRow> {
        vec![
            OverrideRow {
                species_id: 1,
                feature: "ph".to_string(),
                score_method: Some(ScoreMethod::NumRange),
                weight: Some(0.3),
                trap_left_tol: Some(0.0),
                trap_right_tol: Some(0.5),
            },
            OverrideRow {
                species_id: 2,
                feature: "ph".to_string(),
                score_method: None,
                weight: Some(0.0),
                trap_left_tol: None,
                trap_right_tol: Some(0.5),
            },
        ]
    }

    #[test]
    fn override_fields_win_over_defaults() {
        let cfg = basic_config();
        let table = OverrideTable::from_rows(override_rows());

        let rule = resolve(1, "ph", &cfg, &table).unwrap();
        assert_eq!(rule.score_method, ScoreMethod::NumRange);
        assert_relative_eq!(rule.weight, 0.3);
        assert_relative_eq!(rule.left_tol, 0.0);
        assert_relative_eq!(rule.right_tol, 0.5);
    }

    #[test]
    fn absent_override_fields_inherit_defaults() {
        let cfg = basic_config();
        let table = OverrideTable::from_rows(override_rows());

        // Species 2 overrides weight and right tolerance only.
        let rule = resolve(2, "ph", &cfg, &table).unwrap();
        assert_eq!(rule.score_method, ScoreMethod::NumTrapezoid);
        assert_relative_eq!(rule.left_tol, 0.25);
        assert_relative_eq!(rule.right_tol, 0.5);
    }

    #[test]
    fn species_without_overrides_gets_pure_defaults() {
        let cfg = basic_config();
        let table = OverrideTable::from_rows(override_rows());

        let rule = resolve(999, "ph", &cfg, &table).unwrap();
        assert_eq!(rule.score_method, ScoreMethod::NumTrapezoid);
        assert_relative_eq!(rule.weight, 0.5);
        assert_relative_eq!(rule.left_tol, 0.25);
        assert_relative_eq!(rule.right_tol, 0.6);
    }

    #[test]
    fn zero_weight_override_is_a_value_not_missing() {
        let cfg = basic_config();
        let table = OverrideTable::from_rows(override_rows());

        let rule = resolve(2, "ph", &cfg, &table).unwrap();
        assert_relative_eq!(rule.weight, 0.0);
    }

    #[test]
    fn unknown_feature_is_fatal() {
        let cfg = basic_config();
        let table = OverrideTable::default();

        let err = resolve(1, "slope_deg", &cfg, &table).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownFeature {
                feature: "slope_deg".to_string()
            }
        );
    }

    #[test]
    fn later_rows_overwrite_earlier_ones() {
        let mut rows = override_rows();
        rows.push(OverrideRow {
            species_id: 1,
            feature: "ph".to_string(),
            weight: Some(0.9),
            ..OverrideRow::default()
        });
        let table = OverrideTable::from_rows(rows);

        let row = table.get(1, "ph").unwrap();
        assert_eq!(row.weight, Some(0.9));
        // The whole row is replaced, not merged.
        assert_eq!(row.score_method, None);
    }

    #[test]
    fn build_covers_all_species_in_feature_order() {
        let cfg = basic_config();
        let catalog = SpeciesCatalog::from_species(vec![
            SpeciesProfile::new(1, "Khaya senegalensis", "African mahogany"),
            SpeciesProfile::new(2, "Faidherbia albida", "Apple-ring acacia"),
        ]);
        let table = OverrideTable::from_rows(override_rows());

        let rules = ResolvedRules::build(&catalog, &cfg, &table);
        let species_1 = rules.for_species(1);
        assert_eq!(species_1.len(), 2);
        assert_eq!(species_1[0].feature, "ph");
        assert_eq!(species_1[1].feature, "soil_texture");
        assert!(rules.for_species(404).is_empty());
    }

    #[test]
    fn overrides_for_unknown_features_produce_no_rules() {
        let cfg = basic_config();
        let catalog =
            SpeciesCatalog::from_species(vec![SpeciesProfile::new(1, "Khaya senegalensis", "")]);
        let table = OverrideTable::from_rows(vec![OverrideRow {
            species_id: 1,
            feature: "slope_deg".to_string(),
            weight: Some(1.0),
            ..OverrideRow::default()
        }]);

        let rules = ResolvedRules::build(&catalog, &cfg, &table);
        assert!(rules.for_species(1).iter().all(|r| r.feature != "slope_deg"));
    }

    #[test]
    fn compatibility_lookup_is_symmetric() {
        let feature = FeatureConfig {
            name: "soil_texture".to_string(),
            short: None,
            kind: FeatureKind::Categorical,
            score_method: ScoreMethod::CatCompat,
            default_weight: 1.0,
            tolerance: Tolerance::default(),
            compatibility_pairs: vec![CompatibilityPair {
                from: "clay".to_string(),
                to: "clay loam".to_string(),
                score: 0.8,
            }],
        };

        assert_eq!(feature.compatibility("clay", "clay loam"), Some(0.8));
        assert_eq!(feature.compatibility("clay loam", "clay"), Some(0.8));
        assert_eq!(feature.compatibility("sand", "clay"), None);
    }
}

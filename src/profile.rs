//! Farm and species profiles consumed by the engine.
//!
//! All profiles are constructed fresh per scoring run from externally
//! supplied data (the geospatial pipeline for farms, the persistence layer
//! for species) and are immutable for the duration of that run.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

pub type SpeciesId = i64;
pub type FarmId = i64;

/// One observed value of a farm feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl FeatureValue {
    /// Numeric view. Text that parses as a number is coerced, matching the
    /// lenient ingestion of upstream CSV/spreadsheet sources.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            FeatureValue::Text(s) => s.trim().parse().ok(),
            FeatureValue::Flag(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view. `false` and `0` are valid values, not missing data.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FeatureValue::Flag(b) => Some(*b),
            FeatureValue::Number(n) if *n == 1.0 => Some(true),
            FeatureValue::Number(n) if *n == 0.0 => Some(false),
            FeatureValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A farm's environmental profile: a flat feature-name → value mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmProfile {
    pub id: FarmId,
    pub features: FxHashMap<String, FeatureValue>,
}

impl FarmProfile {
    pub fn new(id: FarmId) -> Self {
        Self {
            id,
            features: FxHashMap::default(),
        }
    }

    pub fn with_feature(mut self, name: &str, value: FeatureValue) -> Self {
        self.features.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureValue> {
        self.features.get(feature)
    }

    pub fn number(&self, feature: &str) -> Option<f64> {
        self.get(feature).and_then(FeatureValue::as_number)
    }

    pub fn text(&self, feature: &str) -> Option<&str> {
        self.get(feature).and_then(FeatureValue::as_text)
    }

    pub fn flag(&self, feature: &str) -> Option<bool> {
        self.get(feature).and_then(FeatureValue::as_flag)
    }
}

/// A species' requirement for one feature: either a preferred numeric range
/// or a set of acceptable categorical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Range {
        min: Option<f64>,
        max: Option<f64>,
    },
    OneOf(Vec<String>),
}

/// Candidate tree species profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesProfile {
    pub id: SpeciesId,
    /// Scientific name.
    pub name: String,
    pub common_name: String,
    /// Per-feature requirements keyed by feature name.
    #[serde(default)]
    pub requirements: FxHashMap<String, Requirement>,
    /// Boolean trait flags, e.g. `coastal`, `riparian`, `nitrogen_fixing`.
    /// A trait absent from the map is unknown, not false.
    #[serde(default)]
    pub traits: FxHashMap<String, bool>,
    /// Permitted agroforestry-use identifiers.
    #[serde(default)]
    pub uses: FxHashSet<String>,
}

impl SpeciesProfile {
    pub fn new(id: SpeciesId, name: &str, common_name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            common_name: common_name.to_string(),
            requirements: FxHashMap::default(),
            traits: FxHashMap::default(),
            uses: FxHashSet::default(),
        }
    }

    pub fn with_range(mut self, feature: &str, min: f64, max: f64) -> Self {
        self.requirements.insert(
            feature.to_string(),
            Requirement::Range {
                min: Some(min),
                max: Some(max),
            },
        );
        self
    }

    pub fn with_accepted(mut self, feature: &str, values: &[&str]) -> Self {
        self.requirements.insert(
            feature.to_string(),
            Requirement::OneOf(values.iter().map(|v| v.to_string()).collect()),
        );
        self
    }

    pub fn with_trait(mut self, name: &str, value: bool) -> Self {
        self.traits.insert(name.to_string(), value);
        self
    }

    pub fn with_use(mut self, use_id: &str) -> Self {
        self.uses.insert(use_id.to_string());
        self
    }

    pub fn requirement(&self, feature: &str) -> Option<&Requirement> {
        self.requirements.get(feature)
    }

    /// Preferred numeric range, if the species states one for this feature.
    pub fn range(&self, feature: &str) -> (Option<f64>, Option<f64>) {
        match self.requirements.get(feature) {
            Some(Requirement::Range { min, max }) => (*min, *max),
            _ => (None, None),
        }
    }

    /// Acceptable categorical values, if the species states any.
    pub fn accepted(&self, feature: &str) -> Option<&[String]> {
        match self.requirements.get(feature) {
            Some(Requirement::OneOf(values)) => Some(values.as_slice()),
            _ => None,
        }
    }

    /// `None` when the trait is not recorded for this species.
    pub fn has_trait(&self, name: &str) -> Option<bool> {
        self.traits.get(name).copied()
    }

    pub fn permits_use(&self, use_id: &str) -> bool {
        self.uses
            .iter()
            .any(|u| u.eq_ignore_ascii_case(use_id))
    }
}

/// Species catalog with stable insertion order.
///
/// Iteration order is the order species were supplied in, which downstream
/// ranking relies on for deterministic output.
#[derive(Debug, Clone, Default)]
pub struct SpeciesCatalog {
    species: Vec<SpeciesProfile>,
    index: FxHashMap<SpeciesId, usize>,
}

impl SpeciesCatalog {
    pub fn from_species(species: Vec<SpeciesProfile>) -> Self {
        let index = species
            .iter()
            .enumerate()
            .map(|(i, sp)| (sp.id, i))
            .collect();
        Self { species, index }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpeciesProfile> {
        self.species.iter()
    }

    pub fn get(&self, id: SpeciesId) -> Option<&SpeciesProfile> {
        self.index.get(&id).map(|&i| &self.species[i])
    }

    pub fn contains(&self, id: SpeciesId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

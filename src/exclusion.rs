//! Hard exclusion rules: binary pass/fail gates applied per (farm, species)
//! before any scoring happens.
//!
//! Missing data never excludes: a rule that cannot be evaluated is skipped.
//! `false` and `0` are meaningful values and are evaluated normally, so
//! explicit negative constraints in the data still fire.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::profile::{FarmProfile, SpeciesCatalog, SpeciesId, SpeciesProfile};

/// One hard-constraint predicate over farm and species attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionPredicate {
    /// The farm's numeric value must not fall below the species minimum.
    AtLeastSpeciesMin { feature: String },
    /// The farm's numeric value must not exceed the species maximum.
    AtMostSpeciesMax { feature: String },
    /// The farm's categorical value must be among the species' accepted set.
    InAcceptedSet { feature: String },
    /// If the farm flag is set, the species must carry the trait
    /// (e.g. a riparian farm requires riparian-tolerant species).
    RequiresTrait {
        farm_flag: String,
        species_trait: String,
    },
    /// The farm's intended agroforestry use must be permitted by the species.
    PermitsUse { farm_field: String },
    /// The species depends on at least one host/partner species surviving
    /// exclusion alongside it.
    RequiresHost {
        species_id: SpeciesId,
        hosts: Vec<SpeciesId>,
    },
}

/// A configured exclusion rule: predicate plus the human-readable reason
/// recorded when it fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub id: String,
    pub predicate: ExclusionPredicate,
    pub reason: String,
}

/// Per-species exclusion verdict with every firing reason, in rule order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExclusionRecord {
    pub excluded: bool,
    pub reasons: Vec<String>,
}

/// Catalog-divergence note: a rule referenced a species the catalog does not
/// contain. Surfaced in output, never raised.
#[derive(Debug, Clone, Serialize)]
pub struct UnknownSpeciesNote {
    pub species_id: SpeciesId,
    pub note: String,
}

/// Exclusion output for one farm.
#[derive(Debug, Clone, Default)]
pub struct ExclusionOutcome {
    records: FxHashMap<SpeciesId, ExclusionRecord>,
    pub unknown_species: Vec<UnknownSpeciesNote>,
}

impl ExclusionOutcome {
    /// Outcome with no exclusions at all (the `enable_exclusions = false`
    /// path).
    pub fn pass_all() -> Self {
        Self::default()
    }

    pub fn record(&self, species_id: SpeciesId) -> Option<&ExclusionRecord> {
        self.records.get(&species_id)
    }

    pub fn is_candidate(&self, species_id: SpeciesId) -> bool {
        self.records.get(&species_id).map_or(true, |r| !r.excluded)
    }
}

/// Tri-state rule evaluation: pass, fail, or cannot-evaluate (skip).
fn evaluate(
    predicate: &ExclusionPredicate,
    farm: &FarmProfile,
    species: &SpeciesProfile,
) -> Option<bool> {
    match predicate {
        ExclusionPredicate::AtLeastSpeciesMin { feature } => {
            let farm_value = farm.number(feature)?;
            let (min, _) = species.range(feature);
            Some(farm_value >= min?)
        }
        ExclusionPredicate::AtMostSpeciesMax { feature } => {
            let farm_value = farm.number(feature)?;
            let (_, max) = species.range(feature);
            Some(farm_value <= max?)
        }
        ExclusionPredicate::InAcceptedSet { feature } => {
            let farm_value = farm.text(feature)?;
            let accepted = species.accepted(feature)?;
            if accepted.is_empty() {
                return None;
            }
            Some(
                accepted
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(farm_value)),
            )
        }
        ExclusionPredicate::RequiresTrait {
            farm_flag,
            species_trait,
        } => {
            let flag = farm.flag(farm_flag)?;
            if !flag {
                return Some(true);
            }
            species.has_trait(species_trait)
        }
        ExclusionPredicate::PermitsUse { farm_field } => {
            let use_id = farm.text(farm_field)?;
            if species.uses.is_empty() {
                return None;
            }
            Some(species.permits_use(use_id))
        }
        // Host rules need the surviving candidate set; handled in a second
        // pass.
        ExclusionPredicate::RequiresHost { .. } => None,
    }
}

/// Apply every hard rule to every catalog species for one farm.
///
/// All firing reasons accumulate per species. Host-dependency rules run in a
/// second pass over the candidates that survived the attribute rules. Rules
/// naming a species absent from the catalog produce an unknown-species note
/// instead of an error.
pub fn run_exclusions(
    farm: &FarmProfile,
    catalog: &SpeciesCatalog,
    rules: &[ExclusionRule],
) -> ExclusionOutcome {
    let mut records: FxHashMap<SpeciesId, ExclusionRecord> = FxHashMap::default();

    // Pass 1: attribute rules, each evaluated independently.
    for species in catalog.iter() {
        let mut reasons = Vec::new();
        for rule in rules {
            if let Some(false) = evaluate(&rule.predicate, farm, species) {
                reasons.push(rule.reason.clone());
            }
        }
        records.insert(
            species.id,
            ExclusionRecord {
                excluded: !reasons.is_empty(),
                reasons,
            },
        );
    }

    // Pass 2: host-dependency rules over the surviving candidate set.
    let mut unknown_species = Vec::new();
    let candidates: FxHashSet<SpeciesId> = catalog
        .iter()
        .map(|sp| sp.id)
        .filter(|id| !records[id].excluded)
        .collect();

    for rule in rules {
        let ExclusionPredicate::RequiresHost { species_id, hosts } = &rule.predicate else {
            continue;
        };

        if !catalog.contains(*species_id) {
            unknown_species.push(UnknownSpeciesNote {
                species_id: *species_id,
                note: format!("unknown species referenced by rule '{}'", rule.id),
            });
            continue;
        }
        for host in hosts {
            if !catalog.contains(*host) {
                unknown_species.push(UnknownSpeciesNote {
                    species_id: *host,
                    note: format!("unknown host species referenced by rule '{}'", rule.id),
                });
            }
        }

        if !candidates.contains(species_id) {
            continue; // already excluded on attributes
        }
        let has_host = hosts.iter().any(|h| candidates.contains(h));
        if !has_host {
            let record = records.entry(*species_id).or_default();
            record.excluded = true;
            record.reasons.push(rule.reason.clone());
        }
    }

    ExclusionOutcome {
        records,
        unknown_species,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::FeatureValue;

    fn rule(id: &str, predicate: ExclusionPredicate, reason: &str) -> ExclusionRule {
        ExclusionRule {
            id: id.to_string(),
            predicate,
            reason: reason.to_string(),
        }
    }

    fn standard_rules() -> Vec<ExclusionRule> {
        vec![
            rule(
                "rain_min",
                ExclusionPredicate::AtLeastSpeciesMin {
                    feature: "rainfall_mm".to_string(),
                },
                "excluded: rainfall below minimum",
            ),
            rule(
                "rain_max",
                ExclusionPredicate::AtMostSpeciesMax {
                    feature: "rainfall_mm".to_string(),
                },
                "excluded: rainfall above maximum",
            ),
            rule(
                "soil_texture",
                ExclusionPredicate::InAcceptedSet {
                    feature: "soil_texture".to_string(),
                },
                "excluded: soil texture not supported",
            ),
            rule(
                "riparian_habitat",
                ExclusionPredicate::RequiresTrait {
                    farm_flag: "riparian".to_string(),
                    species_trait: "riparian".to_string(),
                },
                "excluded: not suitable for riparian habitat",
            ),
        ]
    }

    fn dry_farm() -> FarmProfile {
        FarmProfile::new(1)
            .with_feature("rainfall_mm", FeatureValue::Number(400.0))
            .with_feature("soil_texture", FeatureValue::Text("sand".to_string()))
            .with_feature("riparian", FeatureValue::Flag(true))
    }

    #[test]
    fn all_firing_reasons_accumulate() {
        let species = SpeciesProfile::new(1, "Khaya senegalensis", "")
            .with_range("rainfall_mm", 1000.0, 2500.0)
            .with_accepted("soil_texture", &["clay", "loam"])
            .with_trait("riparian", false);
        let catalog = SpeciesCatalog::from_species(vec![species]);

        let outcome = run_exclusions(&dry_farm(), &catalog, &standard_rules());
        let record = outcome.record(1).unwrap();
        assert!(record.excluded);
        assert_eq!(
            record.reasons,
            vec![
                "excluded: rainfall below minimum",
                "excluded: soil texture not supported",
                "excluded: not suitable for riparian habitat",
            ]
        );
    }

    #[test]
    fn missing_data_skips_rule_instead_of_excluding() {
        // Species states no rainfall range, no soil set, no riparian trait.
        let species = SpeciesProfile::new(2, "Ziziphus mauritiana", "");
        let catalog = SpeciesCatalog::from_species(vec![species]);

        let outcome = run_exclusions(&dry_farm(), &catalog, &standard_rules());
        assert!(outcome.is_candidate(2));
        assert!(outcome.record(2).unwrap().reasons.is_empty());
    }

    #[test]
    fn false_farm_flag_passes_trait_rule() {
        let farm = FarmProfile::new(1).with_feature("riparian", FeatureValue::Flag(false));
        let species =
            SpeciesProfile::new(3, "Acacia tortilis", "").with_trait("riparian", false);
        let catalog = SpeciesCatalog::from_species(vec![species]);

        let outcome = run_exclusions(&farm, &catalog, &standard_rules());
        assert!(outcome.is_candidate(3));
    }

    #[test]
    fn use_requirement_excludes_non_permitting_species() {
        let farm = FarmProfile::new(1)
            .with_feature("agroforestry_use", FeatureValue::Text("alley_cropping".to_string()));
        let rules = vec![rule(
            "use",
            ExclusionPredicate::PermitsUse {
                farm_field: "agroforestry_use".to_string(),
            },
            "excluded: not suited to intended agroforestry use",
        )];
        let catalog = SpeciesCatalog::from_species(vec![
            SpeciesProfile::new(1, "Faidherbia albida", "").with_use("alley_cropping"),
            SpeciesProfile::new(2, "Tectona grandis", "").with_use("woodlot"),
            SpeciesProfile::new(3, "Ziziphus mauritiana", ""), // no use data: skip
        ]);

        let outcome = run_exclusions(&farm, &catalog, &rules);
        assert!(outcome.is_candidate(1));
        assert!(!outcome.is_candidate(2));
        assert!(outcome.is_candidate(3));
    }

    #[test]
    fn host_rule_excludes_species_without_surviving_host() {
        let farm = FarmProfile::new(1)
            .with_feature("rainfall_mm", FeatureValue::Number(400.0));
        let mut rules = vec![rule(
            "rain_min",
            ExclusionPredicate::AtLeastSpeciesMin {
                feature: "rainfall_mm".to_string(),
            },
            "excluded: rainfall below minimum",
        )];
        rules.push(rule(
            "host",
            ExclusionPredicate::RequiresHost {
                species_id: 2,
                hosts: vec![1],
            },
            "excluded: no suitable host plant",
        ));

        // Host (1) fails the rainfall rule, so dependent (2) must go too.
        let catalog = SpeciesCatalog::from_species(vec![
            SpeciesProfile::new(1, "Khaya senegalensis", "").with_range("rainfall_mm", 1000.0, 2500.0),
            SpeciesProfile::new(2, "Santalum album", ""),
        ]);

        let outcome = run_exclusions(&farm, &catalog, &rules);
        assert!(!outcome.is_candidate(1));
        assert!(!outcome.is_candidate(2));
        assert_eq!(
            outcome.record(2).unwrap().reasons,
            vec!["excluded: no suitable host plant"]
        );
    }

    #[test]
    fn unknown_species_in_rule_notes_divergence_without_error() {
        let farm = FarmProfile::new(1);
        let rules = vec![rule(
            "host",
            ExclusionPredicate::RequiresHost {
                species_id: 404,
                hosts: vec![1],
            },
            "excluded: no suitable host plant",
        )];
        let catalog =
            SpeciesCatalog::from_species(vec![SpeciesProfile::new(1, "Khaya senegalensis", "")]);

        let outcome = run_exclusions(&farm, &catalog, &rules);
        assert_eq!(outcome.unknown_species.len(), 1);
        assert_eq!(outcome.unknown_species[0].species_id, 404);
        assert!(outcome.unknown_species[0].note.contains("rule 'host'"));
        // The catalog species is untouched.
        assert!(outcome.is_candidate(1));
    }
}

//! Weight plausibility checks.
//!
//! Weights are compared against population growth-chart bands per age
//! bracket. Outside 50%-150% of the band is treated as a measurement error
//! (transposed digits, lb entered as kg); inside that but outside the band is
//! only atypical.

use crate::types::{
    is_normalized_id, AlertCategory, AlertSeverity, GuardrailAlert, WeightExpectationRange,
};
use crate::{Error, Result};
use serde::Serialize;

/// Absolute bounds used when no age bracket is declared
pub const MIN_PLAUSIBLE_KG: f64 = 0.5;
pub const MAX_PLAUSIBLE_KG: f64 = 300.0;

const IMPLAUSIBLE_LOW_FACTOR: f64 = 0.5;
const IMPLAUSIBLE_HIGH_FACTOR: f64 = 1.5;

/// Age bracket → expected weight band, in a fixed display order
#[derive(Clone, Debug)]
pub struct WeightRangeTable {
    entries: Vec<(String, WeightExpectationRange)>,
}

impl WeightRangeTable {
    pub fn new(entries: Vec<(String, WeightExpectationRange)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, bracket: &str) -> Option<&WeightExpectationRange> {
        self.entries
            .iter()
            .find(|(name, _)| name == bracket)
            .map(|(_, range)| range)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WeightExpectationRange)> {
        self.entries.iter().map(|(name, range)| (name.as_str(), range))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (i, (name, range)) in self.entries.iter().enumerate() {
            if name.is_empty() {
                errors.push("Weight range has empty age bracket".to_string());
            } else if !is_normalized_id(name) {
                errors.push(format!(
                    "Age bracket '{}' must be lowercase without surrounding whitespace",
                    name
                ));
            }
            if self.entries[..i].iter().any(|(other, _)| other == name) {
                errors.push(format!("Duplicate age bracket '{}'", name));
            }
            let ordered = range.min_kg > 0.0
                && range.min_kg <= range.typical_kg
                && range.typical_kg <= range.max_kg
                && range.max_kg.is_finite();
            if !ordered {
                errors.push(format!(
                    "Age bracket '{}': expected 0 < min <= typical <= max, got {}/{}/{}",
                    name, range.min_kg, range.typical_kg, range.max_kg
                ));
            }
        }
        errors
    }
}

fn range(min_kg: f64, typical_kg: f64, max_kg: f64) -> WeightExpectationRange {
    WeightExpectationRange {
        min_kg,
        max_kg,
        typical_kg,
    }
}

/// Built-in bands (approximately 5th-95th percentile, CDC/WHO growth charts).
pub fn build_default_weight_ranges() -> WeightRangeTable {
    WeightRangeTable::new(vec![
        ("newborn".into(), range(2.5, 3.5, 4.5)),
        ("3months".into(), range(4.5, 6.0, 7.5)),
        ("6months".into(), range(6.0, 7.5, 9.5)),
        ("1year".into(), range(8.0, 10.0, 12.0)),
        ("2years".into(), range(10.0, 12.0, 15.0)),
        ("3years".into(), range(12.0, 14.0, 17.0)),
        ("4years".into(), range(13.0, 16.0, 20.0)),
        ("5years".into(), range(14.0, 18.0, 24.0)),
        ("6years".into(), range(16.0, 20.0, 27.0)),
        ("8years".into(), range(20.0, 26.0, 35.0)),
        ("10years".into(), range(26.0, 32.0, 50.0)),
        ("12years".into(), range(30.0, 40.0, 60.0)),
        ("14years".into(), range(38.0, 50.0, 72.0)),
        ("16years".into(), range(45.0, 60.0, 85.0)),
        ("adult".into(), range(45.0, 70.0, 150.0)),
    ])
}

/// How a measured weight compares to expectations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPlausibility {
    Plausible,
    Atypical,
    Implausible,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeightAssessment {
    pub plausibility: WeightPlausibility,
    pub alert: Option<GuardrailAlert>,
}

impl WeightAssessment {
    fn plausible() -> Self {
        Self {
            plausibility: WeightPlausibility::Plausible,
            alert: None,
        }
    }
}

/// Check a weight against the table, optionally for a declared age bracket
///
/// Fails only for an age bracket missing from the table.
pub fn check_weight(
    table: &WeightRangeTable,
    weight_kg: f64,
    age_bracket: Option<&str>,
) -> Result<WeightAssessment> {
    let Some(bracket) = age_bracket else {
        if weight_kg < MIN_PLAUSIBLE_KG || weight_kg > MAX_PLAUSIBLE_KG {
            let alert = GuardrailAlert::new(
                AlertSeverity::Critical,
                AlertCategory::Weight,
                format!(
                    "Weight {:.1} kg is outside the plausible range ({}-{} kg). Verify measurement.",
                    weight_kg, MIN_PLAUSIBLE_KG, MAX_PLAUSIBLE_KG
                ),
            )
            .with_recommendation("Re-weigh the patient or use a length-based tape");
            return Ok(WeightAssessment {
                plausibility: WeightPlausibility::Implausible,
                alert: Some(alert),
            });
        }
        return Ok(WeightAssessment::plausible());
    };

    let expected = table
        .get(bracket)
        .ok_or_else(|| Error::UnknownAgeBracket(bracket.to_string()))?;

    let implausible = weight_kg < IMPLAUSIBLE_LOW_FACTOR * expected.min_kg
        || weight_kg > IMPLAUSIBLE_HIGH_FACTOR * expected.max_kg;
    let atypical = weight_kg < expected.min_kg || weight_kg > expected.max_kg;

    let (plausibility, severity, recommendation) = if implausible {
        (
            WeightPlausibility::Implausible,
            AlertSeverity::Critical,
            "Verify measurement; re-weigh or use a length-based tape before dosing",
        )
    } else if atypical {
        (
            WeightPlausibility::Atypical,
            AlertSeverity::Warning,
            "Confirm weight; atypical for declared age",
        )
    } else {
        return Ok(WeightAssessment::plausible());
    };

    let verb = match plausibility {
        WeightPlausibility::Implausible => "is implausible",
        _ => "is atypical",
    };
    let alert = GuardrailAlert::new(
        severity,
        AlertCategory::Weight,
        format!(
            "Weight {:.1} kg {} for age {} (expected {:.1}-{:.1} kg)",
            weight_kg, verb, bracket, expected.min_kg, expected.max_kg
        ),
    )
    .with_recommendation(recommendation);

    tracing::debug!(
        weight_kg,
        bracket,
        ?plausibility,
        "weight outside expected range"
    );

    Ok(WeightAssessment {
        plausibility,
        alert: Some(alert),
    })
}

//! Dose calculator.
//!
//! The ceiling clamp here is unconditional and nothing downstream may
//! bypass it. The minimum effective dose is advisory only: falling short is
//! flagged but the dose is never raised.

use crate::types::{
    DoseComputationResult, DoseUnit, DosingMode, MedicationProfile, PatientType, VolumeUnit,
};
use crate::{Error, Result};

/// Compute the dose and administrable volume for one profile
pub fn compute_dose(
    profile: &MedicationProfile,
    weight_kg: f64,
    patient_type: PatientType,
) -> Result<DoseComputationResult> {
    if !(weight_kg.is_finite() && weight_kg > 0.0) {
        return Err(Error::InvalidWeight(weight_kg));
    }

    let raw_dose = match (profile.dosing, patient_type) {
        (DosingMode::Fixed { typical }, PatientType::Adult) => typical,
        (DosingMode::WeightBased { dose_per_kg }, _) => dose_per_kg * weight_kg,
        (DosingMode::Fixed { .. }, PatientType::Pediatric) => {
            return Err(Error::PatientTypeMismatch {
                medication_id: profile.id.clone(),
                patient_type,
            })
        }
    };

    let unit = profile.dose_unit;
    let mut warnings = Vec::new();

    let ceiling_applied = raw_dose > profile.max_dose;
    let adjusted_dose = if ceiling_applied {
        warnings.push(format!(
            "Calculated dose {} exceeds maximum of {}; capped at maximum",
            format_dose(raw_dose, unit),
            format_dose(profile.max_dose, unit)
        ));
        profile.max_dose
    } else {
        raw_dose
    };

    let floor_not_met = match profile.min_dose {
        Some(min) if adjusted_dose < min => {
            warnings.push(format!(
                "Dose {} is below the minimum effective dose of {}",
                format_dose(adjusted_dose, unit),
                format_dose(min, unit)
            ));
            true
        }
        _ => false,
    };

    let volume = adjusted_dose / profile.concentration.per_unit_volume();
    let volume_unit = profile.concentration.volume_unit;

    tracing::debug!(
        medication = %profile.id,
        weight_kg,
        raw_dose,
        adjusted_dose,
        ceiling_applied,
        floor_not_met,
        "computed dose"
    );

    Ok(DoseComputationResult {
        raw_dose,
        adjusted_dose,
        dose_unit: unit,
        volume,
        volume_unit,
        dose_display: format_dose(adjusted_dose, unit),
        volume_display: format_volume(volume, volume_unit),
        ceiling_applied,
        floor_not_met,
        warnings,
    })
}

/// Decimal places for a magnitude, or None when it should move to a finer unit.
fn decimals_for(value: f64) -> Option<usize> {
    let magnitude = value.abs();
    if magnitude >= 1.0 {
        Some(1)
    } else if magnitude >= 0.01 {
        Some(2)
    } else {
        None
    }
}

/// Human-readable dose: `>= 1` one decimal, `[0.01, 1)` two decimals,
/// smaller values move to the next finer unit with one decimal.
pub fn format_dose(value: f64, unit: DoseUnit) -> String {
    match decimals_for(value) {
        Some(places) => format!("{:.*} {}", places, value, unit),
        None => match unit.finer() {
            Some((finer, factor)) => format!("{:.1} {}", value * factor, finer),
            None => format!("{:.3} {}", value, unit),
        },
    }
}

pub fn format_volume(value: f64, unit: VolumeUnit) -> String {
    match decimals_for(value) {
        Some(places) => format!("{:.*} {}", places, value, unit),
        None => format!("{:.3} {}", value, unit),
    }
}

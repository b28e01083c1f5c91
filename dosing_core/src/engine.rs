//! Guardrail orchestrator.
//!
//! Evaluation order:
//! 1. Resolve the profile and validate caller input
//! 2. Compute the dose (ceiling clamp applied here, never bypassed)
//! 3. Weight plausibility (critical blocks)
//! 4. Dose alerts: ceiling applied, near-ceiling pediatric, floor not met
//! 5. Interactions (critical blocks)
//! 6. Contraindications (absolute blocks)
//! 7. Stable sort by severity, ties keep the order above
//!
//! Each call is independent: the engine holds nothing but a shared reference
//! to the frozen [`Formulary`].

use crate::contraindications::check_contraindications;
use crate::dose::{compute_dose, format_dose};
use crate::formulary::Formulary;
use crate::interactions::check_interactions;
use crate::types::{
    AlertCategory, AlertSeverity, DoseComputationResult, DoseRequest, GuardrailAlert,
    GuardrailVerdict, MedicationProfile, PatientType, normalize_id,
};
use crate::weight::{check_weight, WeightPlausibility};
use crate::{Error, Result};

/// Fraction of the ceiling at which pediatric doses get a warning
pub const NEAR_CEILING_FRACTION: f64 = 0.9;

#[derive(Clone, Copy, Debug)]
pub struct GuardrailEngine<'a> {
    formulary: &'a Formulary,
}

impl GuardrailEngine<'static> {
    /// Engine over the built-in formulary
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(Formulary::builtin()?))
    }
}

impl<'a> GuardrailEngine<'a> {
    pub fn new(formulary: &'a Formulary) -> Self {
        Self { formulary }
    }

    pub fn formulary(&self) -> &'a Formulary {
        self.formulary
    }

    /// Evaluate one dosing request
    ///
    /// Returns `Ok` for every well-formed request, including blocked ones.
    /// `Err` is reserved for caller input errors (unknown medication or age
    /// bracket, invalid weight, patient type the profile does not cover).
    pub fn evaluate(&self, request: &DoseRequest) -> Result<GuardrailVerdict> {
        let profile = self
            .formulary
            .catalog()
            .lookup(&normalize_id(&request.medication_id))?;

        if !(request.weight_kg.is_finite() && request.weight_kg > 0.0) {
            return Err(Error::InvalidWeight(request.weight_kg));
        }
        if !profile.patient_type.includes(request.patient_type) {
            return Err(Error::PatientTypeMismatch {
                medication_id: profile.id.clone(),
                patient_type: request.patient_type,
            });
        }

        let age_bracket = request.age_bracket.as_deref().map(normalize_id);
        let concurrent_classes: Vec<String> =
            request.concurrent_classes.iter().map(|c| normalize_id(c)).collect();
        let conditions: Vec<String> = request.conditions.iter().map(|c| normalize_id(c)).collect();

        let dose = compute_dose(profile, request.weight_kg, request.patient_type)?;

        let mut can_administer = true;
        let mut alerts = Vec::new();

        let weight = check_weight(
            self.formulary.weight_ranges(),
            request.weight_kg,
            age_bracket.as_deref(),
        )?;
        if weight.plausibility == WeightPlausibility::Implausible {
            can_administer = false;
        }
        alerts.extend(weight.alert);

        alerts.extend(dose_alerts(profile, &dose, request.patient_type));

        let interaction_alerts = check_interactions(
            self.formulary.interactions(),
            &profile.base_drug_id,
            &concurrent_classes,
        );
        if interaction_alerts.iter().any(GuardrailAlert::is_critical) {
            can_administer = false;
        }
        alerts.extend(interaction_alerts);

        let contraindication_alerts =
            check_contraindications(self.formulary.contraindications(), &profile.id, &conditions);
        if contraindication_alerts.iter().any(GuardrailAlert::is_critical) {
            can_administer = false;
        }
        alerts.extend(contraindication_alerts);

        // Stable: equal ranks keep weight, dose, interaction, contraindication order
        alerts.sort_by_key(|a| a.severity.rank());

        if can_administer {
            tracing::debug!(
                medication = %profile.id,
                adjusted_dose = dose.adjusted_dose,
                alerts = alerts.len(),
                "evaluation complete"
            );
        } else {
            tracing::warn!(
                medication = %profile.id,
                adjusted_dose = dose.adjusted_dose,
                alerts = alerts.len(),
                "administration blocked; override required"
            );
        }

        Ok(GuardrailVerdict {
            medication_id: profile.id.clone(),
            can_administer,
            requires_override: !can_administer,
            adjusted_dose: dose.adjusted_dose,
            dose,
            alerts,
        })
    }
}

/// Evaluate against the built-in formulary
pub fn evaluate(request: &DoseRequest) -> Result<GuardrailVerdict> {
    GuardrailEngine::builtin()?.evaluate(request)
}

/// Dose-category alerts; none of them block on their own.
fn dose_alerts(
    profile: &MedicationProfile,
    dose: &DoseComputationResult,
    patient_type: PatientType,
) -> Vec<GuardrailAlert> {
    let mut alerts = Vec::new();
    let unit = dose.dose_unit;

    if dose.ceiling_applied {
        alerts.push(
            GuardrailAlert::new(
                AlertSeverity::Critical,
                AlertCategory::Dose,
                format!(
                    "Maximum dose exceeded: calculated {} capped at {}",
                    format_dose(dose.raw_dose, unit),
                    format_dose(profile.max_dose, unit)
                ),
            )
            .with_recommendation("Administer the capped dose only; verify weight"),
        );
    } else if patient_type == PatientType::Pediatric
        && dose.adjusted_dose >= NEAR_CEILING_FRACTION * profile.max_dose
    {
        alerts.push(
            GuardrailAlert::new(
                AlertSeverity::Warning,
                AlertCategory::Dose,
                format!(
                    "Pediatric dose {} is near the maximum of {}",
                    format_dose(dose.adjusted_dose, unit),
                    format_dose(profile.max_dose, unit)
                ),
            )
            .with_recommendation("Double-check weight and dose before administering"),
        );
    }

    if dose.floor_not_met {
        if let Some(min) = profile.min_dose {
            alerts.push(
                GuardrailAlert::new(
                    AlertSeverity::Info,
                    AlertCategory::Dose,
                    format!(
                        "Dose {} is below the minimum effective dose of {}",
                        format_dose(dose.adjusted_dose, unit),
                        format_dose(min, unit)
                    ),
                )
                .with_recommendation("Dose is not raised automatically; follow local protocol"),
            );
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> GuardrailEngine<'static> {
        crate::logging::init_test();
        GuardrailEngine::builtin().unwrap()
    }

    #[test]
    fn test_clean_evaluation() {
        let verdict = engine()
            .evaluate(&DoseRequest::new("ondansetron", 10.0, PatientType::Pediatric))
            .unwrap();

        assert!(verdict.can_administer);
        assert!(!verdict.requires_override);
        assert!(verdict.alerts.is_empty());
        assert_eq!(verdict.adjusted_dose, verdict.dose.raw_dose);
    }

    #[test]
    fn test_unknown_medication_is_error() {
        let err = engine()
            .evaluate(&DoseRequest::new("unobtainium", 10.0, PatientType::Adult))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownMedication(_)));
    }

    #[test]
    fn test_invalid_weight_is_error() {
        let err = engine()
            .evaluate(&DoseRequest::new("naloxone", 0.0, PatientType::Pediatric))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidWeight(w) if w == 0.0));
    }

    #[test]
    fn test_patient_type_mismatch_is_error() {
        let err = engine()
            .evaluate(&DoseRequest::new("fentanyl", 70.0, PatientType::Adult))
            .unwrap_err();
        assert!(matches!(err, Error::PatientTypeMismatch { .. }));
    }

    #[test]
    fn test_near_ceiling_pediatric_warning() {
        // 0.1 mg/kg * 19 kg = 1.9 mg of a 2 mg ceiling
        let verdict = engine()
            .evaluate(&DoseRequest::new("naloxone", 19.0, PatientType::Pediatric))
            .unwrap();

        assert!(verdict.can_administer);
        assert_eq!(verdict.alerts.len(), 1);
        assert_eq!(verdict.alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(verdict.alerts[0].category, AlertCategory::Dose);
    }

    #[test]
    fn test_near_ceiling_not_raised_for_adults() {
        // 0.01 mg/kg * 48 kg = 0.48 mg of 0.5 mg
        let verdict = engine()
            .evaluate(&DoseRequest::new(
                "epinephrine-anaphylaxis",
                48.0,
                PatientType::Adult,
            ))
            .unwrap();
        assert!(verdict.alerts.is_empty());
    }

    #[test]
    fn test_ceiling_alert_does_not_block() {
        let verdict = engine()
            .evaluate(&DoseRequest::new(
                "epinephrine-anaphylaxis",
                80.0,
                PatientType::Adult,
            ))
            .unwrap();

        assert!(verdict.can_administer);
        assert_eq!(verdict.adjusted_dose, 0.5);
        assert_eq!(verdict.alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(verdict.alerts[0].category, AlertCategory::Dose);
        assert_eq!(verdict.blocking_alerts().count(), 0);
    }

    #[test]
    fn test_floor_not_met_is_info() {
        let verdict = engine()
            .evaluate(&DoseRequest::new("atropine", 3.0, PatientType::Pediatric))
            .unwrap();

        assert!(verdict.can_administer);
        assert_eq!(verdict.alerts.len(), 1);
        assert_eq!(verdict.alerts[0].severity, AlertSeverity::Info);
        assert!(verdict.adjusted_dose < 0.1);
    }

    #[test]
    fn test_absolute_contraindication_blocks() {
        let verdict = engine()
            .evaluate(
                &DoseRequest::new("nitroglycerin", 80.0, PatientType::Adult)
                    .with_conditions(["pde5_inhibitor_use"]),
            )
            .unwrap();

        assert!(!verdict.can_administer);
        assert!(verdict.requires_override);
        assert_eq!(verdict.blocking_alerts().count(), 1);
    }

    #[test]
    fn test_identifiers_are_normalized() {
        let verdict = engine()
            .evaluate(
                &DoseRequest::new("fentanyl", 20.0, PatientType::Pediatric)
                    .with_age_bracket(" 6Years ")
                    .with_concurrent_classes(["MAOI "]),
            )
            .unwrap();
        assert!(!verdict.can_administer);
        assert_eq!(verdict.alerts[0].category, AlertCategory::Interaction);
    }

    #[test]
    fn test_alerts_sorted_with_stable_ties() {
        // Atypical weight (warning), near ceiling (warning), major interaction (warning),
        // absolute contraindication (critical)
        let verdict = engine()
            .evaluate(
                &DoseRequest::new("fentanyl", 48.0, PatientType::Pediatric)
                    .with_age_bracket("8years")
                    .with_concurrent_classes(["benzodiazepine"])
                    .with_conditions(["respiratory_depression"]),
            )
            .unwrap();

        let order: Vec<_> = verdict
            .alerts
            .iter()
            .map(|a| (a.severity, a.category))
            .collect();
        assert_eq!(
            order,
            vec![
                (AlertSeverity::Critical, AlertCategory::Contraindication),
                (AlertSeverity::Warning, AlertCategory::Weight),
                (AlertSeverity::Warning, AlertCategory::Dose),
                (AlertSeverity::Warning, AlertCategory::Interaction),
            ]
        );
        assert!(!verdict.can_administer);
    }

    #[test]
    fn test_unknown_age_bracket_is_error() {
        let err = engine()
            .evaluate(
                &DoseRequest::new("naloxone", 12.0, PatientType::Pediatric)
                    .with_age_bracket("toddler"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAgeBracket(_)));
    }
}

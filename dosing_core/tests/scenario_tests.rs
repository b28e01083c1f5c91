//! Scenario tests for the guardrail engine.
//!
//! Each case pins the full outcome of one clinically meaningful request
//! against the built-in formulary.

use dosing_core::{AlertCategory, AlertSeverity, DoseRequest, GuardrailEngine, PatientType};

struct ScenarioCase {
    id: &'static str,
    medication: &'static str,
    weight_kg: f64,
    patient_type: PatientType,
    age_bracket: Option<&'static str>,
    taking: &'static [&'static str],
    conditions: &'static [&'static str],
    expected_raw: f64,
    expected_adjusted: f64,
    expected_ceiling: bool,
    expected_can_administer: bool,
    expected_alerts: &'static [(AlertSeverity, AlertCategory)],
}

fn get_scenarios() -> Vec<ScenarioCase> {
    use AlertCategory::*;
    use AlertSeverity::*;

    vec![
        ScenarioCase {
            id: "adult-epinephrine-capped",
            medication: "epinephrine-anaphylaxis",
            weight_kg: 80.0,
            patient_type: PatientType::Adult,
            age_bracket: Option::None,
            taking: &[],
            conditions: &[],
            expected_raw: 0.8,
            expected_adjusted: 0.5,
            expected_ceiling: true,
            expected_can_administer: true,
            expected_alerts: &[(Critical, Dose)],
        },
        ScenarioCase {
            id: "implausible-weight-for-age",
            medication: "naloxone",
            weight_kg: 3.0,
            patient_type: PatientType::Pediatric,
            age_bracket: Some("10years"),
            taking: &[],
            conditions: &[],
            expected_raw: 0.3,
            expected_adjusted: 0.3,
            expected_ceiling: false,
            expected_can_administer: false,
            expected_alerts: &[(Critical, Weight)],
        },
        ScenarioCase {
            id: "fentanyl-with-maoi",
            medication: "fentanyl",
            weight_kg: 20.0,
            patient_type: PatientType::Pediatric,
            age_bracket: Option::None,
            taking: &["maoi"],
            conditions: &[],
            expected_raw: 20.0,
            expected_adjusted: 20.0,
            expected_ceiling: false,
            expected_can_administer: false,
            expected_alerts: &[(Critical, Interaction)],
        },
        ScenarioCase {
            id: "epinephrine-in-pregnancy",
            medication: "epinephrine-anaphylaxis",
            weight_kg: 45.0,
            patient_type: PatientType::Adult,
            age_bracket: Option::None,
            taking: &[],
            conditions: &["pregnancy"],
            expected_raw: 0.45,
            expected_adjusted: 0.45,
            expected_ceiling: false,
            expected_can_administer: true,
            expected_alerts: &[(Warning, Contraindication)],
        },
        ScenarioCase {
            id: "clean-pediatric-dose",
            medication: "ondansetron",
            weight_kg: 10.0,
            patient_type: PatientType::Pediatric,
            age_bracket: Option::None,
            taking: &[],
            conditions: &[],
            expected_raw: 1.5,
            expected_adjusted: 1.5,
            expected_ceiling: false,
            expected_can_administer: true,
            expected_alerts: &[],
        },
        ScenarioCase {
            id: "adult-adenosine-heart-block",
            medication: "adenosine-adult",
            weight_kg: 90.0,
            patient_type: PatientType::Adult,
            age_bracket: Some("adult"),
            taking: &["methylxanthine"],
            conditions: &["second_or_third_degree_heart_block"],
            expected_raw: 6.0,
            expected_adjusted: 6.0,
            expected_ceiling: false,
            expected_can_administer: false,
            expected_alerts: &[(Critical, Contraindication), (Info, Interaction)],
        },
        ScenarioCase {
            id: "major-interaction-warns-only",
            medication: "midazolam",
            weight_kg: 14.0,
            patient_type: PatientType::Pediatric,
            age_bracket: Some("3years"),
            taking: &["opioid"],
            conditions: &[],
            expected_raw: 1.4,
            expected_adjusted: 1.4,
            expected_ceiling: false,
            expected_can_administer: true,
            expected_alerts: &[(Warning, Interaction)],
        },
    ]
}

#[test]
fn test_scenarios() {
    let engine = GuardrailEngine::builtin().unwrap();

    for case in get_scenarios() {
        let mut request = DoseRequest::new(case.medication, case.weight_kg, case.patient_type)
            .with_concurrent_classes(case.taking.iter().copied())
            .with_conditions(case.conditions.iter().copied());
        if let Some(bracket) = case.age_bracket {
            request = request.with_age_bracket(bracket);
        }

        let verdict = engine
            .evaluate(&request)
            .unwrap_or_else(|e| panic!("Case {}: evaluation failed: {}", case.id, e));

        assert!(
            (verdict.dose.raw_dose - case.expected_raw).abs() < 1e-9,
            "Case {}: raw dose - expected {}, got {}",
            case.id,
            case.expected_raw,
            verdict.dose.raw_dose
        );
        assert!(
            (verdict.adjusted_dose - case.expected_adjusted).abs() < 1e-9,
            "Case {}: adjusted dose - expected {}, got {}",
            case.id,
            case.expected_adjusted,
            verdict.adjusted_dose
        );
        assert_eq!(
            verdict.dose.ceiling_applied, case.expected_ceiling,
            "Case {}: ceiling mismatch",
            case.id
        );
        assert_eq!(
            verdict.can_administer, case.expected_can_administer,
            "Case {}: can_administer mismatch",
            case.id
        );
        assert_eq!(
            verdict.requires_override, !case.expected_can_administer,
            "Case {}: requires_override mismatch",
            case.id
        );

        let alerts: Vec<_> = verdict
            .alerts
            .iter()
            .map(|a| (a.severity, a.category))
            .collect();
        assert_eq!(alerts, case.expected_alerts, "Case {}: alerts mismatch", case.id);
    }
}

#[test]
fn test_fixed_adult_dose_ignores_weight() {
    let engine = GuardrailEngine::builtin().unwrap();

    for weight in [45.0, 70.0, 140.0] {
        let verdict = engine
            .evaluate(&DoseRequest::new("aspirin", weight, PatientType::Adult))
            .unwrap();
        assert_eq!(verdict.adjusted_dose, 324.0);
        assert_eq!(verdict.dose.volume_display, "4.0 tablet");
    }
}

#[test]
fn test_display_moves_to_finer_unit() {
    let engine = GuardrailEngine::builtin().unwrap();

    // 0.01 mg/kg * 0.8 kg = 0.008 mg
    let verdict = engine
        .evaluate(&DoseRequest::new(
            "epinephrine-arrest",
            0.8,
            PatientType::Pediatric,
        ))
        .unwrap();
    assert_eq!(verdict.dose.dose_display, "8.0 mcg");
    assert_eq!(verdict.dose.volume_display, "0.08 mL");
}

#[test]
fn test_free_function_matches_engine() {
    let request = DoseRequest::new("morphine", 25.0, PatientType::Pediatric)
        .with_conditions(["head_injury"]);

    let via_fn = dosing_core::evaluate(&request).unwrap();
    let via_engine = GuardrailEngine::builtin().unwrap().evaluate(&request).unwrap();
    assert_eq!(via_fn, via_engine);
}

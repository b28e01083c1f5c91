//! Contraindication rules keyed by full profile id.
//!
//! Rules are profile-specific: `fentanyl` and `fentanyl-adult` carry their
//! own lists.

use crate::catalog::Catalog;
use crate::types::{
    is_normalized_id, AlertCategory, ContraindicationRule, ContraindicationSeverity,
    GuardrailAlert,
};

impl ContraindicationRule {
    fn to_alert(&self) -> GuardrailAlert {
        let label = match self.severity {
            ContraindicationSeverity::Absolute => "Contraindicated",
            ContraindicationSeverity::Relative => "Use with caution",
        };
        GuardrailAlert::new(
            self.severity.alert_severity(),
            AlertCategory::Contraindication,
            format!("{} ({}): {}", label, self.condition, self.message),
        )
        .with_recommendation(self.recommendation.clone())
    }
}

/// Exact `(medication_id, condition)` matches, in rule-table order.
pub fn check_contraindications(
    rules: &[ContraindicationRule],
    medication_id: &str,
    conditions: &[String],
) -> Vec<GuardrailAlert> {
    rules
        .iter()
        .filter(|rule| rule.medication_id == medication_id)
        .filter(|rule| conditions.iter().any(|c| *c == rule.condition))
        .map(ContraindicationRule::to_alert)
        .collect()
}

pub fn validate_rules(rules: &[ContraindicationRule], catalog: &Catalog) -> Vec<String> {
    let mut errors = Vec::new();
    for (i, rule) in rules.iter().enumerate() {
        if !catalog.contains(&rule.medication_id) {
            errors.push(format!(
                "Contraindication '{}' references unknown medication '{}'",
                rule.condition, rule.medication_id
            ));
        }
        if rule.condition.is_empty() {
            errors.push(format!(
                "Contraindication for '{}' has empty condition",
                rule.medication_id
            ));
        } else if !is_normalized_id(&rule.condition) {
            errors.push(format!(
                "Contraindication '{}' for '{}' must be lowercase without surrounding whitespace",
                rule.condition, rule.medication_id
            ));
        }
        if rules[..i]
            .iter()
            .any(|r| r.medication_id == rule.medication_id && r.condition == rule.condition)
        {
            errors.push(format!(
                "Duplicate contraindication '{}' for '{}'",
                rule.condition, rule.medication_id
            ));
        }
    }
    errors
}

fn rule(
    medication_id: &str,
    condition: &str,
    severity: ContraindicationSeverity,
    message: &str,
    recommendation: &str,
) -> ContraindicationRule {
    ContraindicationRule {
        medication_id: medication_id.into(),
        condition: condition.into(),
        severity,
        message: message.into(),
        recommendation: recommendation.into(),
    }
}

/// Built-in contraindication rules
pub fn build_default_contraindications() -> Vec<ContraindicationRule> {
    use ContraindicationSeverity::*;

    vec![
        rule(
            "epinephrine-anaphylaxis",
            "pregnancy",
            Relative,
            "Vasoconstriction may reduce uteroplacental blood flow.",
            "Benefit outweighs risk in anaphylaxis; administer and monitor.",
        ),
        rule(
            "epinephrine-anaphylaxis",
            "coronary_artery_disease",
            Relative,
            "May precipitate myocardial ischemia.",
            "Administer for life-threatening anaphylaxis; monitor ECG.",
        ),
        rule(
            "adenosine",
            "second_or_third_degree_heart_block",
            Absolute,
            "May cause prolonged asystole.",
            "Do not administer; contact base hospital.",
        ),
        rule(
            "adenosine-adult",
            "second_or_third_degree_heart_block",
            Absolute,
            "May cause prolonged asystole.",
            "Do not administer; contact base hospital.",
        ),
        rule(
            "adenosine-adult",
            "sick_sinus_syndrome",
            Absolute,
            "May cause prolonged sinus arrest.",
            "Do not administer without a functioning pacemaker.",
        ),
        rule(
            "adenosine-adult",
            "asthma",
            Relative,
            "May provoke bronchospasm.",
            "Have bronchodilator available; consider alternatives.",
        ),
        rule(
            "amiodarone-adult",
            "second_or_third_degree_heart_block",
            Absolute,
            "Worsens AV conduction block.",
            "Do not administer without pacing capability.",
        ),
        rule(
            "fentanyl",
            "respiratory_depression",
            Absolute,
            "Opioids worsen existing respiratory depression.",
            "Support ventilation; do not administer.",
        ),
        rule(
            "fentanyl-adult",
            "respiratory_depression",
            Absolute,
            "Opioids worsen existing respiratory depression.",
            "Support ventilation; do not administer.",
        ),
        rule(
            "fentanyl-adult",
            "hypotension",
            Relative,
            "May worsen hypotension.",
            "Reduce dose; reassess blood pressure after each dose.",
        ),
        rule(
            "morphine",
            "hypotension",
            Relative,
            "Histamine release may worsen hypotension.",
            "Consider fentanyl instead.",
        ),
        rule(
            "morphine",
            "head_injury",
            Relative,
            "May mask neurological findings and raise ICP via hypercarbia.",
            "Use lowest effective dose; document GCS before administration.",
        ),
        rule(
            "midazolam",
            "hypotension",
            Relative,
            "May worsen hypotension.",
            "Prefer IM/IN route; reassess blood pressure.",
        ),
        rule(
            "midazolam-adult",
            "hypotension",
            Relative,
            "May worsen hypotension.",
            "Reduce dose; reassess blood pressure.",
        ),
        rule(
            "ondansetron",
            "long_qt_syndrome",
            Absolute,
            "Congenital long QT; risk of torsades de pointes.",
            "Do not administer.",
        ),
        rule(
            "diphenhydramine",
            "neonate",
            Absolute,
            "Antihistamines are contraindicated in neonates.",
            "Do not administer; contact base hospital.",
        ),
        rule(
            "nitroglycerin",
            "hypotension",
            Absolute,
            "Systolic blood pressure below 90 mmHg.",
            "Do not administer nitrates.",
        ),
        rule(
            "nitroglycerin",
            "pde5_inhibitor_use",
            Absolute,
            "PDE5 inhibitor taken within 48 hours.",
            "Do not administer nitrates.",
        ),
        rule(
            "nitroglycerin",
            "right_ventricular_infarction",
            Relative,
            "Preload-dependent infarct; risk of profound hypotension.",
            "Establish IV access and obtain right-sided ECG first.",
        ),
        rule(
            "aspirin",
            "aspirin_allergy",
            Absolute,
            "Known hypersensitivity to aspirin or NSAIDs.",
            "Do not administer.",
        ),
        rule(
            "aspirin",
            "active_gi_bleed",
            Absolute,
            "Active gastrointestinal bleeding.",
            "Do not administer.",
        ),
    ]
}

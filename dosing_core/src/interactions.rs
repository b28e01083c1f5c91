//! Drug interaction rules and matching.

use crate::types::{
    is_normalized_id, AlertCategory, DrugInteractionRule, GuardrailAlert, InteractionSeverity,
};
use std::collections::HashSet;

impl DrugInteractionRule {
    /// Symmetric match: the subject may appear on either side of the pair.
    pub fn matches(&self, subject: &str, concurrent: &HashSet<&str>) -> bool {
        (self.drug1 == subject && concurrent.contains(self.drug2.as_str()))
            || (self.drug2 == subject && concurrent.contains(self.drug1.as_str()))
    }

    /// The identifier on the other side of the pair from `subject`.
    pub fn counterpart(&self, subject: &str) -> &str {
        if self.drug1 == subject {
            &self.drug2
        } else {
            &self.drug1
        }
    }

    fn to_alert(&self, subject: &str) -> GuardrailAlert {
        GuardrailAlert::new(
            self.severity.alert_severity(),
            AlertCategory::Interaction,
            format!(
                "{} interaction: {} + {}. {}",
                capitalize(&self.severity.to_string()),
                subject,
                self.counterpart(subject),
                self.description
            ),
        )
        .with_recommendation(self.recommendation.clone())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Every rule matching `base_drug_id` against the concurrent classes, in
/// rule-table order.
pub fn check_interactions(
    rules: &[DrugInteractionRule],
    base_drug_id: &str,
    concurrent_classes: &[String],
) -> Vec<GuardrailAlert> {
    if concurrent_classes.is_empty() {
        return Vec::new();
    }
    let concurrent: HashSet<&str> = concurrent_classes.iter().map(String::as_str).collect();

    rules
        .iter()
        .filter(|rule| rule.matches(base_drug_id, &concurrent))
        .map(|rule| rule.to_alert(base_drug_id))
        .collect()
}

/// Validate rules against the set of known base drug ids
pub fn validate_rules(rules: &[DrugInteractionRule], base_drugs: &HashSet<&str>) -> Vec<String> {
    let mut errors = Vec::new();
    for rule in rules {
        if rule.drug1.is_empty() || rule.drug2.is_empty() {
            errors.push(format!(
                "Interaction rule '{}' + '{}' has an empty side",
                rule.drug1, rule.drug2
            ));
            continue;
        }
        for side in [&rule.drug1, &rule.drug2] {
            if !is_normalized_id(side) {
                errors.push(format!(
                    "Interaction rule '{}' + '{}': '{}' must be lowercase without surrounding whitespace",
                    rule.drug1, rule.drug2, side
                ));
            }
        }
        if rule.drug1 == rule.drug2 {
            errors.push(format!("Interaction rule pairs '{}' with itself", rule.drug1));
        }
        if !base_drugs.contains(rule.drug1.as_str()) && !base_drugs.contains(rule.drug2.as_str()) {
            errors.push(format!(
                "Interaction rule '{}' + '{}' names no catalog drug",
                rule.drug1, rule.drug2
            ));
        }
    }
    errors
}

fn rule(
    drug1: &str,
    drug2: &str,
    severity: InteractionSeverity,
    description: &str,
    recommendation: &str,
) -> DrugInteractionRule {
    DrugInteractionRule {
        drug1: drug1.into(),
        drug2: drug2.into(),
        severity,
        description: description.into(),
        recommendation: recommendation.into(),
    }
}

/// Built-in interaction rules (base drug id vs. medication class id)
pub fn build_default_interactions() -> Vec<DrugInteractionRule> {
    use InteractionSeverity::*;

    vec![
        // Opioids
        rule(
            "fentanyl",
            "maoi",
            Critical,
            "Risk of serotonin syndrome and hemodynamic instability with MAO inhibitors.",
            "Do not administer. Contact base hospital for an alternative analgesic.",
        ),
        rule(
            "morphine",
            "maoi",
            Critical,
            "MAO inhibitors potentiate opioid CNS and respiratory depression.",
            "Do not administer. Contact base hospital for an alternative analgesic.",
        ),
        rule(
            "benzodiazepine",
            "fentanyl",
            Major,
            "Additive respiratory depression.",
            "Reduce dose, monitor EtCO2 and have BVM and naloxone ready.",
        ),
        rule(
            "morphine",
            "benzodiazepine",
            Major,
            "Additive respiratory depression.",
            "Reduce dose, monitor EtCO2 and have BVM and naloxone ready.",
        ),
        rule(
            "fentanyl",
            "cns_depressant",
            Moderate,
            "Additive sedation with alcohol, barbiturates or sedating antihistamines.",
            "Monitor level of consciousness and respiratory rate.",
        ),
        rule(
            "midazolam",
            "opioid",
            Major,
            "Additive respiratory depression with opioids.",
            "Use lowest effective dose; monitor EtCO2.",
        ),
        rule(
            "naloxone",
            "opioid",
            Moderate,
            "May precipitate acute withdrawal in opioid-dependent patients.",
            "Titrate slowly to respiratory effort.",
        ),
        // Sympathomimetics
        rule(
            "epinephrine",
            "beta_blocker",
            Moderate,
            "Beta blockade blunts response and may cause unopposed alpha hypertension.",
            "Anticipate reduced effect; consider glucagon per protocol.",
        ),
        rule(
            "epinephrine",
            "tricyclic_antidepressant",
            Major,
            "Tricyclics potentiate pressor effects; risk of dysrhythmia.",
            "Monitor ECG and blood pressure closely.",
        ),
        rule(
            "maoi",
            "epinephrine",
            Major,
            "Risk of hypertensive crisis.",
            "Monitor blood pressure; do not withhold in anaphylaxis.",
        ),
        // Antiarrhythmics
        rule(
            "adenosine",
            "dipyridamole",
            Major,
            "Dipyridamole markedly potentiates adenosine.",
            "Consider a reduced initial dose per base hospital.",
        ),
        rule(
            "adenosine",
            "methylxanthine",
            Moderate,
            "Theophylline and caffeine antagonize adenosine.",
            "Higher doses may be required.",
        ),
        rule(
            "adenosine",
            "carbamazepine",
            Moderate,
            "Increased risk of heart block.",
            "Monitor rhythm closely.",
        ),
        rule(
            "amiodarone",
            "qt_prolonging",
            Major,
            "Additive QT prolongation; risk of torsades de pointes.",
            "Obtain 12-lead; contact base hospital before administering.",
        ),
        rule(
            "amiodarone",
            "beta_blocker",
            Moderate,
            "Additive bradycardia and AV block.",
            "Monitor heart rate and rhythm.",
        ),
        rule(
            "ondansetron",
            "qt_prolonging",
            Moderate,
            "Additive QT prolongation.",
            "Monitor ECG where available.",
        ),
        rule(
            "ondansetron",
            "ssri",
            Minor,
            "Rare serotonin syndrome reports with serotonergic drugs.",
            "Observe for agitation, hyperthermia or clonus.",
        ),
        // Cardiac
        rule(
            "nitroglycerin",
            "pde5_inhibitor",
            Critical,
            "Phosphodiesterase-5 inhibitors cause profound, refractory hypotension with nitrates.",
            "Do not administer nitrates within 48 hours of PDE5 inhibitor use.",
        ),
        rule(
            "aspirin",
            "anticoagulant",
            Major,
            "Increased bleeding risk.",
            "Confirm with base hospital before administering.",
        ),
        rule(
            "diphenhydramine",
            "cns_depressant",
            Moderate,
            "Additive sedation.",
            "Monitor level of consciousness.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlertSeverity;
    use crate::types::InteractionSeverity::{Critical, Minor};

    fn classes(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fentanyl_maoi_is_critical() {
        let rules = build_default_interactions();
        let alerts = check_interactions(&rules, "fentanyl", &classes(&["maoi"]));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[0].category, AlertCategory::Interaction);
        assert!(alerts[0].message.contains("fentanyl + maoi"));
    }

    #[test]
    fn test_matching_is_symmetric() {
        let rules = build_default_interactions();
        // Rule is written as ("benzodiazepine", "fentanyl")
        let alerts = check_interactions(&rules, "fentanyl", &classes(&["benzodiazepine"]));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
        assert!(alerts[0].message.contains("fentanyl + benzodiazepine"));
    }

    #[test]
    fn test_collects_all_matches() {
        let rules = build_default_interactions();
        let alerts = check_interactions(
            &rules,
            "fentanyl",
            &classes(&["maoi", "benzodiazepine", "cns_depressant", "ssri"]),
        );
        let severities: Vec<_> = alerts.iter().map(|a| a.severity).collect();
        assert_eq!(
            severities,
            vec![AlertSeverity::Critical, AlertSeverity::Warning, AlertSeverity::Info]
        );
    }

    #[test]
    fn test_minor_maps_to_info() {
        let rules = build_default_interactions();
        let alerts = check_interactions(&rules, "ondansetron", &classes(&["ssri"]));
        assert_eq!(alerts[0].severity, AlertSeverity::Info);
    }

    #[test]
    fn test_no_classes_no_alerts() {
        let rules = build_default_interactions();
        assert!(check_interactions(&rules, "fentanyl", &[]).is_empty());
        assert!(check_interactions(&rules, "albuterol", &classes(&["maoi"])).is_empty());
    }

    #[test]
    fn test_validate_rejects_rule_without_catalog_drug() {
        let base: HashSet<&str> = ["fentanyl"].into_iter().collect();
        let rules = vec![rule("warfarin", "nsaid", Minor, "x", "y")];
        assert_eq!(validate_rules(&rules, &base).len(), 1);
        assert!(validate_rules(&build_default_interactions()[..1], &base).is_empty());
    }

    #[test]
    fn test_validate_rejects_unnormalized_class() {
        let base: HashSet<&str> = ["morphine"].into_iter().collect();
        let rules = vec![
            rule("morphine", "Barbiturate ", Critical, "x", "y"),
            rule("MORPHINE", "maoi", Critical, "x", "y"),
        ];
        let errors = validate_rules(&rules, &base);
        assert!(errors[0].contains("'Barbiturate ' must be lowercase"), "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("'MORPHINE' must be lowercase")), "{:?}", errors);
    }
}

//! Core domain types for the dosing guardrail engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Medication profiles, units and concentrations
//! - Reference rules (interactions, contraindications, weight ranges)
//! - Evaluation requests and their results (dose computation, alerts, verdicts)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Patient Types
// ============================================================================

/// Patient population a dose is being computed for
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PatientType {
    Pediatric,
    Adult,
}

impl fmt::Display for PatientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatientType::Pediatric => write!(f, "pediatric"),
            PatientType::Adult => write!(f, "adult"),
        }
    }
}

impl FromStr for PatientType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pediatric" | "peds" | "child" => Ok(PatientType::Pediatric),
            "adult" => Ok(PatientType::Adult),
            other => Err(format!(
                "unknown patient type '{}' (expected 'pediatric' or 'adult')",
                other
            )),
        }
    }
}

/// Which patient populations a profile may be used for
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Applicability {
    Pediatric,
    Adult,
    Both,
}

impl Applicability {
    pub fn includes(self, patient_type: PatientType) -> bool {
        matches!(
            (self, patient_type),
            (Applicability::Both, _)
                | (Applicability::Pediatric, PatientType::Pediatric)
                | (Applicability::Adult, PatientType::Adult)
        )
    }
}

impl fmt::Display for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Applicability::Pediatric => write!(f, "pediatric"),
            Applicability::Adult => write!(f, "adult"),
            Applicability::Both => write!(f, "pediatric + adult"),
        }
    }
}

// ============================================================================
// Units, Concentrations and Routes
// ============================================================================

/// Mass unit a dose is expressed in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DoseUnit {
    G,
    Mg,
    Mcg,
}

impl DoseUnit {
    /// The next finer mass unit and the factor to convert into it.
    pub fn finer(self) -> Option<(DoseUnit, f64)> {
        match self {
            DoseUnit::G => Some((DoseUnit::Mg, 1000.0)),
            DoseUnit::Mg => Some((DoseUnit::Mcg, 1000.0)),
            DoseUnit::Mcg => None,
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoseUnit::G => write!(f, "g"),
            DoseUnit::Mg => write!(f, "mg"),
            DoseUnit::Mcg => write!(f, "mcg"),
        }
    }
}

/// Unit an administrable volume is measured in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VolumeUnit {
    #[serde(rename = "mL")]
    Ml,
    Tablet,
}

impl fmt::Display for VolumeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeUnit::Ml => write!(f, "mL"),
            VolumeUnit::Tablet => write!(f, "tablet"),
        }
    }
}

/// Preparation strength: `amount` of drug per `volume` of preparation
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Concentration {
    pub amount: f64,
    pub unit: DoseUnit,
    pub volume: f64,
    pub volume_unit: VolumeUnit,
}

impl Concentration {
    /// Drug amount contained in one unit of volume.
    pub fn per_unit_volume(&self) -> f64 {
        self.amount / self.volume
    }
}

impl fmt::Display for Concentration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.volume == 1.0 {
            write!(f, "{} {}/{}", self.amount, self.unit, self.volume_unit)
        } else {
            write!(
                f,
                "{} {}/{} {}",
                self.amount, self.unit, self.volume, self.volume_unit
            )
        }
    }
}

/// Route of administration
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Iv,
    Im,
    Io,
    IvIo,
    Intranasal,
    Sublingual,
    Oral,
    Nebulized,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Iv => write!(f, "IV"),
            Route::Im => write!(f, "IM"),
            Route::Io => write!(f, "IO"),
            Route::IvIo => write!(f, "IV/IO"),
            Route::Intranasal => write!(f, "IN"),
            Route::Sublingual => write!(f, "SL"),
            Route::Oral => write!(f, "PO"),
            Route::Nebulized => write!(f, "NEB"),
        }
    }
}

// ============================================================================
// Medication Profile
// ============================================================================

/// How a profile's dose is derived
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DosingMode {
    /// Dose scales with body weight
    WeightBased { dose_per_kg: f64 },
    /// Adult fixed dose; the profile's min/max complete the triple
    Fixed { typical: f64 },
}

/// A single medication entry in the curated catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MedicationProfile {
    pub id: String,
    /// Drug identifier shared by all variants (e.g. "fentanyl" for "fentanyl-adult")
    pub base_drug_id: String,
    pub name: String,
    pub patient_type: Applicability,
    pub dosing: DosingMode,
    pub dose_unit: DoseUnit,
    pub concentration: Concentration,
    /// Hard ceiling, in `dose_unit`
    pub max_dose: f64,
    /// Advisory minimum effective dose, in `dose_unit`
    pub min_dose: Option<f64>,
    pub route: Route,
    pub indications: Vec<String>,
    pub notes: Option<String>,
    pub jurisdiction_notes: Option<String>,
}

impl MedicationProfile {
    pub fn is_weight_based(&self) -> bool {
        matches!(self.dosing, DosingMode::WeightBased { .. })
    }

    pub fn has_indication(&self, indication: &str) -> bool {
        let wanted = indication.trim().to_lowercase();
        self.indications.iter().any(|i| i.to_lowercase() == wanted)
    }
}

// ============================================================================
// Reference Rules
// ============================================================================

/// Expected weight band for a named age bracket
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeightExpectationRange {
    pub min_kg: f64,
    pub max_kg: f64,
    pub typical_kg: f64,
}

/// Severity of a drug interaction rule
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InteractionSeverity {
    Minor,
    Moderate,
    Major,
    Critical,
}

impl InteractionSeverity {
    pub fn alert_severity(self) -> AlertSeverity {
        match self {
            InteractionSeverity::Critical => AlertSeverity::Critical,
            InteractionSeverity::Major => AlertSeverity::Warning,
            InteractionSeverity::Moderate | InteractionSeverity::Minor => AlertSeverity::Info,
        }
    }
}

impl fmt::Display for InteractionSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionSeverity::Minor => write!(f, "minor"),
            InteractionSeverity::Moderate => write!(f, "moderate"),
            InteractionSeverity::Major => write!(f, "major"),
            InteractionSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Unordered pair of drug or class identifiers that conflict
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrugInteractionRule {
    pub drug1: String,
    pub drug2: String,
    pub severity: InteractionSeverity,
    pub description: String,
    pub recommendation: String,
}

/// Severity of a contraindication rule
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContraindicationSeverity {
    Absolute,
    Relative,
}

impl ContraindicationSeverity {
    pub fn alert_severity(self) -> AlertSeverity {
        match self {
            ContraindicationSeverity::Absolute => AlertSeverity::Critical,
            ContraindicationSeverity::Relative => AlertSeverity::Warning,
        }
    }
}

/// A patient condition that forbids or cautions against one profile
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContraindicationRule {
    pub medication_id: String,
    pub condition: String,
    pub severity: ContraindicationSeverity,
    pub message: String,
    pub recommendation: String,
}

// ============================================================================
// Alerts and Verdicts
// ============================================================================

/// Alert severity; lower rank sorts first
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
    None,
}

impl AlertSeverity {
    pub fn rank(self) -> u8 {
        match self {
            AlertSeverity::Critical => 0,
            AlertSeverity::Warning => 1,
            AlertSeverity::Info => 2,
            AlertSeverity::None => 3,
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Critical => write!(f, "CRITICAL"),
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Info => write!(f, "INFO"),
            AlertSeverity::None => write!(f, "NONE"),
        }
    }
}

/// Which check produced an alert
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Weight,
    Dose,
    Interaction,
    Contraindication,
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertCategory::Weight => write!(f, "weight"),
            AlertCategory::Dose => write!(f, "dose"),
            AlertCategory::Interaction => write!(f, "interaction"),
            AlertCategory::Contraindication => write!(f, "contraindication"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GuardrailAlert {
    pub severity: AlertSeverity,
    pub category: AlertCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl GuardrailAlert {
    pub fn new(severity: AlertSeverity, category: AlertCategory, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            recommendation: None,
        }
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == AlertSeverity::Critical
    }
}

/// Output of the dose calculator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DoseComputationResult {
    pub raw_dose: f64,
    pub adjusted_dose: f64,
    pub dose_unit: DoseUnit,
    pub volume: f64,
    pub volume_unit: VolumeUnit,
    pub dose_display: String,
    pub volume_display: String,
    pub ceiling_applied: bool,
    pub floor_not_met: bool,
    pub warnings: Vec<String>,
}

/// The engine's answer for one evaluation
///
/// A blocked verdict (`can_administer == false`) is a correct answer, not a
/// failure. Proceeding anyway is an override owned by the caller.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GuardrailVerdict {
    pub medication_id: String,
    pub can_administer: bool,
    pub requires_override: bool,
    pub adjusted_dose: f64,
    pub dose: DoseComputationResult,
    pub alerts: Vec<GuardrailAlert>,
}

impl GuardrailVerdict {
    /// Alerts that caused the block (empty when administrable).
    pub fn blocking_alerts(&self) -> impl Iterator<Item = &GuardrailAlert> {
        self.alerts.iter().filter(|a| {
            a.is_critical()
                && matches!(
                    a.category,
                    AlertCategory::Weight
                        | AlertCategory::Interaction
                        | AlertCategory::Contraindication
                )
        })
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// Canonical form of a medication, class, condition or bracket id
pub fn normalize_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

/// Table ids must already be canonical, or no normalized input can match them
pub(crate) fn is_normalized_id(id: &str) -> bool {
    id == normalize_id(id)
}

// ============================================================================
// Evaluation Request
// ============================================================================

/// Inputs for a single guardrail evaluation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DoseRequest {
    pub medication_id: String,
    pub weight_kg: f64,
    pub patient_type: PatientType,
    pub age_bracket: Option<String>,
    #[serde(default)]
    pub concurrent_classes: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl DoseRequest {
    pub fn new(medication_id: impl Into<String>, weight_kg: f64, patient_type: PatientType) -> Self {
        Self {
            medication_id: medication_id.into(),
            weight_kg,
            patient_type,
            age_bracket: None,
            concurrent_classes: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn with_age_bracket(mut self, bracket: impl Into<String>) -> Self {
        self.age_bracket = Some(bracket.into());
        self
    }

    pub fn with_concurrent_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.concurrent_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_conditions<I, S>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions = conditions.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_type_parsing() {
        assert_eq!("pediatric".parse::<PatientType>(), Ok(PatientType::Pediatric));
        assert_eq!(" Adult ".parse::<PatientType>(), Ok(PatientType::Adult));
        assert!("geriatric".parse::<PatientType>().is_err());
    }

    #[test]
    fn test_normalized_ids() {
        assert_eq!(normalize_id("  MAOI "), "maoi");
        assert!(is_normalized_id("fentanyl-adult"));
        assert!(!is_normalized_id("Barbiturate"));
        assert!(!is_normalized_id("barbiturate "));
    }

    #[test]
    fn test_applicability() {
        assert!(Applicability::Both.includes(PatientType::Adult));
        assert!(Applicability::Both.includes(PatientType::Pediatric));
        assert!(Applicability::Pediatric.includes(PatientType::Pediatric));
        assert!(!Applicability::Pediatric.includes(PatientType::Adult));
        assert!(!Applicability::Adult.includes(PatientType::Pediatric));
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(InteractionSeverity::Critical.alert_severity(), AlertSeverity::Critical);
        assert_eq!(InteractionSeverity::Major.alert_severity(), AlertSeverity::Warning);
        assert_eq!(InteractionSeverity::Moderate.alert_severity(), AlertSeverity::Info);
        assert_eq!(InteractionSeverity::Minor.alert_severity(), AlertSeverity::Info);
        assert_eq!(ContraindicationSeverity::Absolute.alert_severity(), AlertSeverity::Critical);
        assert_eq!(ContraindicationSeverity::Relative.alert_severity(), AlertSeverity::Warning);
    }

    #[test]
    fn test_severity_rank_order() {
        assert!(AlertSeverity::Critical.rank() < AlertSeverity::Warning.rank());
        assert!(AlertSeverity::Warning.rank() < AlertSeverity::Info.rank());
        assert!(AlertSeverity::Info.rank() < AlertSeverity::None.rank());
    }

    #[test]
    fn test_concentration_display() {
        let c = Concentration {
            amount: 50.0,
            unit: DoseUnit::Mcg,
            volume: 1.0,
            volume_unit: VolumeUnit::Ml,
        };
        assert_eq!(c.to_string(), "50 mcg/mL");
        assert_eq!(c.per_unit_volume(), 50.0);
    }

    #[test]
    fn test_dosing_mode_serializes_with_tag() {
        let json = serde_json::to_string(&DosingMode::WeightBased { dose_per_kg: 0.1 }).unwrap();
        assert_eq!(json, r#"{"mode":"weight_based","dose_per_kg":0.1}"#);
    }
}

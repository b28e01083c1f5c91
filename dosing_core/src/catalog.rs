//! Curated medication catalog.
//!
//! Each drug may appear as several profiles sharing a base id: a pediatric
//! weight-based entry (`"fentanyl"`) and an adult fixed-dose entry
//! (`"fentanyl-adult"`). The `(id, base_drug_id)` pair is checked once in
//! [`Catalog::validate`] so interaction matching never splits strings at
//! evaluation time.

use crate::types::*;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Ordered, read-only set of medication profiles
#[derive(Clone, Debug)]
pub struct Catalog {
    medications: Vec<MedicationProfile>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from profiles in display order.
    ///
    /// Duplicate ids keep the first entry for lookup; [`Catalog::validate`]
    /// reports them.
    pub fn new(medications: Vec<MedicationProfile>) -> Self {
        let mut index = HashMap::with_capacity(medications.len());
        for (i, med) in medications.iter().enumerate() {
            index.entry(med.id.clone()).or_insert(i);
        }
        Self { medications, index }
    }

    pub fn lookup(&self, id: &str) -> Result<&MedicationProfile> {
        self.index
            .get(id)
            .map(|&i| &self.medications[i])
            .ok_or_else(|| Error::UnknownMedication(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Profiles usable for a patient type, in catalog order.
    pub fn list_by_patient_type(&self, patient_type: PatientType) -> Vec<&MedicationProfile> {
        self.medications
            .iter()
            .filter(|m| m.patient_type.includes(patient_type))
            .collect()
    }

    /// Profiles carrying an indication, in catalog order.
    pub fn list_by_indication(&self, indication: &str) -> Vec<&MedicationProfile> {
        self.medications
            .iter()
            .filter(|m| m.has_indication(indication))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MedicationProfile> {
        self.medications.iter()
    }

    pub fn len(&self) -> usize {
        self.medications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medications.is_empty()
    }

    /// Every distinct base drug id.
    pub fn base_drug_ids(&self) -> HashSet<&str> {
        self.medications
            .iter()
            .map(|m| m.base_drug_id.as_str())
            .collect()
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        if self.medications.is_empty() {
            errors.push("Catalog has no medications".to_string());
        }

        for med in &self.medications {
            let id = med.id.as_str();
            if id.is_empty() {
                errors.push("Medication has empty ID".to_string());
            } else if !is_normalized_id(id) {
                errors.push(format!(
                    "Medication ID '{}' must be lowercase without surrounding whitespace",
                    id
                ));
            }
            if !seen.insert(id) {
                errors.push(format!("Duplicate medication ID '{}'", id));
            }
            if med.name.trim().is_empty() {
                errors.push(format!("Medication '{}' has empty name", id));
            }

            if med.base_drug_id.is_empty() {
                errors.push(format!("Medication '{}' has empty base drug ID", id));
            } else if !is_normalized_id(&med.base_drug_id) {
                errors.push(format!(
                    "Medication '{}': base drug ID '{}' must be lowercase without surrounding whitespace",
                    id, med.base_drug_id
                ));
            } else if id != med.base_drug_id
                && !id.starts_with(&format!("{}-", med.base_drug_id))
            {
                errors.push(format!(
                    "Medication '{}' does not belong to base drug '{}'",
                    id, med.base_drug_id
                ));
            }

            if !(med.max_dose.is_finite() && med.max_dose > 0.0) {
                errors.push(format!(
                    "Medication '{}': max dose {} must be > 0",
                    id, med.max_dose
                ));
            }
            if let Some(min) = med.min_dose {
                if !(min.is_finite() && min > 0.0) {
                    errors.push(format!("Medication '{}': min dose {} must be > 0", id, min));
                }
                if min > med.max_dose {
                    errors.push(format!(
                        "Medication '{}': min dose {} > max dose {}",
                        id, min, med.max_dose
                    ));
                }
            }

            match med.dosing {
                DosingMode::WeightBased { dose_per_kg } => {
                    if !(dose_per_kg.is_finite() && dose_per_kg > 0.0) {
                        errors.push(format!(
                            "Medication '{}': dose per kg {} must be > 0",
                            id, dose_per_kg
                        ));
                    }
                }
                DosingMode::Fixed { typical } => {
                    if med.patient_type != Applicability::Adult {
                        errors.push(format!(
                            "Medication '{}': fixed dosing is only valid for adult profiles",
                            id
                        ));
                    }
                    if !(typical.is_finite() && typical > 0.0) || typical > med.max_dose {
                        errors.push(format!(
                            "Medication '{}': typical dose {} outside (0, {}]",
                            id, typical, med.max_dose
                        ));
                    }
                    if let Some(min) = med.min_dose {
                        if typical < min {
                            errors.push(format!(
                                "Medication '{}': typical dose {} < min dose {}",
                                id, typical, min
                            ));
                        }
                    }
                }
            }

            let conc = &med.concentration;
            if conc.unit != med.dose_unit {
                errors.push(format!(
                    "Medication '{}': concentration unit {} does not match dose unit {}",
                    id, conc.unit, med.dose_unit
                ));
            }
            if !(conc.amount.is_finite() && conc.amount > 0.0)
                || !(conc.volume.is_finite() && conc.volume > 0.0)
            {
                errors.push(format!(
                    "Medication '{}': concentration {} must be positive",
                    id, conc
                ));
            }

            if med.indications.is_empty() {
                errors.push(format!("Medication '{}' has no indications", id));
            }
        }

        errors
    }
}

fn per_ml(amount: f64, unit: DoseUnit) -> Concentration {
    Concentration {
        amount,
        unit,
        volume: 1.0,
        volume_unit: VolumeUnit::Ml,
    }
}

fn per_volume(amount: f64, unit: DoseUnit, volume_ml: f64) -> Concentration {
    Concentration {
        amount,
        unit,
        volume: volume_ml,
        volume_unit: VolumeUnit::Ml,
    }
}

fn per_tablet(amount: f64, unit: DoseUnit) -> Concentration {
    Concentration {
        amount,
        unit,
        volume: 1.0,
        volume_unit: VolumeUnit::Tablet,
    }
}

fn tags(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Builds the built-in medication catalog
///
/// Prefer [`crate::formulary::Formulary::builtin`], which validates the
/// catalog together with the rule tables and caches the result.
pub fn build_default_catalog() -> Catalog {
    let medications = vec![
        // ====================================================================
        // Anaphylaxis / Cardiac Arrest
        // ====================================================================
        MedicationProfile {
            id: "epinephrine-anaphylaxis".into(),
            base_drug_id: "epinephrine".into(),
            name: "Epinephrine 1 mg/mL (Anaphylaxis)".into(),
            patient_type: Applicability::Both,
            dosing: DosingMode::WeightBased { dose_per_kg: 0.01 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(1.0, DoseUnit::Mg),
            max_dose: 0.5,
            min_dose: None,
            route: Route::Im,
            indications: tags(&["anaphylaxis", "severe_asthma"]),
            notes: Some("Anterolateral thigh. May repeat every 5-15 minutes.".into()),
            jurisdiction_notes: Some("Some LEMSAs cap pediatric IM dose at 0.3 mg.".into()),
        },
        MedicationProfile {
            id: "epinephrine-arrest".into(),
            base_drug_id: "epinephrine".into(),
            name: "Epinephrine 0.1 mg/mL (Cardiac Arrest)".into(),
            patient_type: Applicability::Both,
            dosing: DosingMode::WeightBased { dose_per_kg: 0.01 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(0.1, DoseUnit::Mg),
            max_dose: 1.0,
            min_dose: None,
            route: Route::IvIo,
            indications: tags(&["cardiac_arrest"]),
            notes: Some("Every 3-5 minutes during CPR.".into()),
            jurisdiction_notes: None,
        },
        // ====================================================================
        // Dysrhythmias
        // ====================================================================
        MedicationProfile {
            id: "adenosine".into(),
            base_drug_id: "adenosine".into(),
            name: "Adenosine (Pediatric)".into(),
            patient_type: Applicability::Pediatric,
            dosing: DosingMode::WeightBased { dose_per_kg: 0.1 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(3.0, DoseUnit::Mg),
            max_dose: 6.0,
            min_dose: None,
            route: Route::IvIo,
            indications: tags(&["svt"]),
            notes: Some("Rapid push followed by saline flush.".into()),
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "adenosine-adult".into(),
            base_drug_id: "adenosine".into(),
            name: "Adenosine (Adult)".into(),
            patient_type: Applicability::Adult,
            dosing: DosingMode::Fixed { typical: 6.0 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(3.0, DoseUnit::Mg),
            max_dose: 12.0,
            min_dose: Some(6.0),
            route: Route::Iv,
            indications: tags(&["svt"]),
            notes: Some("Second dose 12 mg if no conversion.".into()),
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "amiodarone".into(),
            base_drug_id: "amiodarone".into(),
            name: "Amiodarone (Pediatric)".into(),
            patient_type: Applicability::Pediatric,
            dosing: DosingMode::WeightBased { dose_per_kg: 5.0 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(50.0, DoseUnit::Mg),
            max_dose: 300.0,
            min_dose: None,
            route: Route::IvIo,
            indications: tags(&["cardiac_arrest", "ventricular_tachycardia"]),
            notes: None,
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "amiodarone-adult".into(),
            base_drug_id: "amiodarone".into(),
            name: "Amiodarone (Adult)".into(),
            patient_type: Applicability::Adult,
            dosing: DosingMode::Fixed { typical: 300.0 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(50.0, DoseUnit::Mg),
            max_dose: 300.0,
            min_dose: Some(150.0),
            route: Route::IvIo,
            indications: tags(&["cardiac_arrest", "ventricular_tachycardia"]),
            notes: Some("150 mg for repeat dose or perfusing VT.".into()),
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "atropine".into(),
            base_drug_id: "atropine".into(),
            name: "Atropine (Pediatric)".into(),
            patient_type: Applicability::Pediatric,
            dosing: DosingMode::WeightBased { dose_per_kg: 0.02 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(0.1, DoseUnit::Mg),
            max_dose: 0.5,
            min_dose: Some(0.1),
            route: Route::IvIo,
            indications: tags(&["symptomatic_bradycardia", "organophosphate_poisoning"]),
            notes: None,
            jurisdiction_notes: Some(
                "Minimum dose guidance varies; some protocols omit the 0.1 mg floor.".into(),
            ),
        },
        MedicationProfile {
            id: "atropine-adult".into(),
            base_drug_id: "atropine".into(),
            name: "Atropine (Adult)".into(),
            patient_type: Applicability::Adult,
            dosing: DosingMode::Fixed { typical: 1.0 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(0.1, DoseUnit::Mg),
            max_dose: 3.0,
            min_dose: Some(0.5),
            route: Route::IvIo,
            indications: tags(&["symptomatic_bradycardia", "organophosphate_poisoning"]),
            notes: Some("Repeat every 3-5 minutes to 3 mg total.".into()),
            jurisdiction_notes: None,
        },
        // ====================================================================
        // Analgesia / Sedation
        // ====================================================================
        MedicationProfile {
            id: "fentanyl".into(),
            base_drug_id: "fentanyl".into(),
            name: "Fentanyl (Pediatric)".into(),
            patient_type: Applicability::Pediatric,
            dosing: DosingMode::WeightBased { dose_per_kg: 1.0 },
            dose_unit: DoseUnit::Mcg,
            concentration: per_ml(50.0, DoseUnit::Mcg),
            max_dose: 50.0,
            min_dose: None,
            route: Route::Intranasal,
            indications: tags(&["pain"]),
            notes: Some("IN via atomizer, split between nares.".into()),
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "fentanyl-adult".into(),
            base_drug_id: "fentanyl".into(),
            name: "Fentanyl (Adult)".into(),
            patient_type: Applicability::Adult,
            dosing: DosingMode::Fixed { typical: 50.0 },
            dose_unit: DoseUnit::Mcg,
            concentration: per_ml(50.0, DoseUnit::Mcg),
            max_dose: 100.0,
            min_dose: Some(25.0),
            route: Route::Iv,
            indications: tags(&["pain"]),
            notes: Some("Titrate to effect; monitor ventilation.".into()),
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "morphine".into(),
            base_drug_id: "morphine".into(),
            name: "Morphine (Pediatric)".into(),
            patient_type: Applicability::Pediatric,
            dosing: DosingMode::WeightBased { dose_per_kg: 0.1 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(4.0, DoseUnit::Mg),
            max_dose: 4.0,
            min_dose: None,
            route: Route::IvIo,
            indications: tags(&["pain"]),
            notes: None,
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "midazolam".into(),
            base_drug_id: "midazolam".into(),
            name: "Midazolam (Pediatric)".into(),
            patient_type: Applicability::Pediatric,
            dosing: DosingMode::WeightBased { dose_per_kg: 0.1 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(5.0, DoseUnit::Mg),
            max_dose: 5.0,
            min_dose: None,
            route: Route::Intranasal,
            indications: tags(&["seizure", "sedation"]),
            notes: None,
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "midazolam-adult".into(),
            base_drug_id: "midazolam".into(),
            name: "Midazolam (Adult)".into(),
            patient_type: Applicability::Adult,
            dosing: DosingMode::Fixed { typical: 5.0 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(5.0, DoseUnit::Mg),
            max_dose: 10.0,
            min_dose: Some(2.5),
            route: Route::Im,
            indications: tags(&["seizure", "sedation"]),
            notes: Some("10 mg IM for status epilepticus in patients over 40 kg.".into()),
            jurisdiction_notes: None,
        },
        // ====================================================================
        // Toxicology / Metabolic
        // ====================================================================
        MedicationProfile {
            id: "naloxone".into(),
            base_drug_id: "naloxone".into(),
            name: "Naloxone (Pediatric)".into(),
            patient_type: Applicability::Pediatric,
            dosing: DosingMode::WeightBased { dose_per_kg: 0.1 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(1.0, DoseUnit::Mg),
            max_dose: 2.0,
            min_dose: None,
            route: Route::Intranasal,
            indications: tags(&["opioid_overdose"]),
            notes: None,
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "naloxone-adult".into(),
            base_drug_id: "naloxone".into(),
            name: "Naloxone (Adult)".into(),
            patient_type: Applicability::Adult,
            dosing: DosingMode::Fixed { typical: 0.5 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(1.0, DoseUnit::Mg),
            max_dose: 2.0,
            min_dose: Some(0.4),
            route: Route::Iv,
            indications: tags(&["opioid_overdose"]),
            notes: Some("Titrate to respiratory effort, not consciousness.".into()),
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "dextrose-10".into(),
            base_drug_id: "dextrose".into(),
            name: "Dextrose 10% (D10)".into(),
            patient_type: Applicability::Both,
            dosing: DosingMode::WeightBased { dose_per_kg: 0.5 },
            dose_unit: DoseUnit::G,
            concentration: per_volume(10.0, DoseUnit::G, 100.0),
            max_dose: 25.0,
            min_dose: None,
            route: Route::IvIo,
            indications: tags(&["hypoglycemia"]),
            notes: Some("5 mL/kg of D10.".into()),
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "diphenhydramine".into(),
            base_drug_id: "diphenhydramine".into(),
            name: "Diphenhydramine".into(),
            patient_type: Applicability::Both,
            dosing: DosingMode::WeightBased { dose_per_kg: 1.0 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(50.0, DoseUnit::Mg),
            max_dose: 50.0,
            min_dose: None,
            route: Route::Im,
            indications: tags(&["anaphylaxis", "allergic_reaction", "dystonic_reaction"]),
            notes: None,
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "ondansetron".into(),
            base_drug_id: "ondansetron".into(),
            name: "Ondansetron (Pediatric)".into(),
            patient_type: Applicability::Pediatric,
            dosing: DosingMode::WeightBased { dose_per_kg: 0.15 },
            dose_unit: DoseUnit::Mg,
            concentration: per_ml(2.0, DoseUnit::Mg),
            max_dose: 4.0,
            min_dose: None,
            route: Route::IvIo,
            indications: tags(&["nausea_vomiting"]),
            notes: None,
            jurisdiction_notes: None,
        },
        // ====================================================================
        // Cardiac / Respiratory (adult only)
        // ====================================================================
        MedicationProfile {
            id: "nitroglycerin".into(),
            base_drug_id: "nitroglycerin".into(),
            name: "Nitroglycerin 0.4 mg SL".into(),
            patient_type: Applicability::Adult,
            dosing: DosingMode::Fixed { typical: 0.4 },
            dose_unit: DoseUnit::Mg,
            concentration: per_tablet(0.4, DoseUnit::Mg),
            max_dose: 0.4,
            min_dose: Some(0.4),
            route: Route::Sublingual,
            indications: tags(&["chest_pain", "pulmonary_edema"]),
            notes: Some("Repeat every 5 minutes if SBP remains above 100.".into()),
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "aspirin".into(),
            base_drug_id: "aspirin".into(),
            name: "Aspirin 81 mg (chewable)".into(),
            patient_type: Applicability::Adult,
            dosing: DosingMode::Fixed { typical: 324.0 },
            dose_unit: DoseUnit::Mg,
            concentration: per_tablet(81.0, DoseUnit::Mg),
            max_dose: 324.0,
            min_dose: Some(162.0),
            route: Route::Oral,
            indications: tags(&["chest_pain"]),
            notes: Some("Chewed, not swallowed whole.".into()),
            jurisdiction_notes: None,
        },
        MedicationProfile {
            id: "albuterol".into(),
            base_drug_id: "albuterol".into(),
            name: "Albuterol 2.5 mg/3 mL".into(),
            patient_type: Applicability::Adult,
            dosing: DosingMode::Fixed { typical: 2.5 },
            dose_unit: DoseUnit::Mg,
            concentration: per_volume(2.5, DoseUnit::Mg, 3.0),
            max_dose: 5.0,
            min_dose: Some(2.5),
            route: Route::Nebulized,
            indications: tags(&["severe_asthma", "bronchospasm"]),
            notes: None,
            jurisdiction_notes: None,
        },
    ];

    Catalog::new(medications)
}

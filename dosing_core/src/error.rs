//! Error types for the dosing_core library.

use crate::types::PatientType;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dosing_core operations
///
/// A blocked verdict is not represented here: the engine returns it as a
/// successful evaluation with `can_administer == false`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reference tables failed validation; no evaluation may be served
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Medication id not present in the catalog
    #[error("Unknown medication: '{0}'")]
    UnknownMedication(String),

    /// Weight is zero, negative, or not a finite number
    #[error("Invalid weight: {0} kg (weight must be a positive number)")]
    InvalidWeight(f64),

    /// Age bracket not present in the weight expectation table
    #[error("Unknown age bracket: '{0}'")]
    UnknownAgeBracket(String),

    /// Profile is not applicable to the requested patient type
    #[error("Medication '{medication_id}' is not indicated for {patient_type} patients")]
    PatientTypeMismatch {
        medication_id: String,
        patient_type: PatientType,
    },

    /// Override audit log error
    #[error("Audit error: {0}")]
    Audit(String),
}

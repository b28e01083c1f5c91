#![forbid(unsafe_code)]

//! Medication dosing and safety-guardrail engine.
//!
//! This crate provides:
//! - Domain types (medication profiles, rules, alerts, verdicts)
//! - The curated catalog and reference rule tables, frozen in a [`Formulary`]
//! - Dose calculation with an unconditional ceiling clamp
//! - Weight, interaction and contraindication checks
//! - The guardrail orchestrator producing a [`GuardrailVerdict`]
//! - Integration-boundary support: config, logging, override audit log
//!
//! The engine itself is pure: it reads no environment, performs no I/O and
//! keeps no state between calls.

pub mod types;
pub mod error;
pub mod catalog;
pub mod weight;
pub mod interactions;
pub mod contraindications;
pub mod dose;
pub mod formulary;
pub mod engine;
pub mod config;
pub mod logging;
pub mod audit;
pub mod csv_rollup;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, Catalog};
pub use config::Config;
pub use formulary::Formulary;
pub use dose::compute_dose;
pub use engine::{evaluate, GuardrailEngine};
pub use audit::{JsonlSink, OverrideEvent, OverrideSink};

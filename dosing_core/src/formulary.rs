//! The frozen set of reference tables every evaluation reads.
//!
//! A `Formulary` can only be obtained through [`Formulary::new`], which
//! validates all four tables together, and exposes them only by shared
//! reference. A formulary with any bad entry is never constructed.

use crate::catalog::{build_default_catalog, Catalog};
use crate::contraindications::{self, build_default_contraindications};
use crate::interactions::{self, build_default_interactions};
use crate::types::{ContraindicationRule, DrugInteractionRule};
use crate::weight::{build_default_weight_ranges, WeightRangeTable};
use crate::{Error, Result};
use once_cell::sync::Lazy;

/// Built-in formulary, validated on first use and shared for the process lifetime
static DEFAULT_FORMULARY: Lazy<std::result::Result<Formulary, Vec<String>>> =
    Lazy::new(|| {
        Formulary::from_parts(
            build_default_catalog(),
            build_default_interactions(),
            build_default_contraindications(),
            build_default_weight_ranges(),
        )
    });

#[derive(Clone, Debug)]
pub struct Formulary {
    catalog: Catalog,
    interactions: Vec<DrugInteractionRule>,
    contraindications: Vec<ContraindicationRule>,
    weight_ranges: WeightRangeTable,
}

impl Formulary {
    /// Validate and freeze a set of reference tables
    ///
    /// Fails with every validation problem found, not just the first.
    pub fn new(
        catalog: Catalog,
        interactions: Vec<DrugInteractionRule>,
        contraindications: Vec<ContraindicationRule>,
        weight_ranges: WeightRangeTable,
    ) -> Result<Self> {
        Self::from_parts(catalog, interactions, contraindications, weight_ranges)
            .map_err(|errors| Error::CatalogValidation(errors.join("; ")))
    }

    /// The built-in formulary
    ///
    /// Returns the same validation error on every call if the built-in
    /// tables are malformed, so no evaluation can ever be served from them.
    pub fn builtin() -> Result<&'static Formulary> {
        match &*DEFAULT_FORMULARY {
            Ok(formulary) => Ok(formulary),
            Err(errors) => Err(Error::CatalogValidation(errors.join("; "))),
        }
    }

    fn from_parts(
        catalog: Catalog,
        interactions: Vec<DrugInteractionRule>,
        contraindications: Vec<ContraindicationRule>,
        weight_ranges: WeightRangeTable,
    ) -> std::result::Result<Self, Vec<String>> {
        let mut errors = catalog.validate();
        errors.extend(interactions::validate_rules(
            &interactions,
            &catalog.base_drug_ids(),
        ));
        errors.extend(contraindications::validate_rules(&contraindications, &catalog));
        errors.extend(weight_ranges.validate());

        if !errors.is_empty() {
            tracing::error!(count = errors.len(), "formulary failed validation");
            return Err(errors);
        }

        tracing::info!(
            medications = catalog.len(),
            interactions = interactions.len(),
            contraindications = contraindications.len(),
            age_brackets = weight_ranges.len(),
            "loaded formulary"
        );

        Ok(Self {
            catalog,
            interactions,
            contraindications,
            weight_ranges,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn interactions(&self) -> &[DrugInteractionRule] {
        &self.interactions
    }

    pub fn contraindications(&self) -> &[ContraindicationRule] {
        &self.contraindications
    }

    pub fn weight_ranges(&self) -> &WeightRangeTable {
        &self.weight_ranges
    }
}

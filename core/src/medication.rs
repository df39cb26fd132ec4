//! Medication catalog types.
//!
//! A medication is an identity record, not a stock unit: its stock is
//! always derived as the sum of its batches' current quantities.
//! Medications are soft-deleted (active flag) to preserve the referential
//! history of their batches and movements.

use crate::error::{Error, Result};
use crate::{MedicationId, Quantity};
use serde::{Deserialize, Serialize};

/// A persisted catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: MedicationId,
    /// External code, unique across the catalog
    pub code: String,
    pub description: String,
    pub active_ingredient: Option<String>,
    pub dosage_form: Option<String>,
    pub concentration: Option<String>,
    pub unit: Option<String>,
    pub minimum_stock: Quantity,
    pub active: bool,
}

/// A medication paired with its derived total stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationWithStock {
    #[serde(flatten)]
    pub medication: Medication,
    pub total_stock: Quantity,
}

impl MedicationWithStock {
    /// Whether the derived stock sits at or below the minimum threshold.
    pub fn is_low(&self) -> bool {
        self.total_stock <= self.medication.minimum_stock
    }
}

/// Fields for creating or editing a catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMedication {
    pub code: String,
    pub description: String,
    pub active_ingredient: Option<String>,
    pub dosage_form: Option<String>,
    pub concentration: Option<String>,
    pub unit: Option<String>,
    pub minimum_stock: Quantity,
}

impl NewMedication {
    /// Minimal entry, as created by the import path.
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Check the fields before they reach the store.
    pub fn validate(&self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(Error::validation("medication code is required"));
        }
        if self.description.trim().is_empty() {
            return Err(Error::validation("medication description is required"));
        }
        if self.minimum_stock < 0 {
            return Err(Error::validation(
                "minimum stock must be a non-negative integer",
            ));
        }
        Ok(())
    }
}

//! Batch (lote) types.
//!
//! A batch is a physical incoming shipment of one medication, with its own
//! lot number, expiry date, and current quantity. The lot number is not
//! globally unique; duplicate detection uses the [`BatchKey`] natural key.

use crate::error::{Error, Result};
use crate::{BatchId, MedicationId, Quantity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel lot number for rows that arrive without one.
pub const NO_LOT: &str = "NO-LOT";

/// A persisted batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub medication_id: MedicationId,
    pub lot_number: String,
    pub expiry_date: NaiveDate,
    /// Current quantity; never negative
    pub quantity: Quantity,
    pub unit_price: Option<f64>,
    pub total_value: Option<f64>,
    pub received_on: NaiveDate,
}

impl Batch {
    /// The natural key used for duplicate detection.
    pub fn key(&self) -> BatchKey {
        BatchKey {
            medication_id: self.medication_id,
            lot_number: self.lot_number.clone(),
            expiry_date: self.expiry_date,
        }
    }
}

/// Natural key for duplicate detection: (medication, lot number, expiry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchKey {
    pub medication_id: MedicationId,
    pub lot_number: String,
    pub expiry_date: NaiveDate,
}

/// Total purchase value of a batch, when a unit price is known.
pub fn total_value(quantity: Quantity, unit_price: Option<f64>) -> Option<f64> {
    unit_price.map(|price| quantity as f64 * price)
}

/// A batch-entry request: new stock arriving at the dispensary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRequest {
    pub medication_id: MedicationId,
    pub lot_number: String,
    pub quantity: Quantity,
    pub expiry_date: NaiveDate,
    pub unit_price: Option<f64>,
    pub supplier: Option<String>,
}

impl EntryRequest {
    pub fn new(
        medication_id: MedicationId,
        lot_number: impl Into<String>,
        quantity: Quantity,
        expiry_date: NaiveDate,
    ) -> Self {
        Self {
            medication_id,
            lot_number: lot_number.into(),
            quantity,
            expiry_date,
            unit_price: None,
            supplier: None,
        }
    }

    pub fn with_unit_price(mut self, unit_price: f64) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    /// Check the request before it reaches the store.
    pub fn validate(&self) -> Result<()> {
        if self.quantity <= 0 {
            return Err(Error::validation("entry quantity must be positive"));
        }
        if self.lot_number.trim().is_empty() {
            return Err(Error::validation("lot number is required"));
        }
        if let Some(price) = self.unit_price {
            if price < 0.0 {
                return Err(Error::validation("unit price cannot be negative"));
            }
        }
        Ok(())
    }

    /// Total value of the incoming stock, when priced.
    pub fn total_value(&self) -> Option<f64> {
        total_value(self.quantity, self.unit_price)
    }
}

/// An administrative field correction applied to an existing batch.
///
/// Only the fields set to `Some` are written. This path deliberately does
/// not emit a movement: it is a correction, not a stock event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdate {
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: Option<Quantity>,
    pub unit_price: Option<f64>,
    pub total_value: Option<f64>,
}

impl BatchUpdate {
    pub fn is_empty(&self) -> bool {
        self.lot_number.is_none()
            && self.expiry_date.is_none()
            && self.quantity.is_none()
            && self.unit_price.is_none()
            && self.total_value.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::validation("no fields to update"));
        }
        if let Some(quantity) = self.quantity {
            if quantity < 0 {
                return Err(Error::validation("quantity cannot be negative"));
            }
        }
        if let Some(lot) = &self.lot_number {
            if lot.trim().is_empty() {
                return Err(Error::validation("lot number cannot be empty"));
            }
        }
        Ok(())
    }

    /// Apply the correction to a batch in memory.
    pub fn apply_to(&self, batch: &mut Batch) {
        if let Some(lot) = &self.lot_number {
            batch.lot_number = lot.clone();
        }
        if let Some(expiry) = self.expiry_date {
            batch.expiry_date = expiry;
        }
        if let Some(quantity) = self.quantity {
            batch.quantity = quantity;
        }
        if let Some(price) = self.unit_price {
            batch.unit_price = Some(price);
        }
        if let Some(value) = self.total_value {
            batch.total_value = Some(value);
        }
    }
}

//! Receipt types.
//!
//! A receipt records a completed dispensing transaction. Its line items are
//! a denormalized copy (not foreign keys) so the receipt stays readable
//! even if the referenced batches are later modified; voiding tolerates
//! reading old receipts whose lines lack a batch id, but refuses to credit
//! them.

use crate::error::{Error, Result};
use crate::rounding::round_to_quarter;
use crate::{BatchId, Quantity, ReceiptId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A dispensed line as stored inside the receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    #[serde(default)]
    pub batch_id: Option<BatchId>,
    pub description: String,
    #[serde(default)]
    pub lot_number: Option<String>,
    #[serde(default)]
    pub quantity: Option<Quantity>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    pub line_total: f64,
}

/// A persisted receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    /// Generated code, unique across receipts
    pub code: String,
    pub issued_on: NaiveDate,
    pub requester_id: Option<String>,
    pub exact_total: f64,
    pub rounded_total: f64,
    pub lines: Vec<ReceiptLine>,
    pub voided: bool,
    pub created_at: NaiveDateTime,
}

/// One line of a dispensing request, before the receipt exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispenseLine {
    pub batch_id: BatchId,
    pub description: String,
    pub lot_number: Option<String>,
    pub quantity: Quantity,
    pub unit_price: f64,
}

impl DispenseLine {
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }

    fn to_receipt_line(&self) -> ReceiptLine {
        ReceiptLine {
            batch_id: Some(self.batch_id),
            description: self.description.clone(),
            lot_number: self.lot_number.clone(),
            quantity: Some(self.quantity),
            unit_price: Some(self.unit_price),
            line_total: self.line_total(),
        }
    }
}

/// A dispensing request: the exits and the receipt they produce are one
/// atomic unit in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispenseRequest {
    pub requester_id: Option<String>,
    pub actor: Option<String>,
    pub lines: Vec<DispenseLine>,
}

impl DispenseRequest {
    pub fn new(lines: Vec<DispenseLine>) -> Self {
        Self {
            requester_id: None,
            actor: None,
            lines,
        }
    }

    pub fn with_requester(mut self, requester_id: impl Into<String>) -> Self {
        self.requester_id = Some(requester_id.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Check the request before it reaches the store.
    pub fn validate(&self) -> Result<()> {
        if self.lines.is_empty() {
            return Err(Error::validation("a receipt needs at least one line"));
        }
        for line in &self.lines {
            if line.quantity <= 0 {
                return Err(Error::validation(format!(
                    "dispense quantity for '{}' must be positive",
                    line.description
                )));
            }
            if line.unit_price < 0.0 {
                return Err(Error::validation(format!(
                    "unit price for '{}' cannot be negative",
                    line.description
                )));
            }
        }
        Ok(())
    }

    /// Sum of the line totals, before rounding.
    pub fn exact_total(&self) -> f64 {
        self.lines.iter().map(DispenseLine::line_total).sum()
    }

    /// Exact total rounded up to the next quarter unit.
    pub fn rounded_total(&self) -> f64 {
        round_to_quarter(self.exact_total())
    }

    /// The denormalized lines stored on the receipt.
    pub fn receipt_lines(&self) -> Vec<ReceiptLine> {
        self.lines.iter().map(DispenseLine::to_receipt_line).collect()
    }
}

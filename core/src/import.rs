//! Bulk import classification and reporting.
//!
//! The import pipeline has two halves. This module holds the pure half:
//! classifying normalized rows against what the catalog already contains,
//! the duplicate-handling strategies, and the summary and progress types
//! both preview and commit report with. The store half applies the rows
//! row by row inside its own transactions.

use crate::normalize::NormalizedRow;
use serde::{Deserialize, Serialize};

/// What to do when an imported row matches an existing batch key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStrategy {
    /// Leave the existing batch untouched and count the row as skipped.
    #[default]
    Skip,
    /// Insert a second batch with the same key.
    Allow,
    /// Set the existing batch to the row's values, recording the quantity
    /// delta as one movement.
    Overwrite,
}

/// Options for an import run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportOptions {
    pub strategy: DuplicateStrategy,
    /// When false, batches are written without ledger movements.
    pub record_movements: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            strategy: DuplicateStrategy::default(),
            record_movements: true,
        }
    }
}

/// How one row relates to the existing catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    /// Normalization found errors; the row will not be applied.
    Invalid,
    /// The medication code is not in the catalog yet.
    New,
    /// Known medication, new batch key.
    Existing,
    /// Known medication and the batch key is already taken.
    Duplicate,
}

/// Classify one normalized row against catalog state.
pub fn classify_row(row: &NormalizedRow, medication_known: bool, batch_key_taken: bool) -> RowStatus {
    if !row.is_valid() {
        RowStatus::Invalid
    } else if !medication_known {
        RowStatus::New
    } else if batch_key_taken {
        RowStatus::Duplicate
    } else {
        RowStatus::Existing
    }
}

/// Counters shown before anything is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub duplicates: usize,
    pub new_medications: usize,
    pub existing_medications: usize,
}

impl PreviewSummary {
    pub fn record(&mut self, status: RowStatus) {
        self.total_rows += 1;
        match status {
            RowStatus::Invalid => self.invalid_rows += 1,
            RowStatus::New => {
                self.valid_rows += 1;
                self.new_medications += 1;
            }
            RowStatus::Existing => {
                self.valid_rows += 1;
                self.existing_medications += 1;
            }
            RowStatus::Duplicate => {
                self.valid_rows += 1;
                self.existing_medications += 1;
                self.duplicates += 1;
            }
        }
    }
}

/// One classified row in the preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowReport {
    #[serde(flatten)]
    pub row: NormalizedRow,
    pub status: RowStatus,
}

/// Full preview of an import file, nothing written yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportPreview {
    pub summary: PreviewSummary,
    pub rows: Vec<RowReport>,
}

/// A row that failed during commit, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row_index: usize,
    pub message: String,
}

/// Counters reported after a commit run. Rows that failed are listed in
/// `errors` and contribute to no other counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub inserted_batches: usize,
    pub updated_batches: usize,
    pub skipped_duplicates: usize,
    pub new_medications: usize,
    pub existing_medications: usize,
    pub errors: Vec<RowError>,
}

/// Progress snapshot emitted after every processed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub percent: u8,
}

impl Progress {
    pub fn new(processed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100
        } else {
            ((processed as f64 / total as f64) * 100.0).round() as u8
        };
        Self {
            processed,
            total,
            percent,
        }
    }
}

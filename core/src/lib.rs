//! # Botica Core
//!
//! Domain model and pure inventory logic for a small dispensary.
//!
//! This crate holds everything that can be reasoned about without a
//! database: the ledger types, validation, import-row normalization and
//! classification, and the quarter-unit rounding used on receipts.
//!
//! ## Design Principles
//!
//! - **No IO**: the crate has no knowledge of files, databases, or platform
//! - **Validated at the boundary**: requests are checked before any store
//!   code runs, so validation failures never reach a transaction
//! - **Replayable**: a batch's current quantity must always equal the
//!   replay of its movement ledger from zero
//!
//! ## Core Concepts
//!
//! ### Medications and Batches
//!
//! A [`Medication`] is a catalog entry, never a stock unit. Stock lives in
//! [`Batch`]es (lotes), each with its own lot number, expiry date, and
//! current quantity. Batches are identified for duplicate detection by the
//! natural key ([`BatchKey`]): medication + lot number + expiry date.
//!
//! ### Movements
//!
//! Every quantity change is recorded as an append-only [`Movement`], typed
//! [`MovementKind::Entry`] or [`MovementKind::Exit`] with a positive
//! magnitude. Movements are never edited or deleted; reversals append new
//! entries. [`replay_quantity`] reproduces a batch's quantity from its
//! ledger.
//!
//! ### Imports
//!
//! Spreadsheet rows arrive as [`RawRow`]s (cells already extracted, still
//! untyped), are normalized into [`NormalizedRow`]s, and classified against
//! the existing catalog with a [`DuplicateStrategy`] deciding what happens
//! when a batch key already exists.
//!
//! ### Receipts
//!
//! A [`Receipt`] records a completed dispensing transaction with a
//! denormalized copy of its line items, an exact total, and a total rounded
//! up to the next quarter unit ([`round_to_quarter`]).

pub mod batch;
pub mod error;
pub mod import;
pub mod medication;
pub mod movement;
pub mod normalize;
pub mod receipt;
pub mod rounding;

// Re-export main types at crate root
pub use batch::{Batch, BatchKey, BatchUpdate, EntryRequest, NO_LOT};
pub use error::Error;
pub use import::{
    classify_row, DuplicateStrategy, ImportOptions, ImportPreview, ImportSummary, PreviewSummary,
    Progress, RowError, RowReport, RowStatus,
};
pub use medication::{Medication, MedicationWithStock, NewMedication};
pub use movement::{replay_quantity, ExitRequest, Movement, MovementKind, NewMovement};
pub use normalize::{normalize_row, parse_flexible_date, NormalizedRow, RawRow};
pub use receipt::{DispenseLine, DispenseRequest, Receipt, ReceiptLine};
pub use rounding::round_to_quarter;

/// Type aliases for clarity
pub type MedicationId = i64;
pub type BatchId = i64;
pub type MovementId = i64;
pub type ReceiptId = i64;
pub type Quantity = i64;

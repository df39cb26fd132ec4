//! Error types for the Botica domain.

use crate::{BatchId, MedicationId, Quantity};
use thiserror::Error;

/// All domain errors surfaced by inventory operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    // Validation errors
    #[error("validation failed: {0}")]
    Validation(String),

    // Lookup errors
    #[error("medication not found: {0}")]
    MedicationNotFound(MedicationId),

    #[error("batch not found: {0}")]
    BatchNotFound(BatchId),

    #[error("receipt not found: {0}")]
    ReceiptNotFound(String),

    // State errors
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Quantity,
        available: Quantity,
    },

    #[error("receipt already voided: {0}")]
    AlreadyVoided(String),
}

impl Error {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::validation("quantity must be positive");
        assert_eq!(
            err.to_string(),
            "validation failed: quantity must be positive"
        );

        let err = Error::InsufficientStock {
            requested: 10,
            available: 4,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock: requested 10, available 4"
        );

        let err = Error::AlreadyVoided("R123".into());
        assert_eq!(err.to_string(), "receipt already voided: R123");
    }
}

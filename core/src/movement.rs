//! Movement types - the append-only stock ledger.
//!
//! A movement records a single quantity change against a batch. The ledger
//! is append-only: corrections and receipt voids add new movements rather
//! than editing old ones, so replaying a batch's movements from zero must
//! always reproduce its current quantity.

use crate::error::{Error, Result};
use crate::{BatchId, MovementId, Quantity};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Inbound stock (batch entry, import, receipt void)
    Entry,
    /// Outbound stock (dispensing, import overwrite shrink)
    Exit,
}

impl MovementKind {
    /// Stable text form used in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Exit => "exit",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "entry" => Ok(MovementKind::Entry),
            "exit" => Ok(MovementKind::Exit),
            other => Err(Error::validation(format!(
                "unknown movement kind: {other}"
            ))),
        }
    }
}

/// A persisted ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub batch_id: BatchId,
    pub kind: MovementKind,
    /// Positive magnitude; the sign comes from `kind`
    pub quantity: Quantity,
    pub occurred_at: NaiveDateTime,
    pub actor: Option<String>,
    pub reason: Option<String>,
    pub requester_id: Option<String>,
    pub external_ref: Option<String>,
}

impl Movement {
    /// The movement's effect on batch quantity.
    pub fn signed_delta(&self) -> i64 {
        match self.kind {
            MovementKind::Entry => self.quantity,
            MovementKind::Exit => -self.quantity,
        }
    }
}

/// A movement about to be appended to the ledger.
///
/// The store fills in the id and timestamp at insert time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub batch_id: BatchId,
    pub kind: MovementKind,
    pub quantity: Quantity,
    pub actor: Option<String>,
    pub reason: Option<String>,
    pub requester_id: Option<String>,
    pub external_ref: Option<String>,
}

impl NewMovement {
    /// A bare movement with only the fields every path needs.
    pub fn new(batch_id: BatchId, kind: MovementKind, quantity: Quantity) -> Self {
        Self {
            batch_id,
            kind,
            quantity,
            actor: None,
            reason: None,
            requester_id: None,
            external_ref: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_requester(mut self, requester_id: impl Into<String>) -> Self {
        self.requester_id = Some(requester_id.into());
        self
    }

    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }
}

/// Replay a batch's ledger from zero.
///
/// This is the reconciliation invariant: for any batch, the result must
/// equal the batch's stored current quantity.
pub fn replay_quantity<'a>(movements: impl IntoIterator<Item = &'a Movement>) -> i64 {
    movements.into_iter().map(Movement::signed_delta).sum()
}

/// An exit (dispensing) request against one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitRequest {
    pub batch_id: BatchId,
    pub quantity: Quantity,
    pub requester_id: Option<String>,
    pub reason: Option<String>,
    pub external_ref: Option<String>,
    pub actor: Option<String>,
}

impl ExitRequest {
    pub fn new(batch_id: BatchId, quantity: Quantity) -> Self {
        Self {
            batch_id,
            quantity,
            requester_id: None,
            reason: None,
            external_ref: None,
            actor: None,
        }
    }

    /// Check the request before it reaches the store.
    pub fn validate(&self) -> Result<()> {
        if self.quantity <= 0 {
            return Err(Error::validation("exit quantity must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn movement(kind: MovementKind, quantity: Quantity) -> Movement {
        Movement {
            id: 0,
            batch_id: 1,
            kind,
            quantity,
            occurred_at: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            actor: None,
            reason: None,
            requester_id: None,
            external_ref: None,
        }
    }

    #[test]
    fn signed_delta() {
        assert_eq!(movement(MovementKind::Entry, 5).signed_delta(), 5);
        assert_eq!(movement(MovementKind::Exit, 5).signed_delta(), -5);
    }

    #[test]
    fn replay_empty_ledger() {
        assert_eq!(replay_quantity([]), 0);
    }

    #[test]
    fn replay_reproduces_quantity() {
        let ledger = vec![
            movement(MovementKind::Entry, 100),
            movement(MovementKind::Exit, 30),
            movement(MovementKind::Exit, 20),
            movement(MovementKind::Entry, 5),
        ];
        assert_eq!(replay_quantity(&ledger), 55);
    }

    #[test]
    fn kind_round_trip() {
        assert_eq!("entry".parse::<MovementKind>(), Ok(MovementKind::Entry));
        assert_eq!("exit".parse::<MovementKind>(), Ok(MovementKind::Exit));
        assert!("Entrada".parse::<MovementKind>().is_err());
        assert_eq!(MovementKind::Entry.to_string(), "entry");
    }

    #[test]
    fn exit_request_validation() {
        assert!(ExitRequest::new(1, 5).validate().is_ok());
        assert!(ExitRequest::new(1, 0).validate().is_err());
        assert!(ExitRequest::new(1, -3).validate().is_err());
    }
}

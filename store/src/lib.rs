//! # Botica Store
//!
//! SQLite persistence and the transactional inventory operations built on
//! [`botica_core`]. Every stock-changing operation runs as one transaction
//! over a single serialized connection, pairing each quantity write with
//! its append-only ledger movement.

pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod ledger;
pub mod medications;
pub mod receipts;
pub mod reports;

pub use config::Config;
pub use db::{create_pool, run_migrations, Pool};
pub use error::{Result, StoreError};

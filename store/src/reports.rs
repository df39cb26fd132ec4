//! Read-only reporting queries: dashboard counters, expiry and low-stock
//! lists, and the global movement history.

use crate::error::Result;
use crate::ledger::{map_batch, map_movement};
use crate::medications::map_medication_with_stock;
use botica_core::{Batch, Medication, MedicationWithStock, Movement, MovementKind, Quantity};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Headline counters for the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_medications: i64,
    /// Batches with stock expiring within the warning window
    pub expiring_soon: i64,
    pub expired: i64,
    pub out_of_stock: i64,
    pub below_minimum: i64,
    /// Sum of unit price times quantity over stocked batches
    pub inventory_value: f64,
}

/// Days ahead that count as "expiring soon".
pub const EXPIRY_WARNING_DAYS: i64 = 40;

/// Compute the dashboard counters.
pub async fn dashboard_stats(pool: &SqlitePool) -> Result<DashboardStats> {
    let (total_medications,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM medications WHERE active = 1")
            .fetch_one(pool)
            .await?;

    let (expiring_soon,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM batches
        WHERE quantity > 0
          AND DATE(expiry_date) >= DATE('now', 'localtime')
          AND DATE(expiry_date) <= DATE('now', 'localtime', '+' || ? || ' days')
        "#,
    )
    .bind(EXPIRY_WARNING_DAYS)
    .fetch_one(pool)
    .await?;

    let (expired,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM batches WHERE quantity > 0 AND DATE(expiry_date) < DATE('now', 'localtime')",
    )
    .fetch_one(pool)
    .await?;

    let (out_of_stock,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM medications m
        WHERE m.active = 1
          AND COALESCE((SELECT SUM(b.quantity) FROM batches b WHERE b.medication_id = m.id), 0) = 0
        "#,
    )
    .fetch_one(pool)
    .await?;

    let (below_minimum,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM medications m
        WHERE m.active = 1
          AND m.minimum_stock > 0
          AND COALESCE((SELECT SUM(b.quantity) FROM batches b WHERE b.medication_id = m.id), 0)
              <= m.minimum_stock
        "#,
    )
    .fetch_one(pool)
    .await?;

    let (inventory_value,): (f64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(quantity * unit_price), 0.0) FROM batches
        WHERE quantity > 0 AND unit_price IS NOT NULL
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(DashboardStats {
        total_medications,
        expiring_soon,
        expired,
        out_of_stock,
        below_minimum,
        inventory_value,
    })
}

/// A stocked batch nearing expiry, with its medication and days left.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringBatch {
    pub batch: Batch,
    pub medication_code: String,
    pub medication_description: String,
    /// Negative once expired
    pub days_remaining: i64,
}

fn map_expiring_batch(row: &SqliteRow) -> std::result::Result<ExpiringBatch, sqlx::Error> {
    let days_remaining: f64 = row.try_get("days_remaining")?;
    Ok(ExpiringBatch {
        batch: map_batch(row)?,
        medication_code: row.try_get("medication_code")?,
        medication_description: row.try_get("medication_description")?,
        days_remaining: days_remaining.floor() as i64,
    })
}

/// Stocked batches expiring within `days`, including already-expired ones,
/// soonest first.
pub async fn expiring_batches(pool: &SqlitePool, days: i64) -> Result<Vec<ExpiringBatch>> {
    let batches = sqlx::query(
        r#"
        SELECT b.id, b.medication_id, b.lot_number, b.expiry_date, b.quantity,
               b.unit_price, b.total_value, b.received_on,
               m.code AS medication_code, m.description AS medication_description,
               JULIANDAY(b.expiry_date) - JULIANDAY(DATE('now', 'localtime')) AS days_remaining
        FROM batches b
        JOIN medications m ON m.id = b.medication_id
        WHERE b.quantity > 0
          AND DATE(b.expiry_date) <= DATE('now', 'localtime', '+' || ? || ' days')
        ORDER BY b.expiry_date ASC
        "#,
    )
    .bind(days)
    .try_map(|row| map_expiring_batch(&row))
    .fetch_all(pool)
    .await?;

    Ok(batches)
}

/// Active medications at or below their minimum stock threshold.
pub async fn low_stock_medications(pool: &SqlitePool) -> Result<Vec<MedicationWithStock>> {
    let medications = sqlx::query(
        r#"
        SELECT m.id, m.code, m.description, m.active_ingredient, m.dosage_form,
               m.concentration, m.unit, m.minimum_stock, m.active,
               COALESCE(SUM(b.quantity), 0) AS total_stock
        FROM medications m
        LEFT JOIN batches b ON b.medication_id = m.id
        WHERE m.active = 1 AND m.minimum_stock > 0
        GROUP BY m.id
        HAVING total_stock <= m.minimum_stock
        ORDER BY total_stock ASC
        "#,
    )
    .try_map(|row| map_medication_with_stock(&row))
    .fetch_all(pool)
    .await?;

    Ok(medications)
}

/// One ledger row joined with its batch and medication context.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementRecord {
    pub movement: Movement,
    pub lot_number: String,
    pub medication_code: String,
    pub medication_description: String,
}

fn map_movement_record(row: &SqliteRow) -> std::result::Result<MovementRecord, sqlx::Error> {
    Ok(MovementRecord {
        movement: map_movement(row)?,
        lot_number: row.try_get("b_lot_number")?,
        medication_code: row.try_get("medication_code")?,
        medication_description: row.try_get("medication_description")?,
    })
}

/// The global movement history, newest first, optionally filtered by kind.
pub async fn movement_history(
    pool: &SqlitePool,
    kind: Option<MovementKind>,
    limit: i64,
    offset: i64,
) -> Result<Vec<MovementRecord>> {
    let movements = sqlx::query(
        r#"
        SELECT v.id, v.batch_id, v.kind, v.quantity, v.occurred_at, v.actor,
               v.reason, v.requester_id, v.external_ref,
               b.lot_number AS b_lot_number,
               m.code AS medication_code, m.description AS medication_description
        FROM movements v
        JOIN batches b ON b.id = v.batch_id
        JOIN medications m ON m.id = b.medication_id
        WHERE (? IS NULL OR v.kind = ?)
        ORDER BY v.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(kind.map(|k| k.as_str()))
    .bind(kind.map(|k| k.as_str()))
    .bind(limit)
    .bind(offset)
    .try_map(|row| map_movement_record(&row))
    .fetch_all(pool)
    .await?;

    Ok(movements)
}

/// Total stock of one medication, derived from its batches.
pub async fn total_stock(pool: &SqlitePool, medication: &Medication) -> Result<Quantity> {
    let (total,): (Quantity,) = sqlx::query_as(
        "SELECT COALESCE(SUM(quantity), 0) FROM batches WHERE medication_id = ?",
    )
    .bind(medication.id)
    .fetch_one(pool)
    .await?;

    Ok(total)
}

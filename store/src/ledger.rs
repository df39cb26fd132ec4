//! Batch and movement operations.
//!
//! Every stock-changing operation here runs as one SQLite transaction that
//! pairs the batch quantity write with its ledger movement, so the ledger
//! can always be replayed back to the stored quantity.

use crate::error::{is_unique_violation, Result, StoreError};
use botica_core::{
    replay_quantity, Batch, BatchId, BatchUpdate, EntryRequest, Error, ExitRequest, MedicationId,
    Movement, MovementKind, NewMovement, Quantity,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Map a `batches` row to the domain type.
pub(crate) fn map_batch(row: &SqliteRow) -> std::result::Result<Batch, sqlx::Error> {
    Ok(Batch {
        id: row.try_get("id")?,
        medication_id: row.try_get("medication_id")?,
        lot_number: row.try_get("lot_number")?,
        expiry_date: row.try_get("expiry_date")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
        total_value: row.try_get("total_value")?,
        received_on: row.try_get("received_on")?,
    })
}

/// Map a `movements` row to the domain type.
pub(crate) fn map_movement(row: &SqliteRow) -> std::result::Result<Movement, sqlx::Error> {
    let kind: String = row.try_get("kind")?;
    let kind = kind
        .parse::<MovementKind>()
        .map_err(|e| sqlx::Error::Decode(e.into()))?;

    Ok(Movement {
        id: row.try_get("id")?,
        batch_id: row.try_get("batch_id")?,
        kind,
        quantity: row.try_get("quantity")?,
        occurred_at: row.try_get("occurred_at")?,
        actor: row.try_get("actor")?,
        reason: row.try_get("reason")?,
        requester_id: row.try_get("requester_id")?,
        external_ref: row.try_get("external_ref")?,
    })
}

/// Append one movement to the ledger, inside the caller's transaction.
pub(crate) async fn insert_movement(
    conn: &mut SqliteConnection,
    movement: &NewMovement,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO movements (batch_id, kind, quantity, actor, reason, requester_id, external_ref)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(movement.batch_id)
    .bind(movement.kind.as_str())
    .bind(movement.quantity)
    .bind(&movement.actor)
    .bind(&movement.reason)
    .bind(&movement.requester_id)
    .bind(&movement.external_ref)
    .execute(conn)
    .await?;

    Ok(())
}

/// Register incoming stock: insert the batch and its entry movement.
pub async fn register_entry(pool: &SqlitePool, request: &EntryRequest) -> Result<Batch> {
    request.validate()?;

    // Inactive medications still accept stock; deactivation is a catalog
    // flag, not a receiving ban.
    let medication_exists: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM medications WHERE id = ?")
            .bind(request.medication_id)
            .fetch_optional(pool)
            .await?;
    if medication_exists.is_none() {
        return Err(Error::MedicationNotFound(request.medication_id).into());
    }

    let received_on = chrono::Local::now().date_naive();
    let mut tx = pool.begin().await?;

    let insert = sqlx::query(
        r#"
        INSERT INTO batches (medication_id, lot_number, expiry_date, quantity, unit_price, total_value, received_on)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(request.medication_id)
    .bind(&request.lot_number)
    .bind(request.expiry_date)
    .bind(request.quantity)
    .bind(request.unit_price)
    .bind(request.total_value())
    .bind(received_on)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Domain(Error::Conflict(format!(
                "lot '{}' may already exist for this medication",
                request.lot_number
            )))
        } else {
            e.into()
        }
    })?;

    let batch_id = insert.last_insert_rowid();

    let reason = match &request.supplier {
        Some(supplier) => format!("initial lot entry; supplier: {supplier}"),
        None => "initial lot entry".to_string(),
    };
    insert_movement(
        &mut tx,
        &NewMovement::new(batch_id, MovementKind::Entry, request.quantity).with_reason(reason),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        batch_id,
        medication_id = request.medication_id,
        quantity = request.quantity,
        "registered batch entry"
    );

    batch_by_id(pool, batch_id).await
}

/// Dispense stock from one batch. Returns the remaining quantity.
///
/// The stock check happens inside the same transaction as the decrement, so
/// a rejected exit leaves the batch and the ledger untouched.
pub async fn register_exit(pool: &SqlitePool, request: &ExitRequest) -> Result<Quantity> {
    request.validate()?;

    let mut tx = pool.begin().await?;

    let available: Option<(Quantity,)> = sqlx::query_as("SELECT quantity FROM batches WHERE id = ?")
        .bind(request.batch_id)
        .fetch_optional(&mut *tx)
        .await?;
    let available = match available {
        Some((quantity,)) => quantity,
        None => return Err(Error::BatchNotFound(request.batch_id).into()),
    };

    if available < request.quantity {
        return Err(Error::InsufficientStock {
            requested: request.quantity,
            available,
        }
        .into());
    }

    sqlx::query("UPDATE batches SET quantity = quantity - ? WHERE id = ?")
        .bind(request.quantity)
        .bind(request.batch_id)
        .execute(&mut *tx)
        .await?;

    let mut movement = NewMovement::new(request.batch_id, MovementKind::Exit, request.quantity);
    movement.actor = request.actor.clone();
    movement.reason = request.reason.clone();
    movement.requester_id = request.requester_id.clone();
    movement.external_ref = request.external_ref.clone();
    insert_movement(&mut tx, &movement).await?;

    tx.commit().await?;

    Ok(available - request.quantity)
}

/// Apply a field correction to a batch.
///
/// This is an administrative edit, not a stock event, so no movement is
/// recorded even when the quantity field changes.
pub async fn adjust_batch(
    pool: &SqlitePool,
    batch_id: BatchId,
    update: &BatchUpdate,
) -> Result<Batch> {
    update.validate()?;

    let mut batch = batch_by_id(pool, batch_id).await?;
    update.apply_to(&mut batch);

    sqlx::query(
        r#"
        UPDATE batches
        SET lot_number = ?, expiry_date = ?, quantity = ?, unit_price = ?, total_value = ?
        WHERE id = ?
        "#,
    )
    .bind(&batch.lot_number)
    .bind(batch.expiry_date)
    .bind(batch.quantity)
    .bind(batch.unit_price)
    .bind(batch.total_value)
    .bind(batch.id)
    .execute(pool)
    .await?;

    Ok(batch)
}

/// Retire a batch by zeroing its quantity. The row and its movement history
/// stay in place.
pub async fn soft_delete_batch(pool: &SqlitePool, batch_id: BatchId) -> Result<()> {
    let result = sqlx::query("UPDATE batches SET quantity = 0 WHERE id = ?")
        .bind(batch_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::BatchNotFound(batch_id).into());
    }

    Ok(())
}

/// Fetch one batch.
pub async fn batch_by_id(pool: &SqlitePool, batch_id: BatchId) -> Result<Batch> {
    sqlx::query(
        r#"
        SELECT id, medication_id, lot_number, expiry_date, quantity, unit_price, total_value, received_on
        FROM batches
        WHERE id = ?
        "#,
    )
    .bind(batch_id)
    .try_map(|row| map_batch(&row))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::BatchNotFound(batch_id).into())
}

/// All batches of a medication, soonest expiry first.
pub async fn batches_for_medication(
    pool: &SqlitePool,
    medication_id: MedicationId,
) -> Result<Vec<Batch>> {
    let batches = sqlx::query(
        r#"
        SELECT id, medication_id, lot_number, expiry_date, quantity, unit_price, total_value, received_on
        FROM batches
        WHERE medication_id = ?
        ORDER BY expiry_date ASC, id ASC
        "#,
    )
    .bind(medication_id)
    .try_map(|row| map_batch(&row))
    .fetch_all(pool)
    .await?;

    Ok(batches)
}

/// A batch's full ledger, oldest first.
pub async fn movements_for_batch(pool: &SqlitePool, batch_id: BatchId) -> Result<Vec<Movement>> {
    let movements = sqlx::query(
        r#"
        SELECT id, batch_id, kind, quantity, occurred_at, actor, reason, requester_id, external_ref
        FROM movements
        WHERE batch_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(batch_id)
    .try_map(|row| map_movement(&row))
    .fetch_all(pool)
    .await?;

    Ok(movements)
}

/// Replay a batch's ledger from zero.
///
/// For any batch whose writes all went through this module, the result
/// equals the stored quantity. Divergence means an adjustment or soft
/// delete touched the quantity outside the ledger.
pub async fn replayed_quantity(pool: &SqlitePool, batch_id: BatchId) -> Result<i64> {
    let movements = movements_for_batch(pool, batch_id).await?;
    Ok(replay_quantity(&movements))
}

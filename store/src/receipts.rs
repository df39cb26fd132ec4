//! Receipt operations: dispensing and voiding.
//!
//! Creating a receipt and applying its stock exits is one transaction. If
//! any line lacks stock, the whole receipt is rejected and no batch or
//! ledger row changes. Voiding is the mirror image: every line is
//! re-credited and ledgered, or nothing is.

use crate::error::{Result, StoreError};
use crate::ledger::insert_movement;
use botica_core::{
    DispenseRequest, Error, MovementKind, NewMovement, Quantity, Receipt, ReceiptLine,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Map a `receipts` row to the domain type. The lines column holds JSON.
fn map_receipt(row: &SqliteRow) -> std::result::Result<Receipt, sqlx::Error> {
    let lines: String = row.try_get("lines")?;
    let lines: Vec<ReceiptLine> =
        serde_json::from_str(&lines).map_err(|e| sqlx::Error::Decode(e.into()))?;
    let voided: i64 = row.try_get("voided")?;

    Ok(Receipt {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        issued_on: row.try_get("issued_on")?,
        requester_id: row.try_get("requester_id")?,
        exact_total: row.try_get("exact_total")?,
        rounded_total: row.try_get("rounded_total")?,
        lines,
        voided: voided != 0,
        created_at: row.try_get("created_at")?,
    })
}

const RECEIPT_COLUMNS: &str =
    "id, code, issued_on, requester_id, exact_total, rounded_total, lines, voided, created_at";

/// Generate a receipt code: millisecond timestamp in base 36 plus a random
/// suffix, so codes sort roughly by time but never collide within one.
fn generate_code() -> String {
    let millis = chrono::Local::now().timestamp_millis();
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(3)
        .collect();
    format!("R{}{}", to_base36(millis), suffix.to_uppercase())
}

fn to_base36(mut value: i64) -> String {
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Dispense stock and persist the receipt, atomically.
pub async fn create_receipt(pool: &SqlitePool, request: &DispenseRequest) -> Result<Receipt> {
    request.validate()?;

    let code = generate_code();
    let issued_on = chrono::Local::now().date_naive();
    let mut tx = pool.begin().await?;

    for line in &request.lines {
        let available: Option<(Quantity,)> =
            sqlx::query_as("SELECT quantity FROM batches WHERE id = ?")
                .bind(line.batch_id)
                .fetch_optional(&mut *tx)
                .await?;
        let available = match available {
            Some((quantity,)) => quantity,
            None => return Err(Error::BatchNotFound(line.batch_id).into()),
        };
        if available < line.quantity {
            return Err(Error::InsufficientStock {
                requested: line.quantity,
                available,
            }
            .into());
        }

        sqlx::query("UPDATE batches SET quantity = quantity - ? WHERE id = ?")
            .bind(line.quantity)
            .bind(line.batch_id)
            .execute(&mut *tx)
            .await?;

        let mut movement = NewMovement::new(line.batch_id, MovementKind::Exit, line.quantity)
            .with_reason(format!("dispensed on receipt {code}"))
            .with_external_ref(code.clone());
        movement.actor = request.actor.clone();
        movement.requester_id = request.requester_id.clone();
        insert_movement(&mut tx, &movement).await?;
    }

    let lines = serde_json::to_string(&request.receipt_lines())?;
    sqlx::query(
        r#"
        INSERT INTO receipts (code, issued_on, requester_id, exact_total, rounded_total, lines)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&code)
    .bind(issued_on)
    .bind(&request.requester_id)
    .bind(request.exact_total())
    .bind(request.rounded_total())
    .bind(&lines)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        %code,
        lines = request.lines.len(),
        total = request.rounded_total(),
        "receipt created"
    );

    find_receipt(pool, &code).await
}

/// Fetch one receipt by code.
pub async fn find_receipt(pool: &SqlitePool, code: &str) -> Result<Receipt> {
    let query = format!("SELECT {RECEIPT_COLUMNS} FROM receipts WHERE code = ?");
    sqlx::query(&query)
        .bind(code)
        .try_map(|row| map_receipt(&row))
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::ReceiptNotFound(code.to_string()).into())
}

/// List receipts, newest first.
pub async fn list_receipts(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Receipt>> {
    let query =
        format!("SELECT {RECEIPT_COLUMNS} FROM receipts ORDER BY id DESC LIMIT ? OFFSET ?");
    let receipts = sqlx::query(&query)
        .bind(limit)
        .bind(offset)
        .try_map(|row| map_receipt(&row))
        .fetch_all(pool)
        .await?;

    Ok(receipts)
}

/// Void a receipt: re-credit every line and ledger the reversals.
///
/// All-or-nothing. A line that cannot be re-credited (old receipts without
/// batch ids, or a batch hard-removed since) fails the whole void and the
/// receipt stays live. Returns the number of lines re-credited.
pub async fn void_receipt(pool: &SqlitePool, code: &str) -> Result<usize> {
    let receipt = find_receipt(pool, code).await?;
    if receipt.voided {
        return Err(Error::AlreadyVoided(code.to_string()).into());
    }

    let mut tx = pool.begin().await?;

    // The read above is stale by the time the transaction opens: another
    // void interleaving at an await point may have flipped the flag since.
    // Claiming the flag first, guarded on its old value, makes the flip the
    // authoritative check, the same in-transaction re-check register_exit
    // applies to stock.
    let claimed = sqlx::query("UPDATE receipts SET voided = 1 WHERE code = ? AND voided = 0")
        .bind(code)
        .execute(&mut *tx)
        .await?;
    if claimed.rows_affected() == 0 {
        return Err(Error::AlreadyVoided(code.to_string()).into());
    }

    for line in &receipt.lines {
        let (batch_id, quantity) = match (line.batch_id, line.quantity) {
            (Some(batch_id), Some(quantity)) if quantity > 0 => (batch_id, quantity),
            _ => {
                return Err(StoreError::Domain(Error::validation(format!(
                    "line '{}' cannot be re-credited: no batch reference",
                    line.description
                ))))
            }
        };

        let result = sqlx::query("UPDATE batches SET quantity = quantity + ? WHERE id = ?")
            .bind(quantity)
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::BatchNotFound(batch_id).into());
        }

        insert_movement(
            &mut tx,
            &NewMovement::new(batch_id, MovementKind::Entry, quantity)
                .with_actor("system")
                .with_reason(format!("void of receipt {code}"))
                .with_external_ref(code.to_string()),
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(%code, lines = receipt.lines.len(), "receipt voided");

    Ok(receipt.lines.len())
}

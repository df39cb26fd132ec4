//! Bulk import: preview and commit.
//!
//! Preview classifies rows without writing anything. Commit applies each
//! row in its own transaction, so one bad row rolls back only itself and
//! the rest of the file still lands. Progress is reported after every row.

use crate::error::Result;
use crate::ledger::insert_movement;
use botica_core::{
    classify_row, normalize_row, DuplicateStrategy, ImportOptions, ImportPreview,
    ImportSummary, Medication, MovementKind, NewMovement, NormalizedRow, PreviewSummary, Progress,
    Quantity, RawRow, RowError, RowReport,
};
use chrono::NaiveDate;
use sqlx::SqlitePool;

/// Classify an import file against the current catalog. Writes nothing.
pub async fn preview_import(pool: &SqlitePool, rows: &[RawRow]) -> Result<ImportPreview> {
    let mut summary = PreviewSummary::default();
    let mut reports = Vec::with_capacity(rows.len());

    for raw in rows {
        let row = normalize_row(raw);

        let mut medication_known = false;
        let mut batch_key_taken = false;
        if row.is_valid() {
            let medication = crate::medications::medication_by_code(pool, &row.code).await?;
            medication_known = medication.is_some();
            // Without an expiry date the batch key is undecided until commit
            // fills in the fallback, so the preview cannot call it a duplicate.
            if let (Some(medication), Some(expiry)) = (&medication, row.expiry_date) {
                batch_key_taken =
                    batch_exists(pool, medication.id, &row.lot_number, expiry).await?;
            }
        }

        let status = classify_row(&row, medication_known, batch_key_taken);
        summary.record(status);
        reports.push(RowReport { row, status });
    }

    Ok(ImportPreview {
        summary,
        rows: reports,
    })
}

/// Apply an import file row by row, reporting progress after each row.
///
/// Counters reflect only rows that committed; a failed row contributes one
/// entry to `errors` and nothing else.
pub async fn commit_import(
    pool: &SqlitePool,
    rows: &[RawRow],
    options: &ImportOptions,
    mut on_progress: impl FnMut(Progress),
) -> Result<ImportSummary> {
    let total = rows.len();
    let mut summary = ImportSummary::default();

    for (processed, raw) in rows.iter().enumerate() {
        let row = normalize_row(raw);

        if !row.is_valid() {
            summary.errors.push(RowError {
                row_index: row.row_index,
                message: row.errors.join("; "),
            });
            on_progress(Progress::new(processed + 1, total));
            continue;
        }

        match apply_row(pool, &row, options).await {
            Ok(effect) => effect.fold_into(&mut summary),
            Err(err) => summary.errors.push(RowError {
                row_index: row.row_index,
                message: err.to_string(),
            }),
        }

        on_progress(Progress::new(processed + 1, total));
    }

    tracing::info!(
        inserted = summary.inserted_batches,
        updated = summary.updated_batches,
        skipped = summary.skipped_duplicates,
        failed = summary.errors.len(),
        "import committed"
    );

    Ok(summary)
}

/// What one committed row did, folded into the summary only on success.
#[derive(Default)]
struct RowEffect {
    inserted: bool,
    updated: bool,
    skipped: bool,
    new_medication: bool,
}

impl RowEffect {
    fn fold_into(self, summary: &mut ImportSummary) {
        if self.inserted {
            summary.inserted_batches += 1;
        }
        if self.updated {
            summary.updated_batches += 1;
        }
        if self.skipped {
            summary.skipped_duplicates += 1;
        }
        if self.new_medication {
            summary.new_medications += 1;
        } else {
            summary.existing_medications += 1;
        }
    }
}

/// Apply one valid row inside its own transaction.
async fn apply_row(
    pool: &SqlitePool,
    row: &NormalizedRow,
    options: &ImportOptions,
) -> Result<RowEffect> {
    let mut effect = RowEffect::default();

    // Catalog lookup happens before the transaction: the pool has a single
    // connection, so nothing may query through it while a transaction holds it.
    let existing = crate::medications::medication_by_code(pool, &row.code).await?;

    let mut tx = pool.begin().await?;
    let medication_id = match existing {
        Some(Medication { id, active, .. }) => {
            if !active {
                sqlx::query("UPDATE medications SET active = 1 WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            id
        }
        None => {
            let insert = sqlx::query("INSERT INTO medications (code, description) VALUES (?, ?)")
                .bind(&row.code)
                .bind(&row.description)
                .execute(&mut *tx)
                .await?;
            effect.new_medication = true;
            insert.last_insert_rowid()
        }
    };

    // Rows without an expiry get today as a conservative fallback.
    let expiry_date = row
        .expiry_date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let duplicate: Option<(i64, Quantity)> = sqlx::query_as(
        r#"
        SELECT id, quantity FROM batches
        WHERE medication_id = ? AND lot_number = ? AND expiry_date = ?
        ORDER BY id ASC
        "#,
    )
    .bind(medication_id)
    .bind(&row.lot_number)
    .bind(expiry_date)
    .fetch_optional(&mut *tx)
    .await?;

    match duplicate {
        None => {
            insert_batch(&mut tx, medication_id, row, expiry_date, options, "import entry").await?;
            effect.inserted = true;
        }
        Some(_) if options.strategy == DuplicateStrategy::Skip => {
            effect.skipped = true;
        }
        Some(_) if options.strategy == DuplicateStrategy::Allow => {
            insert_batch(
                &mut tx,
                medication_id,
                row,
                expiry_date,
                options,
                "import entry (duplicate allowed)",
            )
            .await?;
            effect.inserted = true;
        }
        Some((batch_id, old_quantity)) => {
            overwrite_batch(&mut tx, batch_id, old_quantity, row, options).await?;
            effect.updated = true;
        }
    }

    tx.commit().await?;
    Ok(effect)
}

async fn insert_batch(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    medication_id: i64,
    row: &NormalizedRow,
    expiry_date: NaiveDate,
    options: &ImportOptions,
    reason: &str,
) -> Result<()> {
    let amount = row.amount_or_computed();
    let received_on = chrono::Local::now().date_naive();

    let insert = sqlx::query(
        r#"
        INSERT INTO batches (medication_id, lot_number, expiry_date, quantity, unit_price, total_value, received_on)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(medication_id)
    .bind(&row.lot_number)
    .bind(expiry_date)
    .bind(row.quantity)
    .bind(row.unit_price)
    .bind(amount)
    .bind(received_on)
    .execute(&mut **tx)
    .await?;

    if options.record_movements && row.quantity > 0 {
        insert_movement(
            tx,
            &NewMovement::new(insert.last_insert_rowid(), MovementKind::Entry, row.quantity)
                .with_reason(reason),
        )
        .await?;
    }

    Ok(())
}

/// Set the existing batch to the row's values and ledger the quantity delta
/// as one movement, typed by its sign.
async fn overwrite_batch(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    batch_id: i64,
    old_quantity: Quantity,
    row: &NormalizedRow,
    options: &ImportOptions,
) -> Result<()> {
    let amount = row.amount_or_computed();

    sqlx::query("UPDATE batches SET quantity = ?, unit_price = ?, total_value = ? WHERE id = ?")
        .bind(row.quantity)
        .bind(row.unit_price)
        .bind(amount)
        .bind(batch_id)
        .execute(&mut **tx)
        .await?;

    let delta = row.quantity - old_quantity;
    if options.record_movements && delta != 0 {
        let kind = if delta > 0 {
            MovementKind::Entry
        } else {
            MovementKind::Exit
        };
        insert_movement(
            tx,
            &NewMovement::new(batch_id, kind, delta.abs())
                .with_reason("import adjustment (overwrite)"),
        )
        .await?;
    }

    Ok(())
}

async fn batch_exists(
    pool: &SqlitePool,
    medication_id: i64,
    lot_number: &str,
    expiry_date: NaiveDate,
) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM batches
            WHERE medication_id = ? AND lot_number = ? AND expiry_date = ?
        )
        "#,
    )
    .bind(medication_id)
    .bind(lot_number)
    .bind(expiry_date)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

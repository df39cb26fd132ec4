//! Medication catalog operations.

use crate::error::{is_unique_violation, Result, StoreError};
use botica_core::{Error, Medication, MedicationId, MedicationWithStock, NewMedication};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Map a `medications` row to the domain type.
pub(crate) fn map_medication(row: &SqliteRow) -> std::result::Result<Medication, sqlx::Error> {
    let active: i64 = row.try_get("active")?;
    Ok(Medication {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        description: row.try_get("description")?,
        active_ingredient: row.try_get("active_ingredient")?,
        dosage_form: row.try_get("dosage_form")?,
        concentration: row.try_get("concentration")?,
        unit: row.try_get("unit")?,
        minimum_stock: row.try_get("minimum_stock")?,
        active: active != 0,
    })
}

/// Map a medication row carrying a `total_stock` aggregate column.
pub(crate) fn map_medication_with_stock(
    row: &SqliteRow,
) -> std::result::Result<MedicationWithStock, sqlx::Error> {
    Ok(MedicationWithStock {
        medication: map_medication(row)?,
        total_stock: row.try_get("total_stock")?,
    })
}

const MEDICATION_COLUMNS: &str =
    "id, code, description, active_ingredient, dosage_form, concentration, unit, minimum_stock, active";

/// Add a catalog entry. The code must be unused.
pub async fn add_medication(pool: &SqlitePool, new: &NewMedication) -> Result<Medication> {
    new.validate()?;

    let insert = sqlx::query(
        r#"
        INSERT INTO medications (code, description, active_ingredient, dosage_form, concentration, unit, minimum_stock)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.code)
    .bind(&new.description)
    .bind(&new.active_ingredient)
    .bind(&new.dosage_form)
    .bind(&new.concentration)
    .bind(&new.unit)
    .bind(new.minimum_stock)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Domain(Error::Conflict(format!(
                "medication code '{}' already exists",
                new.code
            )))
        } else {
            e.into()
        }
    })?;

    medication_by_id(pool, insert.last_insert_rowid()).await
}

/// Fetch one catalog entry.
pub async fn medication_by_id(pool: &SqlitePool, id: MedicationId) -> Result<Medication> {
    let query = format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?");
    sqlx::query(&query)
        .bind(id)
        .try_map(|row| map_medication(&row))
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::MedicationNotFound(id).into())
}

/// Fetch a catalog entry by its external code, active or not.
pub async fn medication_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Medication>> {
    let query = format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE code = ?");
    let medication = sqlx::query(&query)
        .bind(code)
        .try_map(|row| map_medication(&row))
        .fetch_optional(pool)
        .await?;

    Ok(medication)
}

/// List active medications with their derived stock, paged.
///
/// `search` matches code and description. Returns the total match count
/// alongside the requested page.
pub async fn list_medications(
    pool: &SqlitePool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(i64, Vec<MedicationWithStock>)> {
    let pattern = format!("%{}%", search.unwrap_or(""));

    let (total,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM medications
        WHERE active = 1 AND (code LIKE ? OR description LIKE ?)
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    let medications = sqlx::query(
        r#"
        SELECT m.id, m.code, m.description, m.active_ingredient, m.dosage_form,
               m.concentration, m.unit, m.minimum_stock, m.active,
               COALESCE(SUM(b.quantity), 0) AS total_stock
        FROM medications m
        LEFT JOIN batches b ON b.medication_id = m.id
        WHERE m.active = 1 AND (m.code LIKE ? OR m.description LIKE ?)
        GROUP BY m.id
        ORDER BY m.description ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .try_map(|row| map_medication_with_stock(&row))
    .fetch_all(pool)
    .await?;

    Ok((total, medications))
}

/// Edit a catalog entry. The code stays subject to the uniqueness rule.
pub async fn update_medication(
    pool: &SqlitePool,
    id: MedicationId,
    fields: &NewMedication,
) -> Result<Medication> {
    fields.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE medications
        SET code = ?, description = ?, active_ingredient = ?, dosage_form = ?,
            concentration = ?, unit = ?, minimum_stock = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.code)
    .bind(&fields.description)
    .bind(&fields.active_ingredient)
    .bind(&fields.dosage_form)
    .bind(&fields.concentration)
    .bind(&fields.unit)
    .bind(fields.minimum_stock)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Domain(Error::Conflict(format!(
                "medication code '{}' already exists",
                fields.code
            )))
        } else {
            e.into()
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(Error::MedicationNotFound(id).into());
    }

    medication_by_id(pool, id).await
}

/// Soft-delete a catalog entry. Its batches and ledger history remain.
pub async fn deactivate_medication(pool: &SqlitePool, id: MedicationId) -> Result<()> {
    let result = sqlx::query("UPDATE medications SET active = 0 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::MedicationNotFound(id).into());
    }

    Ok(())
}

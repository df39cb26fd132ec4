//! Integration tests for batch and ledger operations, against an
//! in-memory SQLite database.

use botica_core::{
    BatchUpdate, EntryRequest, Error, ExitRequest, MovementKind, NewMedication,
};
use botica_store::{create_pool, ledger, medications, run_migrations, Pool};
use chrono::NaiveDate;

async fn setup() -> Pool {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

fn expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2027, 6, 30).unwrap()
}

async fn seed_medication(pool: &Pool, code: &str) -> i64 {
    medications::add_medication(pool, &NewMedication::new(code, format!("{code} description")))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn entry_creates_batch_and_movement() {
    let pool = setup().await;
    let med = seed_medication(&pool, "MED-1").await;

    let batch = ledger::register_entry(
        &pool,
        &EntryRequest::new(med, "L-001", 50, expiry())
            .with_unit_price(2.5)
            .with_supplier("Central warehouse"),
    )
    .await
    .unwrap();

    assert_eq!(batch.quantity, 50);
    assert_eq!(batch.total_value, Some(125.0));

    let movements = ledger::movements_for_batch(&pool, batch.id).await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].kind, MovementKind::Entry);
    assert_eq!(movements[0].quantity, 50);
    assert!(movements[0]
        .reason
        .as_deref()
        .unwrap()
        .contains("Central warehouse"));
}

#[tokio::test]
async fn entry_rejects_unknown_medication() {
    let pool = setup().await;

    let err = ledger::register_entry(&pool, &EntryRequest::new(99, "L-001", 50, expiry()))
        .await
        .unwrap_err();
    assert_eq!(err.as_domain(), Some(&Error::MedicationNotFound(99)));
}

#[tokio::test]
async fn entry_rejects_invalid_request_before_writing() {
    let pool = setup().await;
    let med = seed_medication(&pool, "MED-1").await;

    let err = ledger::register_entry(&pool, &EntryRequest::new(med, "L-001", 0, expiry()))
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(Error::Validation(_))));

    let batches = ledger::batches_for_medication(&pool, med).await.unwrap();
    assert!(batches.is_empty());
}

#[tokio::test]
async fn exit_decrements_and_ledgers() {
    let pool = setup().await;
    let med = seed_medication(&pool, "MED-1").await;
    let batch = ledger::register_entry(&pool, &EntryRequest::new(med, "L-001", 50, expiry()))
        .await
        .unwrap();

    let remaining = ledger::register_exit(
        &pool,
        &ExitRequest {
            batch_id: batch.id,
            quantity: 20,
            requester_id: Some("REQ-7".into()),
            reason: Some("ward restock".into()),
            external_ref: None,
            actor: Some("nurse".into()),
        },
    )
    .await
    .unwrap();
    assert_eq!(remaining, 30);

    // entry then exit: exactly two movements
    let movements = ledger::movements_for_batch(&pool, batch.id).await.unwrap();
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[1].kind, MovementKind::Exit);
    assert_eq!(movements[1].requester_id.as_deref(), Some("REQ-7"));

    let batch = ledger::batch_by_id(&pool, batch.id).await.unwrap();
    assert_eq!(batch.quantity, 30);
}

#[tokio::test]
async fn exit_never_drives_quantity_negative() {
    let pool = setup().await;
    let med = seed_medication(&pool, "MED-1").await;
    let batch = ledger::register_entry(&pool, &EntryRequest::new(med, "L-001", 10, expiry()))
        .await
        .unwrap();

    let err = ledger::register_exit(&pool, &ExitRequest::new(batch.id, 11))
        .await
        .unwrap_err();
    assert_eq!(
        err.as_domain(),
        Some(&Error::InsufficientStock {
            requested: 11,
            available: 10,
        })
    );

    // A rejected exit leaves both the batch and the ledger untouched.
    let batch = ledger::batch_by_id(&pool, batch.id).await.unwrap();
    assert_eq!(batch.quantity, 10);
    let movements = ledger::movements_for_batch(&pool, batch.id).await.unwrap();
    assert_eq!(movements.len(), 1);
}

#[tokio::test]
async fn exit_on_missing_batch() {
    let pool = setup().await;

    let err = ledger::register_exit(&pool, &ExitRequest::new(42, 1))
        .await
        .unwrap_err();
    assert_eq!(err.as_domain(), Some(&Error::BatchNotFound(42)));
}

#[tokio::test]
async fn replay_reconciles_with_stored_quantity() {
    let pool = setup().await;
    let med = seed_medication(&pool, "MED-1").await;
    let batch = ledger::register_entry(&pool, &EntryRequest::new(med, "L-001", 100, expiry()))
        .await
        .unwrap();

    ledger::register_exit(&pool, &ExitRequest::new(batch.id, 30))
        .await
        .unwrap();
    ledger::register_exit(&pool, &ExitRequest::new(batch.id, 25))
        .await
        .unwrap();

    let stored = ledger::batch_by_id(&pool, batch.id).await.unwrap().quantity;
    let replayed = ledger::replayed_quantity(&pool, batch.id).await.unwrap();
    assert_eq!(stored, 45);
    assert_eq!(replayed, stored);
}

#[tokio::test]
async fn adjust_updates_fields_without_movement() {
    let pool = setup().await;
    let med = seed_medication(&pool, "MED-1").await;
    let batch = ledger::register_entry(&pool, &EntryRequest::new(med, "L-001", 50, expiry()))
        .await
        .unwrap();

    let update = BatchUpdate {
        quantity: Some(48),
        unit_price: Some(3.0),
        ..Default::default()
    };
    let updated = ledger::adjust_batch(&pool, batch.id, &update).await.unwrap();
    assert_eq!(updated.quantity, 48);
    assert_eq!(updated.unit_price, Some(3.0));
    assert_eq!(updated.lot_number, "L-001");

    // Administrative corrections bypass the ledger.
    let movements = ledger::movements_for_batch(&pool, batch.id).await.unwrap();
    assert_eq!(movements.len(), 1);
}

#[tokio::test]
async fn adjust_rejects_empty_update() {
    let pool = setup().await;
    let med = seed_medication(&pool, "MED-1").await;
    let batch = ledger::register_entry(&pool, &EntryRequest::new(med, "L-001", 50, expiry()))
        .await
        .unwrap();

    let err = ledger::adjust_batch(&pool, batch.id, &BatchUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(Error::Validation(_))));
}

#[tokio::test]
async fn soft_delete_zeroes_quantity_and_keeps_history() {
    let pool = setup().await;
    let med = seed_medication(&pool, "MED-1").await;
    let batch = ledger::register_entry(&pool, &EntryRequest::new(med, "L-001", 50, expiry()))
        .await
        .unwrap();

    ledger::soft_delete_batch(&pool, batch.id).await.unwrap();

    let batch = ledger::batch_by_id(&pool, batch.id).await.unwrap();
    assert_eq!(batch.quantity, 0);
    let movements = ledger::movements_for_batch(&pool, batch.id).await.unwrap();
    assert_eq!(movements.len(), 1);

    let err = ledger::soft_delete_batch(&pool, 999).await.unwrap_err();
    assert_eq!(err.as_domain(), Some(&Error::BatchNotFound(999)));
}

#[tokio::test]
async fn batches_ordered_by_expiry() {
    let pool = setup().await;
    let med = seed_medication(&pool, "MED-1").await;

    let later = NaiveDate::from_ymd_opt(2028, 1, 1).unwrap();
    let sooner = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    ledger::register_entry(&pool, &EntryRequest::new(med, "L-LATE", 10, later))
        .await
        .unwrap();
    ledger::register_entry(&pool, &EntryRequest::new(med, "L-SOON", 10, sooner))
        .await
        .unwrap();

    let batches = ledger::batches_for_medication(&pool, med).await.unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].lot_number, "L-SOON");
    assert_eq!(batches[1].lot_number, "L-LATE");
}

#[tokio::test]
async fn duplicate_medication_code_conflicts() {
    let pool = setup().await;
    seed_medication(&pool, "MED-1").await;

    let err = medications::add_medication(&pool, &NewMedication::new("MED-1", "Another"))
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(Error::Conflict(_))));
}

#[tokio::test]
async fn medication_listing_with_stock_and_search() {
    let pool = setup().await;
    let paracetamol = seed_medication(&pool, "PARA-500").await;
    seed_medication(&pool, "IBU-400").await;

    ledger::register_entry(&pool, &EntryRequest::new(paracetamol, "L-1", 30, expiry()))
        .await
        .unwrap();

    let (total, page) = medications::list_medications(&pool, None, 10, 0).await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(page.len(), 2);

    let (total, page) = medications::list_medications(&pool, Some("PARA"), 10, 0)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(page[0].medication.code, "PARA-500");
    assert_eq!(page[0].total_stock, 30);
}

#[tokio::test]
async fn update_medication_edits_fields() {
    let pool = setup().await;
    let med = seed_medication(&pool, "MED-1").await;

    let mut fields = NewMedication::new("MED-1", "Paracetamol 500mg tablets");
    fields.minimum_stock = 25;
    fields.unit = Some("tablet".into());
    let updated = medications::update_medication(&pool, med, &fields).await.unwrap();
    assert_eq!(updated.description, "Paracetamol 500mg tablets");
    assert_eq!(updated.minimum_stock, 25);
    assert_eq!(updated.unit.as_deref(), Some("tablet"));

    let err = medications::update_medication(&pool, 999, &fields)
        .await
        .unwrap_err();
    assert_eq!(err.as_domain(), Some(&Error::MedicationNotFound(999)));
}

#[tokio::test]
async fn deactivated_medication_leaves_listing() {
    let pool = setup().await;
    let med = seed_medication(&pool, "MED-1").await;

    medications::deactivate_medication(&pool, med).await.unwrap();

    let (total, _) = medications::list_medications(&pool, None, 10, 0).await.unwrap();
    assert_eq!(total, 0);

    // Still reachable by code, for import reactivation.
    let found = medications::medication_by_code(&pool, "MED-1").await.unwrap();
    assert!(matches!(found, Some(m) if !m.active));
}

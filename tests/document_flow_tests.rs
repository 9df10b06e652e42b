/// Numbered documents, the transaction helper and the facade
/// Run with: cargo test --test document_flow_tests

use chrono::{NaiveDate, TimeZone, Utc};
use docket::core::ManualClock;
use docket::domain::{DocumentService, GOODS_RECEIPT_MODULE, GoodsReceipt, WORK_ORDER_MODULE, WorkOrder};
use docket::{
    AuditFields, Docket, DocketConfig, DocketError, MemoryStore, StoreTransaction,
    TransactionalStore, run_in_transaction,
};
use std::sync::Arc;
use std::time::Duration;

async fn documents_with_series() -> (MemoryStore, DocumentService) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 2, 7, 0, 0).unwrap(),
    ));
    let store = MemoryStore::new();
    let documents = DocumentService::with_clock(clock);

    let mut tx = store.begin().await.unwrap();
    let sequences = documents.sequences().store();
    sequences
        .define(&mut tx, GOODS_RECEIPT_MODULE, "GR-2024-#####", 0, "admin")
        .await
        .unwrap();
    sequences
        .define(&mut tx, WORK_ORDER_MODULE, "WO###", 99, "admin")
        .await
        .unwrap();
    tx.commit().await.unwrap();
    (store, documents)
}

fn receipt(supplier: &str) -> GoodsReceipt {
    GoodsReceipt {
        supplier: supplier.into(),
        warehouse: "North".into(),
        quantity: 40,
        unit_price: 2.5,
        received_on: NaiveDate::from_ymd_opt(2024, 5, 2),
        ..GoodsReceipt::default()
    }
}

#[tokio::test]
async fn test_created_documents_carry_consecutive_numbers() {
    let (store, documents) = documents_with_series().await;

    let mut tx = store.begin().await.unwrap();
    let first = documents
        .create_goods_receipt(&mut tx, receipt("Acme"), "clerk")
        .await
        .unwrap();
    let second = documents
        .create_goods_receipt(&mut tx, receipt("Globex"), "clerk")
        .await
        .unwrap();
    let order = documents
        .create_work_order(
            &mut tx,
            WorkOrder {
                title: "Inspect pallets".into(),
                priority: 2,
                ..WorkOrder::default()
            },
            "planner",
        )
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(first.number, "GR-2024-00001");
    assert_eq!(second.number, "GR-2024-00002");
    assert_eq!(order.number, "WO100");
    assert_eq!(first.audit.created_by, "clerk");

    let mut tx = store.begin().await.unwrap();
    let stored = documents.goods_receipts().get(&mut tx, second.id).await.unwrap();
    assert_eq!(stored.number, "GR-2024-00002");
    assert_eq!(stored.supplier, "Globex");
}

#[tokio::test]
async fn test_rolled_back_document_leaves_neither_row_nor_consumed_number() {
    let (store, documents) = documents_with_series().await;

    let mut tx = store.begin().await.unwrap();
    documents
        .create_goods_receipt(&mut tx, receipt("Acme"), "clerk")
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(store.row_count("goods_receipts").await, 0);

    let mut tx = store.begin().await.unwrap();
    let retry = documents
        .create_goods_receipt(&mut tx, receipt("Acme"), "clerk")
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(retry.number, "GR-2024-00001");
}

#[tokio::test]
async fn test_document_number_is_not_editable() {
    let (store, documents) = documents_with_series().await;

    let mut tx = store.begin().await.unwrap();
    let created = documents
        .create_goods_receipt(&mut tx, receipt("Acme"), "clerk")
        .await
        .unwrap();

    let outcome = documents
        .goods_receipts()
        .update(
            &mut tx,
            created.id,
            &GoodsReceipt {
                number: "GR-HACKED".into(),
                quantity: 45,
                audit: AuditFields::token(created.audit.modified_at),
                ..GoodsReceipt::default()
            },
            "clerk",
        )
        .await
        .unwrap();
    assert_eq!(outcome.fields, vec!["quantity"]);
    assert_eq!(outcome.entity.number, "GR-2024-00001");
}

#[tokio::test]
async fn test_missing_series_fails_creation() {
    let store = MemoryStore::new();
    let documents = DocumentService::with_clock(Arc::new(ManualClock::new(Utc::now())));

    let mut tx = store.begin().await.unwrap();
    let err = documents
        .create_goods_receipt(&mut tx, receipt("Acme"), "clerk")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_run_in_transaction_commits_on_success() {
    let (store, documents) = documents_with_series().await;

    let worker = documents.clone();
    let created = run_in_transaction(&store, move |tx| {
        Box::pin(async move { worker.create_goods_receipt(tx, receipt("Acme"), "clerk").await })
    })
    .await
    .unwrap();

    let mut tx = store.begin().await.unwrap();
    assert!(documents.goods_receipts().find(&mut tx, created.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_run_in_transaction_rolls_back_on_error() {
    let (store, documents) = documents_with_series().await;

    let worker = documents.clone();
    let err = run_in_transaction(&store, move |tx| {
        Box::pin(async move {
            worker.create_goods_receipt(tx, receipt("Acme"), "clerk").await?;
            Err::<(), _>(DocketError::InvalidDefinition("abandoned".into()))
        })
    })
    .await
    .unwrap_err();
    assert!(matches!(err, DocketError::InvalidDefinition(_)));

    assert_eq!(store.row_count("goods_receipts").await, 0);
    assert_eq!(store.locked_rows(), 0);
    let mut tx = store.begin().await.unwrap();
    let series = documents.sequences().store().get(&mut tx, GOODS_RECEIPT_MODULE).await.unwrap();
    assert_eq!(series.last_number, 0);
}

#[tokio::test]
async fn test_dropped_transaction_releases_lock() {
    let store = MemoryStore::with_lock_timeout(Some(Duration::from_millis(50)));
    let documents = DocumentService::with_clock(Arc::new(ManualClock::new(Utc::now())));
    let mut tx = store.begin().await.unwrap();
    documents
        .sequences()
        .store()
        .define(&mut tx, GOODS_RECEIPT_MODULE, "#", 0, "admin")
        .await
        .unwrap();
    tx.commit().await.unwrap();

    {
        let mut abandoned = store.begin().await.unwrap();
        documents
            .sequences()
            .next_number_by_module(&mut abandoned, GOODS_RECEIPT_MODULE)
            .await
            .unwrap();
    }

    let mut tx = store.begin().await.unwrap();
    assert_eq!(
        documents
            .sequences()
            .next_number_by_module(&mut tx, GOODS_RECEIPT_MODULE)
            .await
            .unwrap(),
        "1"
    );
}

#[tokio::test]
async fn test_facade_issues_previews_and_updates() {
    let docket = Docket::new(
        MemoryStore::new(),
        DocketConfig::default().system_actor("setup"),
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())),
    )
    .unwrap();
    let defined = docket.define_sequence("PO", "PO-#####", 10).await.unwrap();
    assert_eq!(defined.audit.created_by, "setup");

    let mut tx = docket.begin().await.unwrap();
    assert_eq!(docket.sequences().preview(&mut tx, "PO").await.unwrap(), "PO-00011");
    assert_eq!(docket.sequences().preview(&mut tx, "PO").await.unwrap(), "PO-00011");
    tx.commit().await.unwrap();

    assert_eq!(docket.next_number("PO").await.unwrap(), "PO-00011");

    let mut tx = docket.begin().await.unwrap();
    assert_eq!(docket.next_number_in(&mut tx, "PO").await.unwrap(), "PO-00012");
    tx.rollback().await.unwrap();
    assert_eq!(docket.next_number("PO").await.unwrap(), "PO-00012");

    let err = docket.define_sequence("PO", "PO-#", 0).await.unwrap_err();
    assert!(matches!(
        err,
        DocketError::Store(docket::StoreError::DuplicateKey { .. })
    ));
    let err = docket.next_number("XX").await.unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_facade_rejects_invalid_config() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let err = Docket::new(
        MemoryStore::new(),
        DocketConfig::default().placeholder('0'),
        clock.clone(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, DocketError::Config(_)));

    let err = Docket::new(MemoryStore::new(), DocketConfig::default().system_actor(""), clock)
        .err()
        .unwrap();
    assert!(matches!(err, DocketError::Config(_)));
}

#[tokio::test]
async fn test_facade_update_rolls_back_on_conflict() {
    let docket = Docket::in_memory();
    docket
        .define_sequence(GOODS_RECEIPT_MODULE, "GR#", 0)
        .await
        .unwrap();

    let mut tx = docket.begin().await.unwrap();
    let created = docket
        .documents()
        .create_goods_receipt(&mut tx, receipt("Acme"), "clerk")
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let stale = GoodsReceipt {
        remarks: Some("late".into()),
        audit: AuditFields::default(),
        ..GoodsReceipt::default()
    };
    let err = docket.update(created.id, &stale, "clerk").await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(docket.store().locked_rows(), 0);

    let fresh = GoodsReceipt {
        remarks: Some("checked".into()),
        audit: AuditFields::token(created.audit.modified_at),
        ..GoodsReceipt::default()
    };
    let outcome = docket.update(created.id, &fresh, "clerk").await.unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.entity.remarks.as_deref(), Some("checked"));
}

//! Integration tests covering the concrete scenarios and testable
//! properties named in the specification (S1-S6 and selected invariants).

use lead_engine::assignment::AssignmentEngine;
use lead_engine::audit::NullNotificationSink;
use lead_engine::config::{effective_auto_approve, AutoApproveDecision};
use lead_engine::deposit::{CustomerType, DepositLedger};
use lead_engine::download_request::{DownloadRequestState, DownloadRequestWorkflow};
use lead_engine::ids::{DatabaseId, ProductId, StaffId};
use lead_engine::money::Money;
use lead_engine::record::{Collection, InvalidReason, Record, RecordStatus, RecordStore};
use lead_engine::reservation::ReservationRegistry;
use lead_engine::resolver::ConflictResolver;
use lead_engine::row_data::RowData;
use chrono::NaiveDate;
use std::sync::Arc;

fn row(column: &str, value: &str) -> RowData {
    let mut r = RowData::new();
    r.insert(column, value);
    r
}

fn harness() -> (Arc<ReservationRegistry>, Arc<RecordStore>, ConflictResolver) {
    let registry = Arc::new(ReservationRegistry::new(Arc::new(NullNotificationSink)));
    let records = Arc::new(RecordStore::new());
    let resolver = ConflictResolver::new(registry.clone(), records.clone(), Arc::new(NullNotificationSink));
    (registry, records, resolver)
}

#[tokio::test]
async fn s1_out_of_order_ndp() {
    let ledger = DepositLedger::new();
    let staff = StaffId::new();
    let product = ProductId::new();

    let later = ledger.insert(staff, product, "SYAH", NaiveDate::from_ymd_opt(2025, 2, 9).unwrap(), Money::from_cents(100), "").await.unwrap();
    assert_eq!(ledger.get(later).await.unwrap().customer_type, CustomerType::Ndp);

    let earlier = ledger.insert(staff, product, "SYAH", NaiveDate::from_ymd_opt(2025, 2, 7).unwrap(), Money::from_cents(100), "").await.unwrap();

    assert_eq!(ledger.get(earlier).await.unwrap().customer_type, CustomerType::Ndp);
    assert_eq!(ledger.get(later).await.unwrap().customer_type, CustomerType::Rdp);
}

#[tokio::test]
async fn s2_tambahan_never_ndp() {
    let ledger = DepositLedger::new();
    let id = ledger
        .insert(StaffId::new(), ProductId::new(), "ALICE", NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), Money::from_cents(500), "depo tambahan")
        .await
        .unwrap();
    assert_eq!(ledger.get(id).await.unwrap().customer_type, CustomerType::Rdp);
}

#[tokio::test]
async fn s3_cross_product_customer_keeps_staff_and_product_sums_equal() {
    use lead_engine::aggregator::aggregate;

    let ledger = DepositLedger::new();
    let staff = StaffId::new();
    let p1 = ProductId::new();
    let p2 = ProductId::new();
    let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

    ledger.insert(staff, p1, "C", date, Money::from_cents(100), "").await.unwrap();
    ledger.insert(staff, p2, "C", date, Money::from_cents(100), "").await.unwrap();

    let deposits = ledger.by_date(date).await;
    let report = aggregate(&deposits);

    assert_eq!(report.total_ndp_by_staff(), report.total_ndp_by_product());
    assert_eq!(report.total_ndp_by_staff(), 1);
}

#[tokio::test]
async fn s4_reservation_invalidates_another_staffs_assigned_record() {
    let (registry, records, resolver) = harness();
    let database = DatabaseId::new();
    let product = ProductId::new();
    let staff_a = StaffId::new();
    let staff_b = StaffId::new();

    let mut r = Record::new(Collection::General, database, product, 1, row("user", "BOB"));
    r.status = RecordStatus::Assigned;
    r.assigned_to = Some(staff_a);
    let record_id = records.insert(r).await.unwrap();

    registry.create(Some("BOB".into()), None, product, staff_b, None, true, &resolver).await.unwrap();

    let invalidated = records.get(record_id).await.unwrap();
    assert_eq!(invalidated.status, RecordStatus::Invalid);
    assert_eq!(invalidated.invalid_reason, Some(InvalidReason::ReservedByOtherStaff));
}

#[tokio::test]
async fn s5_auto_approve_matrix() {
    assert_eq!(effective_auto_approve(true, Some(false)), AutoApproveDecision::Pending);
    assert_eq!(effective_auto_approve(true, Some(true)), AutoApproveDecision::Approved);

    let records = Arc::new(RecordStore::new());
    let registry = Arc::new(ReservationRegistry::new(Arc::new(NullNotificationSink)));
    let database = DatabaseId::new();
    let product = ProductId::new();
    for i in 1..=3u64 {
        records.insert(Record::new(Collection::General, database, product, i, row("user", &format!("u{i}")))).await.unwrap();
    }
    let assignment = Arc::new(AssignmentEngine::new(records.clone(), registry));
    let workflow = DownloadRequestWorkflow::new(assignment, Arc::new(NullNotificationSink));

    let pending_id = workflow.submit(StaffId::new(), database, 3, true, Some(false)).await.unwrap();
    assert_eq!(workflow.get(pending_id).await.unwrap().state, DownloadRequestState::Pending);

    let approved_id = workflow.submit(StaffId::new(), database, 3, true, Some(true)).await.unwrap();
    let approved = workflow.get(approved_id).await.unwrap();
    assert_eq!(approved.state, DownloadRequestState::Completed);
    assert_eq!(approved.assigned_records.len(), 3);
}

#[tokio::test]
async fn s6_idempotent_repair() {
    use lead_engine::health::HealthInspector;
    use std::collections::HashMap;

    let (_registry, records, resolver) = harness();
    let resolver = Arc::new(resolver);
    let database = DatabaseId::new();
    let product = ProductId::new();

    let corrupted = Record::new(Collection::Bonanza, database, product, 1, row("user", "nobody"));
    let record_id = records.insert(corrupted).await.unwrap();
    records.reserve(record_id, StaffId::new()).await.unwrap();

    let inspector = HealthInspector::new(records.clone(), resolver);
    let first = inspector.repair(&HashMap::new()).await.unwrap();
    assert_eq!(records.get(record_id).await.unwrap().status, RecordStatus::Available);
    assert_eq!(first.records_reconciled, 1);

    let second = inspector.repair(&HashMap::new()).await.unwrap();
    assert_eq!(second.records_reconciled, 0);
}

#[tokio::test]
async fn property_full_resync_is_idempotent_after_round_trip_create_delete() {
    let (registry, records, resolver) = harness();
    let database = DatabaseId::new();
    let product = ProductId::new();
    records.insert(Record::new(Collection::General, database, product, 1, row("user", "bob"))).await.unwrap();

    let id = registry.create(Some("bob".into()), None, product, StaffId::new(), None, true, &resolver).await.unwrap();
    registry.delete(id, &resolver).await.unwrap();

    let first = resolver.full_resync().await.unwrap();
    let second = resolver.full_resync().await.unwrap();
    assert_eq!(first.marked_reserved, 0);
    assert_eq!(first.marked_available, 0);
    assert_eq!(second.marked_reserved, 0);
    assert_eq!(second.marked_available, 0);
}

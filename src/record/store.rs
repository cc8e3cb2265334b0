//! Record Store (spec.md §4.C). Three logical collections share this one
//! store; `Record::collection` is the only discriminator, so cross-store
//! queries used by the Conflict Resolver and Health & Repair work uniformly.

use super::types::{Collection, InvalidReason, Record, RecordStatus, RespondStatus, WhatsappStatus};
use crate::error::{Error, Result};
use crate::ids::{DatabaseId, RecordId, StaffId};
use crate::normalize;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<RecordId, Record>,
    /// (database_id, row_number) -> record id; enforces uniqueness.
    row_index: HashMap<(DatabaseId, u64), RecordId>,
}

#[derive(Debug, Default)]
pub struct RecordStore {
    inner: RwLock<Inner>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: Record) -> Result<RecordId> {
        let mut inner = self.inner.write().await;
        let row_key = (record.database_id, record.row_number);
        if inner.row_index.contains_key(&row_key) {
            return Err(Error::conflict(format!("row {} already exists for database {}", record.row_number, record.database_id)));
        }
        let id = record.id;
        inner.row_index.insert(row_key, id);
        inner.records.insert(id, record);
        Ok(id)
    }

    pub async fn get(&self, id: RecordId) -> Option<Record> {
        self.inner.read().await.records.get(&id).cloned()
    }

    pub async fn by_database_status(&self, database_id: DatabaseId, status: RecordStatus) -> Vec<Record> {
        self.inner.read().await.records.values().filter(|r| r.database_id == database_id && r.status == status).cloned().collect()
    }

    pub async fn by_staff_status(&self, staff_id: StaffId, status: RecordStatus) -> Vec<Record> {
        self.inner.read().await.records.values().filter(|r| r.assigned_to == Some(staff_id) && r.status == status).cloned().collect()
    }

    pub async fn all_with_status(&self, status: RecordStatus) -> Vec<Record> {
        self.inner.read().await.records.values().filter(|r| r.status == status).cloned().collect()
    }

    /// Records of the given status whose row values intersect `keys`
    /// (any-value-any-field matching, spec.md §4.A).
    pub async fn matching(&self, status: RecordStatus, keys: &HashSet<String>) -> Vec<Record> {
        self.inner
            .read()
            .await
            .records
            .values()
            .filter(|r| r.status == status)
            .filter(|r| normalize::matches(&normalize::record_keys(&r.row_data), keys))
            .cloned()
            .collect()
    }

    pub async fn set_status(&self, id: RecordId, status: RecordStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        let record = inner.records.get_mut(&id).ok_or_else(|| Error::not_found(format!("record {id} not found")))?;
        record.status = status;
        Ok(())
    }

    pub async fn reserve(&self, id: RecordId, staff_id: StaffId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let record = inner.records.get_mut(&id).ok_or_else(|| Error::not_found(format!("record {id} not found")))?;
        record.status = RecordStatus::Reserved;
        record.reserved_by = Some(staff_id);
        Ok(())
    }

    pub async fn unreserve(&self, id: RecordId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let record = inner.records.get_mut(&id).ok_or_else(|| Error::not_found(format!("record {id} not found")))?;
        record.status = RecordStatus::Available;
        record.reserved_by = None;
        Ok(())
    }

    pub async fn assign(&self, id: RecordId, staff_id: StaffId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let record = inner.records.get_mut(&id).ok_or_else(|| Error::not_found(format!("record {id} not found")))?;
        record.status = RecordStatus::Assigned;
        record.assigned_to = Some(staff_id);
        record.assigned_at = Some(Utc::now());
        Ok(())
    }

    pub async fn invalidate(&self, id: RecordId, reason: InvalidReason) -> Result<()> {
        let mut inner = self.inner.write().await;
        let record = inner.records.get_mut(&id).ok_or_else(|| Error::not_found(format!("record {id} not found")))?;
        if record.assigned_to.is_none() {
            return Err(Error::internal(format!("record {id} invalidated with no assignee")));
        }
        record.status = RecordStatus::Invalid;
        record.invalid_reason = Some(reason);
        Ok(())
    }

    pub async fn archive(&self, id: RecordId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let record = inner.records.get_mut(&id).ok_or_else(|| Error::not_found(format!("record {id} not found")))?;
        record.status = RecordStatus::Archived;
        record.assigned_to = None;
        Ok(())
    }

    pub async fn set_contact_status(&self, id: RecordId, whatsapp: Option<WhatsappStatus>, respond: Option<RespondStatus>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let record = inner.records.get_mut(&id).ok_or_else(|| Error::not_found(format!("record {id} not found")))?;
        if let Some(w) = whatsapp {
            record.whatsapp_status = Some(w);
        }
        if let Some(r) = respond {
            record.respond_status = Some(r);
        }
        Ok(())
    }

    pub async fn bulk_delete(&self, ids: &[RecordId]) {
        let mut inner = self.inner.write().await;
        for id in ids {
            if let Some(record) = inner.records.remove(id) {
                inner.row_index.remove(&(record.database_id, record.row_number));
            }
        }
    }

    pub async fn count_by_status(&self, database_id: DatabaseId) -> HashMap<RecordStatus, usize> {
        let inner = self.inner.read().await;
        let mut counts = HashMap::new();
        for record in inner.records.values().filter(|r| r.database_id == database_id) {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        counts
    }

    pub async fn by_collection(&self, collection: Collection) -> Vec<Record> {
        self.inner.read().await.records.values().filter(|r| r.collection == collection).cloned().collect()
    }

    pub async fn database_exists(&self, database_id: DatabaseId, known_databases: &HashSet<DatabaseId>) -> bool {
        known_databases.contains(&database_id)
    }
}

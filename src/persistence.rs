//! Persistence abstraction (spec.md §6 "Persisted state layout"). The
//! engine's in-memory stores already satisfy these contracts; a later
//! database-backed implementation can replace them without touching call
//! sites that only depend on the trait.
//!
//! Scoped to the two collections whose persistence concerns are purely
//! storage (no cross-component synchronization): the Record Store and the
//! Deposit Ledger. The Reservation Registry is left as a concrete engine
//! collaborator because its writes are inseparable from Conflict Resolver
//! ordering (spec.md §4.D); wrapping it behind a generic repository trait
//! would hide that ordering guarantee from callers.

use crate::deposit::Deposit;
use crate::error::Result;
use crate::ids::{DatabaseId, DepositId, ProductId, RecordId, StaffId};
use crate::money::Money;
use crate::record::{Record, RecordStatus};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;

#[async_trait]
pub trait RecordRepository: std::fmt::Debug + Send + Sync {
    async fn insert(&self, record: Record) -> Result<RecordId>;
    async fn get(&self, id: RecordId) -> Option<Record>;
    async fn by_database_status(&self, database_id: DatabaseId, status: RecordStatus) -> Vec<Record>;
    async fn by_staff_status(&self, staff_id: StaffId, status: RecordStatus) -> Vec<Record>;
    async fn matching(&self, status: RecordStatus, keys: &HashSet<String>) -> Vec<Record>;
}

#[async_trait]
impl RecordRepository for crate::record::RecordStore {
    async fn insert(&self, record: Record) -> Result<RecordId> {
        crate::record::RecordStore::insert(self, record).await
    }

    async fn get(&self, id: RecordId) -> Option<Record> {
        crate::record::RecordStore::get(self, id).await
    }

    async fn by_database_status(&self, database_id: DatabaseId, status: RecordStatus) -> Vec<Record> {
        crate::record::RecordStore::by_database_status(self, database_id, status).await
    }

    async fn by_staff_status(&self, staff_id: StaffId, status: RecordStatus) -> Vec<Record> {
        crate::record::RecordStore::by_staff_status(self, staff_id, status).await
    }

    async fn matching(&self, status: RecordStatus, keys: &HashSet<String>) -> Vec<Record> {
        crate::record::RecordStore::matching(self, status, keys).await
    }
}

#[async_trait]
pub trait DepositRepository: std::fmt::Debug + Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn insert(&self, staff_id: StaffId, product_id: ProductId, customer_id: String, record_date: NaiveDate, nominal: Money, notes: String) -> Result<DepositId>;
    async fn get(&self, id: DepositId) -> Option<Deposit>;
    async fn by_date(&self, date: NaiveDate) -> Vec<Deposit>;
}

#[async_trait]
impl DepositRepository for crate::deposit::DepositLedger {
    async fn insert(&self, staff_id: StaffId, product_id: ProductId, customer_id: String, record_date: NaiveDate, nominal: Money, notes: String) -> Result<DepositId> {
        crate::deposit::DepositLedger::insert(self, staff_id, product_id, customer_id, record_date, nominal, notes).await
    }

    async fn get(&self, id: DepositId) -> Option<Deposit> {
        crate::deposit::DepositLedger::get(self, id).await
    }

    async fn by_date(&self, date: NaiveDate) -> Vec<Deposit> {
        crate::deposit::DepositLedger::by_date(self, date).await
    }
}

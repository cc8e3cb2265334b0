//! Deposit Ledger (spec.md §4.G). Append-only deposits; every write
//! recomputes classification for the affected recompute-key(s) before the
//! write is visible to any other reader.

use super::classifier::classify;
use super::types::{CustomerType, Deposit};
use crate::error::{Error, Result};
use crate::ids::{DepositId, ProductId, StaffId};
use crate::money::Money;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    deposits: HashMap<DepositId, Deposit>,
    next_insertion_order: u64,
}

impl Inner {
    fn recompute(&mut self, key: &(String, ProductId)) {
        let members: Vec<Deposit> = self.deposits.values().filter(|d| &d.recompute_key() == key).cloned().collect();
        let classification = classify(&members);
        for (id, customer_type) in classification {
            if let Some(d) = self.deposits.get_mut(&id) {
                d.customer_type = customer_type;
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct DepositLedger {
    inner: RwLock<Inner>,
}

impl DepositLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, staff_id: StaffId, product_id: ProductId, customer_id: impl Into<String>, record_date: NaiveDate, nominal: Money, notes: impl Into<String>) -> Result<DepositId> {
        let mut inner = self.inner.write().await;
        let id = DepositId::new();
        let insertion_order = inner.next_insertion_order;
        inner.next_insertion_order += 1;
        let deposit = Deposit {
            id,
            staff_id,
            product_id,
            customer_id: customer_id.into(),
            record_date,
            nominal,
            notes: notes.into(),
            customer_type: CustomerType::Rdp,
            insertion_order,
        };
        let key = deposit.recompute_key();
        inner.deposits.insert(id, deposit);
        inner.recompute(&key);
        Ok(id)
    }

    /// Updates mutable fields on a deposit. Editing `record_date`,
    /// `customer_id`, or `notes` can move a deposit between recompute-keys,
    /// so both the old and new keys are recomputed.
    pub async fn update(
        &self,
        id: DepositId,
        customer_id: Option<String>,
        record_date: Option<NaiveDate>,
        nominal: Option<Money>,
        notes: Option<String>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let old_key = {
            let deposit = inner.deposits.get(&id).ok_or_else(|| Error::not_found(format!("deposit {id} not found")))?;
            deposit.recompute_key()
        };

        {
            let deposit = inner.deposits.get_mut(&id).expect("checked above");
            if let Some(c) = customer_id {
                deposit.customer_id = c;
            }
            if let Some(d) = record_date {
                deposit.record_date = d;
            }
            if let Some(n) = nominal {
                deposit.nominal = n;
            }
            if let Some(n) = notes {
                deposit.notes = n;
            }
        }

        let new_key = inner.deposits.get(&id).expect("checked above").recompute_key();
        inner.recompute(&old_key);
        if new_key != old_key {
            inner.recompute(&new_key);
        }
        Ok(())
    }

    pub async fn delete(&self, id: DepositId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let deposit = inner.deposits.remove(&id).ok_or_else(|| Error::not_found(format!("deposit {id} not found")))?;
        let key = deposit.recompute_key();
        inner.recompute(&key);
        Ok(())
    }

    pub async fn get(&self, id: DepositId) -> Option<Deposit> {
        self.inner.read().await.deposits.get(&id).cloned()
    }

    pub async fn by_date(&self, date: NaiveDate) -> Vec<Deposit> {
        self.inner.read().await.deposits.values().filter(|d| d.record_date == date).cloned().collect()
    }

    pub async fn all(&self) -> Vec<Deposit> {
        self.inner.read().await.deposits.values().cloned().collect()
    }
}

use crate::ids::{DepositId, ProductId, StaffId};
use crate::money::Money;
use crate::normalize;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerType {
    Ndp,
    Rdp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub id: DepositId,
    pub staff_id: StaffId,
    pub product_id: ProductId,
    pub customer_id: String,
    pub record_date: NaiveDate,
    pub nominal: Money,
    pub notes: String,
    pub customer_type: CustomerType,
    /// Monotonic write order, used to break (record_date) ties deterministically.
    pub insertion_order: u64,
}

impl Deposit {
    pub fn normalized_customer_id(&self) -> String {
        normalize::normalize(&self.customer_id).unwrap_or_default()
    }

    /// "tambahan" is matched case-insensitively anywhere in `notes`
    /// (spec.md §9: deliberately permissive, not token-bounded).
    pub fn is_tambahan(&self) -> bool {
        self.notes.to_lowercase().contains("tambahan")
    }

    pub fn recompute_key(&self) -> (String, ProductId) {
        (self.normalized_customer_id(), self.product_id)
    }
}

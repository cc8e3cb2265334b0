//! DatabaseDescriptor (spec.md §3).

use crate::config::AutoApproveOverride;
use crate::ids::{DatabaseId, ProductId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    pub id: DatabaseId,
    pub name: String,
    pub product_id: ProductId,
    pub auto_approve_override: AutoApproveOverride,
    pub total_records: u64,
}

impl DatabaseDescriptor {
    pub fn new(name: impl Into<String>, product_id: ProductId) -> Self {
        Self { id: DatabaseId::new(), name: name.into(), product_id, auto_approve_override: None, total_records: 0 }
    }
}

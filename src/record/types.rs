use crate::ids::{DatabaseId, ProductId, RecordId, StaffId};
use crate::row_data::RowData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collection {
    General,
    Bonanza,
    MemberWd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Available,
    Reserved,
    Assigned,
    Invalid,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidReason {
    ReservedByOtherStaff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhatsappStatus {
    Ada,
    Ceklis1,
    Tidak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RespondStatus {
    Ya,
    Tidak,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub collection: Collection,
    pub database_id: DatabaseId,
    pub product_id: ProductId,
    pub row_number: u64,
    pub row_data: RowData,
    pub status: RecordStatus,
    pub assigned_to: Option<StaffId>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub invalid_reason: Option<InvalidReason>,
    pub whatsapp_status: Option<WhatsappStatus>,
    pub respond_status: Option<RespondStatus>,
    pub reserved_by: Option<StaffId>,
}

impl Record {
    pub fn new(collection: Collection, database_id: DatabaseId, product_id: ProductId, row_number: u64, row_data: RowData) -> Self {
        Self {
            id: RecordId::new(),
            collection,
            database_id,
            product_id,
            row_number,
            row_data,
            status: RecordStatus::Available,
            assigned_to: None,
            assigned_at: None,
            invalid_reason: None,
            whatsapp_status: None,
            respond_status: None,
            reserved_by: None,
        }
    }

    /// `assigned_to` is non-null iff status ∈ {assigned, invalid} (spec.md §3).
    pub fn invariant_assigned_to_matches_status(&self) -> bool {
        let should_have_assignee = matches!(self.status, RecordStatus::Assigned | RecordStatus::Invalid);
        self.assigned_to.is_some() == should_have_assignee
    }
}

//! Download-Request Workflow (spec.md §4.F).

use crate::assignment::AssignmentEngine;
use crate::audit::{AuditEvent, NotificationSink};
use crate::config::{effective_auto_approve, AutoApproveOverride};
use crate::error::{Error, Result};
use crate::ids::{DatabaseId, DownloadRequestId, RecordId, StaffId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadRequestState {
    Pending,
    Approved,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub id: DownloadRequestId,
    pub staff_id: StaffId,
    pub database_id: DatabaseId,
    pub count: usize,
    pub state: DownloadRequestState,
    pub created_at: DateTime<Utc>,
    pub assigned_records: Vec<RecordId>,
}

/// An append-only record of a completed download, kept for audit/history
/// purposes (spec.md §3 supplement: the original's `DownloadHistory`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadHistoryEntry {
    pub request_id: DownloadRequestId,
    pub staff_id: StaffId,
    pub database_id: DatabaseId,
    pub record_count: usize,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    requests: HashMap<DownloadRequestId, DownloadRequest>,
    history: Vec<DownloadHistoryEntry>,
}

#[derive(Debug)]
pub struct DownloadRequestWorkflow {
    inner: RwLock<Inner>,
    assignment: Arc<AssignmentEngine>,
    notifications: Arc<dyn NotificationSink>,
}

impl DownloadRequestWorkflow {
    pub fn new(assignment: Arc<AssignmentEngine>, notifications: Arc<dyn NotificationSink>) -> Self {
        Self { inner: RwLock::new(Inner::default()), assignment, notifications }
    }

    /// Submits a request. If the effective auto-approve decision is
    /// `Approved`, immediately assigns `count` records and marks the request
    /// `completed`; otherwise the request is queued `pending`.
    pub async fn submit(
        &self,
        staff_id: StaffId,
        database_id: DatabaseId,
        count: usize,
        global_auto_approve: bool,
        per_database_override: AutoApproveOverride,
    ) -> Result<DownloadRequestId> {
        let id = DownloadRequestId::new();
        let mut request = DownloadRequest {
            id,
            staff_id,
            database_id,
            count,
            state: DownloadRequestState::Pending,
            created_at: Utc::now(),
            assigned_records: Vec::new(),
        };

        let decision = effective_auto_approve(global_auto_approve, per_database_override);
        let completed_now = decision == crate::config::AutoApproveDecision::Approved;
        if completed_now {
            let assigned = self.assignment.assign_download_request(database_id, staff_id, count).await?;
            request.assigned_records = assigned;
            request.state = DownloadRequestState::Completed;
            self.notifications
                .send(AuditEvent::new("DownloadRequestApproved", "system", id.to_string(), json!({ "count": count, "auto": true })))
                .await;
        }

        let history_entry = completed_now.then(|| DownloadHistoryEntry {
            request_id: id,
            staff_id,
            database_id,
            record_count: request.assigned_records.len(),
            completed_at: Utc::now(),
        });

        let mut inner = self.inner.write().await;
        inner.requests.insert(id, request);
        if let Some(entry) = history_entry {
            inner.history.push(entry);
        }
        Ok(id)
    }

    /// Admin approval of a still-pending request: triggers the Assignment
    /// Engine and transitions to `completed`.
    pub async fn approve(&self, id: DownloadRequestId) -> Result<Vec<RecordId>> {
        let (staff_id, database_id, count) = {
            let inner = self.inner.read().await;
            let request = inner.requests.get(&id).ok_or_else(|| Error::not_found(format!("download request {id} not found")))?;
            if request.state != DownloadRequestState::Pending {
                return Err(Error::conflict(format!("download request {id} is not pending")));
            }
            (request.staff_id, request.database_id, request.count)
        };

        let assigned = self.assignment.assign_download_request(database_id, staff_id, count).await?;

        let mut inner = self.inner.write().await;
        if let Some(request) = inner.requests.get_mut(&id) {
            request.assigned_records = assigned.clone();
            request.state = DownloadRequestState::Completed;
        }
        inner.history.push(DownloadHistoryEntry { request_id: id, staff_id, database_id, record_count: assigned.len(), completed_at: Utc::now() });
        drop(inner);

        self.notifications
            .send(AuditEvent::new("DownloadRequestApproved", "admin", id.to_string(), json!({ "count": count, "auto": false })))
            .await;
        Ok(assigned)
    }

    pub async fn reject(&self, id: DownloadRequestId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let request = inner.requests.get_mut(&id).ok_or_else(|| Error::not_found(format!("download request {id} not found")))?;
        if request.state != DownloadRequestState::Pending {
            return Err(Error::conflict(format!("download request {id} is not pending")));
        }
        request.state = DownloadRequestState::Rejected;
        drop(inner);
        self.notifications.send(AuditEvent::new("DownloadRequestRejected", "admin", id.to_string(), json!({}))).await;
        Ok(())
    }

    pub async fn get(&self, id: DownloadRequestId) -> Option<DownloadRequest> {
        self.inner.read().await.requests.get(&id).cloned()
    }

    pub async fn pending(&self) -> Vec<DownloadRequest> {
        self.inner.read().await.requests.values().filter(|r| r.state == DownloadRequestState::Pending).cloned().collect()
    }

    /// Completed-download audit trail, most recent first.
    pub async fn history(&self) -> Vec<DownloadHistoryEntry> {
        let mut entries = self.inner.read().await.history.clone();
        entries.sort_by_key(|e| std::cmp::Reverse(e.completed_at));
        entries
    }
}

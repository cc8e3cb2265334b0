//! AuditEvent envelope and the notification/report-delivery collaborators
//! (spec.md §3 "AuditEvent", §6 "Notification adapter").

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub actor: String,
    pub subject: String,
    pub data: Value,
    pub ts: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_type: impl Into<String>, actor: impl Into<String>, subject: impl Into<String>, data: Value) -> Self {
        Self { event_type: event_type.into(), actor: actor.into(), subject: subject.into(), data, ts: Utc::now() }
    }
}

/// The notification adapter collaborator. The engine never blocks on
/// delivery: implementations that fail should log and let the adapter retry;
/// a send error from this trait is always swallowed by callers in this
/// crate, never propagated as an operation failure.
#[async_trait]
pub trait NotificationSink: std::fmt::Debug + Send + Sync {
    async fn send(&self, event: AuditEvent);
}

/// An in-memory sink suitable for tests and for wiring to a real adapter:
/// events are pushed onto an unbounded channel for a consumer to drain.
#[derive(Debug, Clone)]
pub struct ChannelNotificationSink {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl ChannelNotificationSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelNotificationSink {
    async fn send(&self, event: AuditEvent) {
        if self.tx.send(event).is_err() {
            log::warn!("notification sink receiver dropped; event discarded");
        }
    }
}

/// A sink that discards every event; useful when a caller has no interest in
/// notifications (e.g. pure unit tests of classifier/aggregator logic).
#[derive(Debug, Clone, Default)]
pub struct NullNotificationSink;

#[async_trait]
impl NotificationSink for NullNotificationSink {
    async fn send(&self, _event: AuditEvent) {}
}

/// The report-delivery collaborator for the Daily Aggregator (spec.md §6):
/// a separate concern from `NotificationSink` because a report is a full
/// document delivered on a schedule, not a discrete event.
#[async_trait]
pub trait ReportSink: std::fmt::Debug + Send + Sync {
    async fn deliver(&self, date: chrono::NaiveDate, report: &crate::aggregator::DailyReport);
}

#[derive(Debug, Clone, Default)]
pub struct NullReportSink;

#[async_trait]
impl ReportSink for NullReportSink {
    async fn deliver(&self, _date: chrono::NaiveDate, _report: &crate::aggregator::DailyReport) {}
}

//! Persisted configuration singletons (spec.md §6 "Persisted state layout",
//! §4.J Scheduler, §4.F Download-Request Workflow).
//!
//! Configuration documents are read on startup and on change, addressed by
//! well-known ids; unlike operational state they are not a hot read/write
//! path.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Tri-state auto-approve override: `None` follows the global setting,
/// `Some(true|false)` overrides it for one database.
pub type AutoApproveOverride = Option<bool>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GracePeriodConfig {
    /// Global default grace period, in days, before a non-permanent
    /// approved reservation expires.
    pub default_grace_days: i64,
}

impl Default for GracePeriodConfig {
    fn default() -> Self {
        Self { default_grace_days: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Local time-of-day the daily report job fires (Asia/Jakarta).
    pub daily_report_at: NaiveTime,
    /// Hours between health-check runs.
    pub health_check_interval_hours: u32,
    pub grace_period: GracePeriodConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_report_at: NaiveTime::from_hms_opt(1, 0, 0).expect("valid constant time"),
            health_check_interval_hours: 6,
            grace_period: GracePeriodConfig::default(),
        }
    }
}

/// Effective auto-approve decision for a staff submission, per spec.md §4.F.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoApproveDecision {
    Pending,
    Approved,
}

/// Computes the effective decision from the global flag and a database's
/// override, per the table in spec.md §4.F.
pub fn effective_auto_approve(global_enabled: bool, per_database: AutoApproveOverride) -> AutoApproveDecision {
    match (global_enabled, per_database) {
        (false, _) => AutoApproveDecision::Pending,
        (true, Some(false)) => AutoApproveDecision::Pending,
        (true, None) | (true, Some(true)) => AutoApproveDecision::Approved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_approve_matrix_matches_spec_table() {
        assert_eq!(effective_auto_approve(false, None), AutoApproveDecision::Pending);
        assert_eq!(effective_auto_approve(false, Some(true)), AutoApproveDecision::Pending);
        assert_eq!(effective_auto_approve(true, None), AutoApproveDecision::Approved);
        assert_eq!(effective_auto_approve(true, Some(true)), AutoApproveDecision::Approved);
        assert_eq!(effective_auto_approve(true, Some(false)), AutoApproveDecision::Pending);
    }
}

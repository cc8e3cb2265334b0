use crate::ids::{ProductId, ReservationId, StaffId};
use crate::normalize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationState {
    Pending,
    Approved,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub product_id: ProductId,
    pub staff_id: StaffId,
    pub phone: Option<String>,
    pub state: ReservationState,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub is_permanent: bool,
    pub grace_days_override: Option<i64>,
}

impl Reservation {
    /// The reservation key set: normalized non-empty values among
    /// `customer_id`/`customer_name` (spec.md §4.A).
    pub fn key_set(&self) -> HashSet<String> {
        normalize::key_set([self.customer_id.as_deref().unwrap_or(""), self.customer_name.as_deref().unwrap_or("")])
    }

    pub fn is_approved(&self) -> bool {
        self.state == ReservationState::Approved
    }

    /// Effective grace window in days: product-level override takes
    /// precedence over the global default.
    pub fn effective_grace_days(&self, global_default_days: i64) -> i64 {
        self.grace_days_override.unwrap_or(global_default_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(customer_id: Option<&str>, customer_name: Option<&str>) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            customer_id: customer_id.map(str::to_string),
            customer_name: customer_name.map(str::to_string),
            product_id: ProductId::new(),
            staff_id: StaffId::new(),
            phone: None,
            state: ReservationState::Pending,
            created_at: Utc::now(),
            approved_at: None,
            is_permanent: false,
            grace_days_override: None,
        }
    }

    #[test]
    fn key_set_unions_both_slots() {
        let r = base(Some(" bob "), Some("Robert"));
        let keys = r.key_set();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("BOB"));
        assert!(keys.contains("ROBERT"));
    }

    #[test]
    fn key_set_ignores_empty_slot() {
        let r = base(Some("bob"), None);
        assert_eq!(r.key_set().len(), 1);
    }

    #[test]
    fn grace_days_prefers_override() {
        let mut r = base(Some("bob"), None);
        r.grace_days_override = Some(5);
        assert_eq!(r.effective_grace_days(30), 5);
        r.grace_days_override = None;
        assert_eq!(r.effective_grace_days(30), 30);
    }
}

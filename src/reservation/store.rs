//! Reservation Registry (spec.md §4.B).

use super::types::{Reservation, ReservationState};
use crate::audit::{AuditEvent, NotificationSink};
use crate::error::{Error, Result};
use crate::ids::{ProductId, ReservationId, StaffId};
use crate::resolver::ConflictResolver;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    reservations: HashMap<ReservationId, Reservation>,
    /// (product, normalized key) -> the approved reservation claiming it.
    /// Enforces "at most one approved reservation per (normalized-key, product)".
    approved_index: HashMap<(ProductId, String), ReservationId>,
}

#[derive(Debug)]
pub struct ReservationRegistry {
    inner: RwLock<Inner>,
    notifications: Arc<dyn NotificationSink>,
}

impl ReservationRegistry {
    pub fn new(notifications: Arc<dyn NotificationSink>) -> Self {
        Self { inner: RwLock::new(Inner::default()), notifications }
    }

    /// Checks whether any key in `keys` is already claimed by an *other*
    /// approved reservation under `product_id`. Two reservations differing
    /// only by empty-string keys still collide, because `key_set` already
    /// drops empty values before this check runs. Takes `inner` already
    /// locked so the check and the index insert it guards happen inside one
    /// write-lock critical section; a check made under a separately-acquired
    /// read lock would let two concurrent callers both pass it.
    fn conflicting_key(inner: &Inner, product_id: ProductId, keys: &std::collections::HashSet<String>, excluding: Option<ReservationId>) -> Option<ReservationId> {
        for key in keys {
            if let Some(&existing) = inner.approved_index.get(&(product_id, key.clone())) {
                if Some(existing) != excluding {
                    return Some(existing);
                }
            }
        }
        None
    }

    /// Creates a reservation. Admin callers (`is_admin_caller = true`)
    /// produce `approved` reservations immediately, triggering the Conflict
    /// Resolver's on-add before this call returns; staff callers produce
    /// `pending` reservations with no resolver side effects yet.
    pub async fn create(
        &self,
        customer_id: Option<String>,
        customer_name: Option<String>,
        product_id: ProductId,
        target_staff: StaffId,
        phone: Option<String>,
        is_admin_caller: bool,
        resolver: &ConflictResolver,
    ) -> Result<ReservationId> {
        let reservation_id = ReservationId::new();
        let now = Utc::now();
        let state = if is_admin_caller { ReservationState::Approved } else { ReservationState::Pending };
        let reservation = Reservation {
            id: reservation_id,
            customer_id,
            customer_name,
            product_id,
            staff_id: target_staff,
            phone,
            state,
            created_at: now,
            approved_at: if is_admin_caller { Some(now) } else { None },
            is_permanent: false,
            grace_days_override: None,
        };

        let keys = reservation.key_set();
        if keys.is_empty() {
            return Err(Error::validation("reservation requires a non-empty customer_id or customer_name"));
        }

        {
            let mut inner = self.inner.write().await;
            if is_admin_caller {
                if let Some(existing) = Self::conflicting_key(&inner, product_id, &keys, None) {
                    return Err(Error::conflict(format!("an approved reservation ({existing}) already claims one of these keys for this product")));
                }
                for key in &keys {
                    inner.approved_index.insert((product_id, key.clone()), reservation_id);
                }
            }
            inner.reservations.insert(reservation_id, reservation);
        }

        if is_admin_caller {
            resolver.on_add(reservation_id, product_id, target_staff, &keys).await?;
            self.notifications.send(AuditEvent::new("ReservationActivated", "system", reservation_id.to_string(), json!({ "product_id": product_id.0 }))).await;
        }

        Ok(reservation_id)
    }

    /// Transitions `pending -> approved`; emits `ReservationActivated` and
    /// runs the Conflict Resolver's on-add before returning.
    pub async fn approve(&self, id: ReservationId, resolver: &ConflictResolver) -> Result<()> {
        let (product_id, staff_id, keys) = {
            let mut inner = self.inner.write().await;

            let (product_id, staff_id, keys, state) = {
                let reservation = inner.reservations.get(&id).ok_or_else(|| Error::not_found(format!("reservation {id} not found")))?;
                (reservation.product_id, reservation.staff_id, reservation.key_set(), reservation.state)
            };
            if state != ReservationState::Pending {
                return Err(Error::conflict(format!("reservation {id} is not pending")));
            }
            if let Some(existing) = Self::conflicting_key(&inner, product_id, &keys, Some(id)) {
                return Err(Error::conflict(format!("an approved reservation ({existing}) already claims one of these keys for this product")));
            }

            let now = Utc::now();
            for key in &keys {
                inner.approved_index.insert((product_id, key.clone()), id);
            }
            if let Some(reservation) = inner.reservations.get_mut(&id) {
                reservation.state = ReservationState::Approved;
                reservation.approved_at = Some(now);
            }
            (product_id, staff_id, keys)
        };

        resolver.on_add(id, product_id, staff_id, &keys).await?;
        self.notifications.send(AuditEvent::new("ReservationActivated", "system", id.to_string(), json!({ "product_id": product_id.0 }))).await;
        Ok(())
    }

    /// Removes a reservation. If it was approved, runs the Conflict
    /// Resolver's on-remove before returning and emits
    /// `ReservationDeactivated`.
    pub async fn delete(&self, id: ReservationId, resolver: &ConflictResolver) -> Result<()> {
        let removed = {
            let mut inner = self.inner.write().await;
            let reservation = inner.reservations.remove(&id).ok_or_else(|| Error::not_found(format!("reservation {id} not found")))?;
            if reservation.is_approved() {
                for key in reservation.key_set() {
                    inner.approved_index.remove(&(reservation.product_id, key));
                }
            }
            reservation
        };

        if removed.is_approved() {
            resolver.on_remove(removed.product_id, &removed.key_set()).await?;
            self.notifications.send(AuditEvent::new("ReservationDeactivated", "system", id.to_string(), json!({ "product_id": removed.product_id.0 }))).await;
        }
        Ok(())
    }

    /// Marks an approved, non-permanent reservation as `expired` (grace
    /// period elapsed); otherwise behaves like `delete` with respect to the
    /// Conflict Resolver, but the reservation record is kept (not removed)
    /// so its history remains queryable.
    pub async fn expire(&self, id: ReservationId, resolver: &ConflictResolver) -> Result<()> {
        let (product_id, keys, is_permanent) = {
            let inner = self.inner.read().await;
            let reservation = inner.reservations.get(&id).ok_or_else(|| Error::not_found(format!("reservation {id} not found")))?;
            (reservation.product_id, reservation.key_set(), reservation.is_permanent)
        };
        if is_permanent {
            return Err(Error::conflict(format!("reservation {id} is permanent and cannot expire")));
        }

        {
            let mut inner = self.inner.write().await;
            for key in &keys {
                inner.approved_index.remove(&(product_id, key.clone()));
            }
            if let Some(reservation) = inner.reservations.get_mut(&id) {
                reservation.state = ReservationState::Expired;
            }
        }

        resolver.on_remove(product_id, &keys).await?;
        self.notifications.send(AuditEvent::new("ReservationExpired", "system", id.to_string(), json!({ "product_id": product_id.0 }))).await;
        Ok(())
    }

    pub async fn toggle_permanent(&self, id: ReservationId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let reservation = inner.reservations.get_mut(&id).ok_or_else(|| Error::not_found(format!("reservation {id} not found")))?;
        reservation.is_permanent = !reservation.is_permanent;
        Ok(reservation.is_permanent)
    }

    pub async fn get(&self, id: ReservationId) -> Option<Reservation> {
        self.inner.read().await.reservations.get(&id).cloned()
    }

    /// Approved, non-permanent reservations older than their effective grace
    /// window relative to `now`.
    pub async fn expire_candidates(&self, now: DateTime<Utc>, global_default_days: i64) -> Vec<ReservationId> {
        let inner = self.inner.read().await;
        inner
            .reservations
            .values()
            .filter(|r| r.is_approved() && !r.is_permanent)
            .filter(|r| {
                let Some(approved_at) = r.approved_at else { return false };
                let grace = chrono::Duration::days(r.effective_grace_days(global_default_days));
                now >= approved_at + grace
            })
            .map(|r| r.id)
            .collect()
    }

    /// All currently approved reservations, keyed by their reservation key
    /// set, for use by the Conflict Resolver's full-resync.
    pub async fn approved_snapshot(&self) -> Vec<(ReservationId, ProductId, StaffId, std::collections::HashSet<String>)> {
        let inner = self.inner.read().await;
        inner.reservations.values().filter(|r| r.is_approved()).map(|r| (r.id, r.product_id, r.staff_id, r.key_set())).collect()
    }
}

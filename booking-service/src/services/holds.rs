//! Reservation hold manager: turns a seat selection into a time-bounded
//! exclusive claim, and is the only component that consumes or releases one.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Gender, HoldToken, ReservationHold};
use crate::services::error::BookingError;
use crate::services::inventory::SeatInventory;

pub struct HoldManager {
    inventory: Arc<SeatInventory>,
    holds: DashMap<HoldToken, ReservationHold>,
}

impl HoldManager {
    pub fn new(inventory: Arc<SeatInventory>) -> Self {
        Self {
            inventory,
            holds: DashMap::new(),
        }
    }

    /// Claim every seat in `labels` for `ttl`, or nothing at all.
    ///
    /// Labels must be non-empty and distinct; membership in the schedule's
    /// layout is the caller's responsibility (an unknown label simply reads
    /// as unavailable here).
    pub fn create_hold(
        &self,
        schedule_id: Uuid,
        labels: &[String],
        ttl: Duration,
    ) -> Result<ReservationHold, BookingError> {
        if labels.is_empty() {
            return Err(BookingError::Validation(
                "at least one seat must be selected".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for label in labels {
            if !seen.insert(label.as_str()) {
                return Err(BookingError::Validation(format!(
                    "seat {label} selected more than once"
                )));
            }
        }

        let now = Utc::now();
        let hold = ReservationHold {
            token: HoldToken::new(),
            schedule_id,
            labels: labels.to_vec(),
            created_at: now,
            expires_at: now + ttl,
        };

        self.inventory
            .try_hold(schedule_id, labels, hold.token, hold.expires_at)?;
        self.holds.insert(hold.token, hold.clone());

        tracing::debug!(
            token = %hold.token,
            schedule_id = %schedule_id,
            seats = ?labels,
            expires_at = %hold.expires_at,
            "seat hold created"
        );
        crate::services::metrics::record_hold_created(labels.len());

        Ok(hold)
    }

    /// Return the hold's seats to the pool. A no-op, not an error, when the
    /// hold was already consumed, released or expired.
    pub fn release(&self, token: HoldToken) {
        if let Some((_, hold)) = self.holds.remove(&token) {
            let released = self
                .inventory
                .release(hold.schedule_id, &hold.labels, token);
            tracing::debug!(token = %token, released, "seat hold released");
        }
    }

    /// Convert the hold into sold seats, exactly once. Fails with
    /// `HoldExpired` when the TTL lapsed or the seats were re-held after a
    /// sweep.
    pub fn consume(
        &self,
        token: HoldToken,
        booking_id: Uuid,
        genders: &HashMap<String, Gender>,
    ) -> Result<ReservationHold, BookingError> {
        let Some(hold) = self.holds.get(&token).map(|h| h.clone()) else {
            return Err(BookingError::HoldExpired);
        };
        if hold.is_expired_at(Utc::now()) {
            self.holds.remove(&token);
            return Err(BookingError::HoldExpired);
        }

        self.inventory
            .confirm_sold(hold.schedule_id, &hold.labels, token, booking_id, genders)?;
        self.holds.remove(&token);

        tracing::info!(
            token = %token,
            booking_id = %booking_id,
            seats = ?hold.labels,
            "seat hold consumed"
        );
        Ok(hold)
    }

    /// Drop lapsed hold records and eagerly reclaim their seats. Lazy expiry
    /// keeps the engine correct even when this never runs.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let lapsed: Vec<HoldToken> = self
            .holds
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .map(|entry| *entry.key())
            .collect();
        for token in &lapsed {
            self.holds.remove(token);
        }
        let swept_seats = self.inventory.sweep_expired();
        if !lapsed.is_empty() || swept_seats > 0 {
            tracing::debug!(
                holds = lapsed.len(),
                seats = swept_seats,
                "expired holds swept"
            );
            crate::services::metrics::record_holds_expired(lapsed.len());
        }
        lapsed.len()
    }
}

//! Reservation holds: time-bounded exclusive claims on seats during checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token tying a hold to one checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HoldToken(Uuid);

impl HoldToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HoldToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HoldToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A claim on a set of seat labels for one schedule. Consumed exactly once
/// on payment confirmation, or released/expired back to the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationHold {
    pub token: HoldToken,
    pub schedule_id: Uuid,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ReservationHold {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

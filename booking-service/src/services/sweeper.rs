//! Background hold-expiry sweep.
//!
//! Keeps seat maps fresh by eagerly expiring lapsed holds and their
//! bookings. The engine stays correct without it: expiry is also enforced
//! lazily at every access.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::services::bookings::BookingService;

/// Spawn the periodic sweep. An `interval` of zero disables it (useful in
/// tests that need deterministic control over expiry).
pub fn spawn_sweeper(bookings: Arc<BookingService>, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        tracing::info!("hold expiry sweep disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let expired = bookings.expire_lapsed();
            if expired > 0 {
                tracing::info!(expired, "expiry sweep completed");
            }
        }
    }))
}

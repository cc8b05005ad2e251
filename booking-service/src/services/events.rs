//! In-process domain event fan-out.
//!
//! Ticketing and notification delivery are downstream consumers outside
//! this service; they subscribe to the bus and react to `BookingConfirmed`.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingConfirmed { booking_id: Uuid },
}

const DEFAULT_CAPACITY: usize = 256;

/// Publish/subscribe hub backed by `tokio::sync::broadcast`. Slow
/// subscribers observe `Lagged` rather than blocking publishers.
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. An event with zero receivers is
    /// dropped silently; confirmation state lives on the booking, not here.
    pub fn publish(&self, event: DomainEvent) {
        tracing::debug!(?event, "domain event published");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

//! Domain error taxonomy for the reservation and booking engine.

use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::booking::TransitionError;
use crate::models::BookingStatus;

#[derive(Debug, Error)]
pub enum BookingError {
    /// Malformed or inconsistent request; no state was changed.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("schedule {0} not found")]
    ScheduleNotFound(Uuid),

    #[error("booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("booking belongs to another user")]
    NotOwner,

    /// One or more requested seats were not in the expected prior state.
    /// The caller must re-select; nothing was held.
    #[error("seats unavailable: {}", labels.join(", "))]
    SeatUnavailable { labels: Vec<String> },

    /// The hold TTL lapsed before the operation could complete.
    #[error("seat hold expired")]
    HoldExpired,

    /// Webhook for an order this engine never issued. No side effects.
    #[error("unknown payment order {0}")]
    UnknownOrder(String),

    /// Order and booking amounts diverged between order creation and
    /// confirmation. Fatal; flagged for manual reconciliation.
    #[error("amount mismatch: order carries {order_paise} paise, booking expects {booking_paise}")]
    AmountMismatch { order_paise: u64, booking_paise: u64 },

    /// Transient gateway failure; safe to retry, no booking state changed.
    #[error("payment provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("cannot {action} a booking in state {actual}")]
    InvalidTransition {
        actual: BookingStatus,
        action: &'static str,
    },
}

impl From<TransitionError> for BookingError {
    fn from(err: TransitionError) -> Self {
        BookingError::InvalidTransition {
            actual: err.from,
            action: err.action,
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(_) => AppError::BadRequest(anyhow::anyhow!("{err}")),
            BookingError::ScheduleNotFound(_)
            | BookingError::BookingNotFound(_)
            | BookingError::UnknownOrder(_) => AppError::NotFound(anyhow::anyhow!("{err}")),
            BookingError::NotOwner => AppError::Forbidden(anyhow::anyhow!("{err}")),
            BookingError::SeatUnavailable { .. }
            | BookingError::HoldExpired
            | BookingError::AmountMismatch { .. }
            | BookingError::InvalidTransition { .. } => {
                AppError::Conflict(anyhow::anyhow!("{err}"))
            }
            BookingError::ProviderUnavailable(msg) => AppError::ServiceUnavailable(msg),
        }
    }
}

//! The buyer-facing booking aggregate and its lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::hold::{HoldToken, ReservationHold};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Per-seat passenger details, parallel to the booking's seat list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub name: String,
    pub age: u8,
    pub gender: Gender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Transient: the request passed validation but no hold exists yet.
    Draft,
    Reserved,
    PaymentPending,
    Confirmed,
    Failed,
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Draft => "DRAFT",
            BookingStatus::Reserved => "RESERVED",
            BookingStatus::PaymentPending => "PAYMENT_PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Failed => "FAILED",
            BookingStatus::Expired => "EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Confirmed | BookingStatus::Failed | BookingStatus::Expired
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected booking state transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot {action} a booking in state {from}")]
pub struct TransitionError {
    pub from: BookingStatus,
    pub action: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: String,
    pub schedule_id: Uuid,
    pub seats: Vec<String>,
    pub passengers: Vec<Passenger>,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub boarding_point_id: Option<Uuid>,
    pub dropping_point_id: Option<Uuid>,
    /// Computed server-side as fare x seat count; never taken from the client.
    pub amount_paise: u64,
    pub status: BookingStatus,
    pub hold_token: Option<HoldToken>,
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A validated draft: no hold yet, not persisted until reserved.
    #[allow(clippy::too_many_arguments)]
    pub fn draft(
        user_id: String,
        schedule_id: Uuid,
        seats: Vec<String>,
        passengers: Vec<Passenger>,
        contact_phone: String,
        contact_email: Option<String>,
        boarding_point_id: Option<Uuid>,
        dropping_point_id: Option<Uuid>,
        amount_paise: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            schedule_id,
            seats,
            passengers,
            contact_phone,
            contact_email,
            boarding_point_id,
            dropping_point_id,
            amount_paise,
            status: BookingStatus::Draft,
            hold_token: None,
            hold_expires_at: None,
            order_id: None,
            gateway_payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Per-seat gender tags for the inventory's SOLD records.
    pub fn seat_genders(&self) -> impl Iterator<Item = (&str, Gender)> {
        self.seats
            .iter()
            .zip(&self.passengers)
            .map(|(seat, p)| (seat.as_str(), p.gender))
    }

    pub fn hold_lapsed_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.hold_expires_at, Some(expiry) if expiry <= now)
    }

    /// DRAFT -> RESERVED, binding the freshly created hold.
    pub fn mark_reserved(&mut self, hold: &ReservationHold) -> Result<(), TransitionError> {
        self.transition(BookingStatus::Draft, BookingStatus::Reserved, "reserve")?;
        self.hold_token = Some(hold.token);
        self.hold_expires_at = Some(hold.expires_at);
        Ok(())
    }

    /// RESERVED -> PAYMENT_PENDING once a gateway order exists.
    pub fn mark_payment_pending(&mut self, order_id: String) -> Result<(), TransitionError> {
        self.transition(
            BookingStatus::Reserved,
            BookingStatus::PaymentPending,
            "request payment for",
        )?;
        self.order_id = Some(order_id);
        Ok(())
    }

    /// PAYMENT_PENDING -> CONFIRMED; the hold has been consumed.
    pub fn mark_confirmed(
        &mut self,
        gateway_payment_id: Option<String>,
    ) -> Result<(), TransitionError> {
        self.transition(
            BookingStatus::PaymentPending,
            BookingStatus::Confirmed,
            "confirm",
        )?;
        self.gateway_payment_id = gateway_payment_id;
        self.clear_hold();
        Ok(())
    }

    /// PAYMENT_PENDING -> FAILED; the hold is gone or released.
    pub fn mark_failed(&mut self) -> Result<(), TransitionError> {
        self.transition(BookingStatus::PaymentPending, BookingStatus::Failed, "fail")?;
        self.clear_hold();
        Ok(())
    }

    /// RESERVED | PAYMENT_PENDING -> EXPIRED after the hold TTL lapsed.
    pub fn mark_expired(&mut self) -> Result<(), TransitionError> {
        if !matches!(
            self.status,
            BookingStatus::Reserved | BookingStatus::PaymentPending
        ) {
            return Err(TransitionError {
                from: self.status,
                action: "expire",
            });
        }
        self.status = BookingStatus::Expired;
        self.updated_at = Utc::now();
        self.clear_hold();
        Ok(())
    }

    fn transition(
        &mut self,
        from: BookingStatus,
        to: BookingStatus,
        action: &'static str,
    ) -> Result<(), TransitionError> {
        if self.status != from {
            return Err(TransitionError {
                from: self.status,
                action,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn clear_hold(&mut self) {
        self.hold_token = None;
        self.hold_expires_at = None;
    }
}

//! Booking lifecycle: DRAFT -> RESERVED -> PAYMENT_PENDING -> terminal.
//!
//! The client-held checkout draft (seat choice, points, passenger names) is
//! untrusted input: everything is re-validated against the authoritative
//! schedule here and the amount is always recomputed server-side.

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Passenger, PaymentOrder, Schedule};
use crate::services::error::BookingError;
use crate::services::gateway::RazorpayClient;
use crate::services::holds::HoldManager;
use crate::services::repository::BookingRepository;
use crate::services::{metrics, CURRENCY};

/// Validated input for [`BookingService::reserve`].
#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub schedule_id: Uuid,
    pub seats: Vec<String>,
    pub passengers: Vec<Passenger>,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub boarding_point_id: Option<Uuid>,
    pub dropping_point_id: Option<Uuid>,
}

pub struct BookingService {
    repository: Arc<BookingRepository>,
    holds: Arc<HoldManager>,
    gateway: RazorpayClient,
    hold_ttl: Duration,
}

impl BookingService {
    pub fn new(
        repository: Arc<BookingRepository>,
        holds: Arc<HoldManager>,
        gateway: RazorpayClient,
        hold_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            holds,
            gateway,
            hold_ttl,
        }
    }

    /// Validate the request, claim the seats, persist a RESERVED booking.
    pub fn reserve(&self, user_id: &str, request: ReserveRequest) -> Result<Booking, BookingError> {
        let schedule = self
            .repository
            .get_schedule(request.schedule_id)
            .ok_or(BookingError::ScheduleNotFound(request.schedule_id))?;
        self.validate_against_schedule(&schedule, &request)?;

        let amount_paise = schedule.fare_paise * request.seats.len() as u64;
        let mut booking = Booking::draft(
            user_id.to_string(),
            schedule.id,
            request.seats.clone(),
            request.passengers,
            request.contact_phone,
            request.contact_email,
            request.boarding_point_id,
            request.dropping_point_id,
            amount_paise,
        );

        let hold = self
            .holds
            .create_hold(schedule.id, &request.seats, self.hold_ttl)?;
        booking.mark_reserved(&hold)?;
        self.repository.insert_booking(booking.clone());

        tracing::info!(
            booking_id = %booking.id,
            schedule_id = %schedule.id,
            user_id,
            seats = ?booking.seats,
            amount_paise,
            "booking reserved"
        );
        metrics::record_booking("RESERVED");

        Ok(booking)
    }

    /// Create (or return the existing) payment order for a booking.
    ///
    /// The bool is true when a fresh order was created. Retrying while
    /// PAYMENT_PENDING returns the original order unchanged so a buyer
    /// retrying a slow request cannot end up with two orders.
    pub async fn request_payment(
        &self,
        booking_id: Uuid,
        user_id: &str,
    ) -> Result<(PaymentOrder, bool), BookingError> {
        let booking = self
            .repository
            .get_booking(booking_id)
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        if booking.user_id != user_id {
            return Err(BookingError::NotOwner);
        }

        match booking.status {
            BookingStatus::PaymentPending => {
                let order = self
                    .repository
                    .get_order_for_booking(booking_id)
                    .ok_or_else(|| BookingError::UnknownOrder(format!("booking {booking_id}")))?;
                return Ok((order, false));
            }
            BookingStatus::Reserved => {}
            _ => {
                return Err(BookingError::InvalidTransition {
                    actual: booking.status,
                    action: "request payment for",
                });
            }
        }

        // Lazy expiry at access: a lapsed hold can never reach the gateway.
        // The sweep may have expired the booking first; either way the
        // caller sees the TTL loss, not the race.
        if booking.hold_lapsed_at(Utc::now()) {
            if let Err(err) = self.expire(booking_id) {
                tracing::debug!(booking_id = %booking_id, error = %err, "booking already expired");
            }
            return Err(BookingError::HoldExpired);
        }

        let gateway_order = self
            .gateway
            .create_order(booking.amount_paise, CURRENCY, &booking.id.to_string())
            .await?;
        let order = PaymentOrder::new(
            gateway_order.id,
            booking.id,
            booking.amount_paise,
            gateway_order.currency,
        );

        // Re-check under the entry lock; a concurrent retry may have won.
        let outcome = self.repository.update_booking(booking_id, |b| {
            match b.status {
                BookingStatus::Reserved => {
                    b.mark_payment_pending(order.order_id.clone())?;
                    Ok(None)
                }
                BookingStatus::PaymentPending => Ok(Some(())),
                _ => Err(BookingError::InvalidTransition {
                    actual: b.status,
                    action: "request payment for",
                }),
            }
        })?;

        if outcome.is_some() {
            tracing::warn!(
                booking_id = %booking_id,
                orphaned_order_id = %order.order_id,
                "concurrent payment request raced; returning the committed order"
            );
            let existing = self
                .repository
                .get_order_for_booking(booking_id)
                .ok_or_else(|| BookingError::UnknownOrder(format!("booking {booking_id}")))?;
            return Ok((existing, false));
        }

        self.repository.insert_order(order.clone());
        tracing::info!(
            booking_id = %booking_id,
            order_id = %order.order_id,
            amount_paise = order.amount_paise,
            "payment order created"
        );

        Ok((order, true))
    }

    /// Terminal EXPIRED transition for a booking whose hold TTL lapsed.
    pub fn expire(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let expired = self.repository.update_booking(booking_id, |b| {
            if let Some(token) = b.hold_token {
                self.holds.release(token);
            }
            b.mark_expired()?;
            Ok(b.clone())
        })?;

        tracing::info!(booking_id = %booking_id, "booking expired");
        metrics::record_booking("EXPIRED");
        Ok(expired)
    }

    /// Expire every booking whose hold lapsed; driven by the background
    /// sweeper. Returns how many bookings were expired.
    pub fn expire_lapsed(&self) -> usize {
        let mut expired = 0;
        for booking_id in self.repository.bookings_with_lapsed_holds() {
            // The candidate list is a stale snapshot; re-validate under the
            // entry lock and skip bookings that moved on meanwhile.
            let result = self.repository.update_booking(booking_id, |b| {
                if b.status.is_terminal() || !b.hold_lapsed_at(Utc::now()) {
                    return Ok(false);
                }
                if let Some(token) = b.hold_token {
                    self.holds.release(token);
                }
                b.mark_expired()?;
                Ok(true)
            });
            match result {
                Ok(true) => {
                    tracing::info!(booking_id = %booking_id, "booking expired by sweep");
                    metrics::record_booking("EXPIRED");
                    expired += 1;
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(booking_id = %booking_id, error = %err, "expiry sweep skipped booking")
                }
            }
        }
        self.holds.sweep_expired();
        expired
    }

    pub fn get_for_user(&self, booking_id: Uuid, user_id: &str) -> Result<Booking, BookingError> {
        let booking = self
            .repository
            .get_booking(booking_id)
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        if booking.user_id != user_id {
            return Err(BookingError::NotOwner);
        }
        Ok(booking)
    }

    pub fn list_for_user(&self, user_id: &str) -> Vec<Booking> {
        self.repository.list_bookings_for_user(user_id)
    }

    fn validate_against_schedule(
        &self,
        schedule: &Schedule,
        request: &ReserveRequest,
    ) -> Result<(), BookingError> {
        if !schedule.is_bookable() {
            return Err(BookingError::Validation(
                "schedule is not available for booking".to_string(),
            ));
        }
        if request.passengers.len() != request.seats.len() {
            return Err(BookingError::Validation(format!(
                "{} passengers for {} seats",
                request.passengers.len(),
                request.seats.len()
            )));
        }
        if let Some(label) = request
            .seats
            .iter()
            .find(|label| !schedule.bus.layout.contains_label(label))
        {
            return Err(BookingError::Validation(format!(
                "seat {label} does not exist on this bus"
            )));
        }
        if let Some(id) = request.boarding_point_id {
            if schedule.boarding_point(id).is_none() {
                return Err(BookingError::Validation(
                    "boarding point does not belong to this schedule".to_string(),
                ));
            }
        }
        if let Some(id) = request.dropping_point_id {
            if schedule.dropping_point(id).is_none() {
                return Err(BookingError::Validation(
                    "dropping point does not belong to this schedule".to_string(),
                ));
            }
        }
        Ok(())
    }
}

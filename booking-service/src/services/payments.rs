//! Payment confirmation processor.
//!
//! Applies gateway notifications exactly once per real-world payment. The
//! idempotency key is the order id, not the delivery: redelivered or
//! out-of-order webhooks for an order that already reached a terminal state
//! change nothing.

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Gender, PaymentOrderStatus};
use crate::services::error::BookingError;
use crate::services::events::{DomainEvent, EventBus};
use crate::services::holds::HoldManager;
use crate::services::metrics;
use crate::services::repository::BookingRepository;

pub struct PaymentProcessor {
    repository: Arc<BookingRepository>,
    holds: Arc<HoldManager>,
    events: Arc<EventBus>,
}

enum ConfirmOutcome {
    Confirmed(Booking),
    AlreadyConfirmed(Booking),
    /// Payment arrived after the hold lapsed; booking went FAILED.
    HoldLost,
}

impl PaymentProcessor {
    pub fn new(
        repository: Arc<BookingRepository>,
        holds: Arc<HoldManager>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            repository,
            holds,
            events,
        }
    }

    /// Apply a captured payment to the booking behind `order_id`.
    ///
    /// Seat state only changes through the hold manager; this method never
    /// touches the inventory directly.
    pub fn confirm(
        &self,
        order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let order = self
            .repository
            .get_order(order_id)
            .ok_or_else(|| BookingError::UnknownOrder(order_id.to_string()))?;

        let outcome = self.repository.update_booking(order.booking_id, |booking| {
            match booking.status {
                BookingStatus::Confirmed => Ok(ConfirmOutcome::AlreadyConfirmed(booking.clone())),
                BookingStatus::PaymentPending => {
                    // The amount agreed at order creation must survive to
                    // confirmation bit-for-bit.
                    if order.amount_paise != booking.amount_paise {
                        return Err(BookingError::AmountMismatch {
                            order_paise: order.amount_paise,
                            booking_paise: booking.amount_paise,
                        });
                    }

                    let token = booking.hold_token.ok_or(BookingError::HoldExpired)?;
                    let genders: HashMap<String, Gender> = booking
                        .seat_genders()
                        .map(|(label, gender)| (label.to_string(), gender))
                        .collect();

                    match self.holds.consume(token, booking.id, &genders) {
                        Ok(_) => {
                            booking
                                .mark_confirmed(gateway_payment_id.map(|s| s.to_string()))?;
                            Ok(ConfirmOutcome::Confirmed(booking.clone()))
                        }
                        Err(BookingError::HoldExpired) => {
                            booking.mark_failed()?;
                            Ok(ConfirmOutcome::HoldLost)
                        }
                        Err(other) => Err(other),
                    }
                }
                // Late webhook for a booking that already expired or failed.
                BookingStatus::Failed | BookingStatus::Expired => Err(BookingError::HoldExpired),
                BookingStatus::Draft | BookingStatus::Reserved => {
                    Err(BookingError::InvalidTransition {
                        actual: booking.status,
                        action: "confirm",
                    })
                }
            }
        });

        match outcome {
            Ok(ConfirmOutcome::Confirmed(booking)) => {
                self.repository.update_order(order_id, |o| {
                    o.status = PaymentOrderStatus::Paid;
                    o.gateway_payment_id = gateway_payment_id.map(|s| s.to_string());
                    o.updated_at = chrono::Utc::now();
                });
                self.events.publish(DomainEvent::BookingConfirmed {
                    booking_id: booking.id,
                });
                tracing::info!(
                    order_id,
                    booking_id = %booking.id,
                    gateway_payment_id = ?gateway_payment_id,
                    "booking confirmed"
                );
                metrics::record_booking("CONFIRMED");
                metrics::record_webhook("payment.captured", "confirmed");
                Ok(booking)
            }
            Ok(ConfirmOutcome::AlreadyConfirmed(booking)) => {
                tracing::info!(
                    order_id,
                    booking_id = %booking.id,
                    "duplicate confirmation ignored"
                );
                metrics::record_webhook("payment.captured", "duplicate");
                Ok(booking)
            }
            Ok(ConfirmOutcome::HoldLost) => {
                self.mark_order_failed(order_id, gateway_payment_id);
                tracing::error!(
                    order_id,
                    booking_id = %order.booking_id,
                    reconciliation_required = true,
                    "payment captured for an expired hold; booking failed"
                );
                metrics::record_booking("FAILED");
                metrics::record_webhook("payment.captured", "hold_expired");
                Err(BookingError::HoldExpired)
            }
            Err(err @ BookingError::AmountMismatch { .. }) => {
                tracing::error!(
                    order_id,
                    booking_id = %order.booking_id,
                    reconciliation_required = true,
                    error = %err,
                    "order and booking amounts diverged; booking not confirmed"
                );
                metrics::record_webhook("payment.captured", "amount_mismatch");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Apply a failed payment: the booking fails and its seats return to
    /// the pool immediately instead of waiting out the TTL.
    pub fn fail(
        &self,
        order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let order = self
            .repository
            .get_order(order_id)
            .ok_or_else(|| BookingError::UnknownOrder(order_id.to_string()))?;

        let booking = self.repository.update_booking(order.booking_id, |booking| {
            match booking.status {
                BookingStatus::PaymentPending => {
                    if let Some(token) = booking.hold_token {
                        self.holds.release(token);
                    }
                    booking.mark_failed()?;
                    Ok(booking.clone())
                }
                // A failure event cannot undo a confirmation, and repeated
                // failure events change nothing.
                BookingStatus::Confirmed | BookingStatus::Failed | BookingStatus::Expired => {
                    Ok(booking.clone())
                }
                BookingStatus::Draft | BookingStatus::Reserved => {
                    Err(BookingError::InvalidTransition {
                        actual: booking.status,
                        action: "fail",
                    })
                }
            }
        })?;

        if booking.status == BookingStatus::Failed {
            self.mark_order_failed(order_id, gateway_payment_id);
            tracing::info!(order_id, booking_id = %booking.id, "payment failed; seats released");
            metrics::record_booking("FAILED");
            metrics::record_webhook("payment.failed", "failed");
        }
        Ok(booking)
    }

    fn mark_order_failed(&self, order_id: &str, gateway_payment_id: Option<&str>) {
        self.repository.update_order(order_id, |o| {
            o.status = PaymentOrderStatus::Failed;
            if o.gateway_payment_id.is_none() {
                o.gateway_payment_id = gateway_payment_id.map(|s| s.to_string());
            }
            o.updated_at = chrono::Utc::now();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Booking, Bus, LayoutPreset, Passenger, PaymentOrder, Route, Schedule, ScheduleStatus,
    };
    use crate::services::inventory::{SeatInventory, SeatState};
    use chrono::{Duration, Utc};

    struct Fixture {
        repository: Arc<BookingRepository>,
        inventory: Arc<SeatInventory>,
        holds: Arc<HoldManager>,
        processor: PaymentProcessor,
        schedule_id: Uuid,
    }

    fn fixture() -> Fixture {
        let repository = Arc::new(BookingRepository::new());
        let inventory = Arc::new(SeatInventory::new());
        let holds = Arc::new(HoldManager::new(Arc::clone(&inventory)));
        let events = Arc::new(EventBus::default());
        let processor = PaymentProcessor::new(
            Arc::clone(&repository),
            Arc::clone(&holds),
            Arc::clone(&events),
        );

        let layout = LayoutPreset::Seater2x2.layout();
        let labels = layout.seat_labels();
        let schedule = Schedule {
            id: Uuid::new_v4(),
            route: Route {
                origin: "Pune".to_string(),
                destination: "Mumbai".to_string(),
            },
            bus: Bus {
                registration_no: "MH12AB1234".to_string(),
                capacity: labels.len() as u32,
                layout,
            },
            departure_utc: Utc::now() + Duration::days(1),
            arrival_utc: Utc::now() + Duration::days(1) + Duration::hours(4),
            fare_paise: 50_000,
            status: ScheduleStatus::Active,
            boarding_points: Vec::new(),
            dropping_points: Vec::new(),
            created_at: Utc::now(),
        };
        let schedule_id = schedule.id;
        inventory.register_schedule(schedule_id, &labels);
        repository.insert_schedule(schedule);

        Fixture {
            repository,
            inventory,
            holds,
            processor,
            schedule_id,
        }
    }

    /// A PAYMENT_PENDING booking for 1A with an order of `order_paise`.
    fn pending_booking(fx: &Fixture, order_paise: u64, ttl: Duration) -> (Uuid, String) {
        let hold = fx
            .holds
            .create_hold(fx.schedule_id, &["1A".to_string()], ttl)
            .unwrap();
        let mut booking = Booking::draft(
            "user-1".to_string(),
            fx.schedule_id,
            vec!["1A".to_string()],
            vec![Passenger {
                name: "Ravi".to_string(),
                age: 28,
                gender: Gender::Male,
            }],
            "9999900000".to_string(),
            None,
            None,
            None,
            50_000,
        );
        booking.mark_reserved(&hold).unwrap();
        let order_id = format!("order_{}", booking.id.simple());
        booking.mark_payment_pending(order_id.clone()).unwrap();
        let booking_id = booking.id;
        fx.repository.insert_booking(booking);
        fx.repository.insert_order(PaymentOrder::new(
            order_id.clone(),
            booking_id,
            order_paise,
            "INR".to_string(),
        ));
        (booking_id, order_id)
    }

    #[test]
    fn confirm_sells_the_seats_and_is_idempotent() {
        let fx = fixture();
        let (booking_id, order_id) = pending_booking(&fx, 50_000, Duration::minutes(10));

        let confirmed = fx.processor.confirm(&order_id, Some("pay_1")).unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.gateway_payment_id.as_deref(), Some("pay_1"));

        let snapshot = fx.inventory.snapshot(fx.schedule_id).unwrap();
        assert_eq!(
            snapshot.seats["1A"],
            SeatState::Sold {
                booking_id,
                gender: Some(Gender::Male)
            }
        );

        // Second delivery: same terminal state, no double consume.
        let again = fx.processor.confirm(&order_id, Some("pay_1")).unwrap();
        assert_eq!(again.status, BookingStatus::Confirmed);
        let order = fx.repository.get_order(&order_id).unwrap();
        assert_eq!(order.status, PaymentOrderStatus::Paid);
    }

    #[test]
    fn confirm_rejects_unknown_orders_without_side_effects() {
        let fx = fixture();
        let err = fx.processor.confirm("order_ghost", None).unwrap_err();
        assert!(matches!(err, BookingError::UnknownOrder(_)));
    }

    #[test]
    fn amount_mismatch_never_confirms() {
        let fx = fixture();
        let (booking_id, order_id) = pending_booking(&fx, 49_900, Duration::minutes(10));

        let err = fx.processor.confirm(&order_id, Some("pay_2")).unwrap_err();
        assert!(matches!(err, BookingError::AmountMismatch { .. }));

        // Left for reconciliation: still PAYMENT_PENDING, seat still held.
        let booking = fx.repository.get_booking(booking_id).unwrap();
        assert_eq!(booking.status, BookingStatus::PaymentPending);
        let snapshot = fx.inventory.snapshot(fx.schedule_id).unwrap();
        assert!(matches!(snapshot.seats["1A"], SeatState::Held { .. }));
    }

    #[test]
    fn confirm_after_ttl_fails_the_booking() {
        let fx = fixture();
        let (booking_id, order_id) = pending_booking(&fx, 50_000, Duration::seconds(0));

        let err = fx.processor.confirm(&order_id, Some("pay_3")).unwrap_err();
        assert!(matches!(err, BookingError::HoldExpired));

        let booking = fx.repository.get_booking(booking_id).unwrap();
        assert_eq!(booking.status, BookingStatus::Failed);
        let order = fx.repository.get_order(&order_id).unwrap();
        assert_eq!(order.status, PaymentOrderStatus::Failed);
        let snapshot = fx.inventory.snapshot(fx.schedule_id).unwrap();
        assert_eq!(snapshot.seats["1A"], SeatState::Available);
    }

    #[test]
    fn failed_payment_releases_the_seats() {
        let fx = fixture();
        let (booking_id, order_id) = pending_booking(&fx, 50_000, Duration::minutes(10));

        let booking = fx.processor.fail(&order_id, Some("pay_4")).unwrap();
        assert_eq!(booking.id, booking_id);
        assert_eq!(booking.status, BookingStatus::Failed);
        let snapshot = fx.inventory.snapshot(fx.schedule_id).unwrap();
        assert_eq!(snapshot.seats["1A"], SeatState::Available);

        // A duplicate failure event changes nothing.
        let again = fx.processor.fail(&order_id, Some("pay_4")).unwrap();
        assert_eq!(again.status, BookingStatus::Failed);

        // And a failure can never undo a confirmation elsewhere.
        let (_, other_order) = pending_booking(&fx, 50_000, Duration::minutes(10));
        fx.processor.confirm(&other_order, Some("pay_5")).unwrap();
        let confirmed = fx.processor.fail(&other_order, Some("pay_5")).unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
    }
}

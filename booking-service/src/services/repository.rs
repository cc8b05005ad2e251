//! In-memory stores for schedules, bookings and payment orders.
//!
//! Bookings mutate through [`BookingRepository::update_booking`], which runs
//! the caller's closure under the entry's shard lock so a webhook and the
//! expiry sweeper can never interleave a check-then-act on the same booking.

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{Booking, PaymentOrder, Schedule, ScheduleStatus};
use crate::services::error::BookingError;

pub struct BookingRepository {
    schedules: DashMap<Uuid, Schedule>,
    bookings: DashMap<Uuid, Booking>,
    /// Gateway order id -> order; the idempotency index for webhooks.
    orders: DashMap<String, PaymentOrder>,
    orders_by_booking: DashMap<Uuid, String>,
}

impl BookingRepository {
    pub fn new() -> Self {
        Self {
            schedules: DashMap::new(),
            bookings: DashMap::new(),
            orders: DashMap::new(),
            orders_by_booking: DashMap::new(),
        }
    }

    // Schedules --------------------------------------------------------

    pub fn insert_schedule(&self, schedule: Schedule) {
        self.schedules.insert(schedule.id, schedule);
    }

    pub fn get_schedule(&self, id: Uuid) -> Option<Schedule> {
        self.schedules.get(&id).map(|s| s.clone())
    }

    /// Active schedules matching the optional filters, departure-ordered.
    pub fn list_schedules(
        &self,
        origin: Option<&str>,
        destination: Option<&str>,
        date: Option<chrono::NaiveDate>,
    ) -> Vec<Schedule> {
        let mut schedules: Vec<Schedule> = self
            .schedules
            .iter()
            .filter(|s| s.status == ScheduleStatus::Active)
            .filter(|s| {
                origin.map_or(true, |o| s.route.origin.eq_ignore_ascii_case(o))
                    && destination.map_or(true, |d| s.route.destination.eq_ignore_ascii_case(d))
                    && date.map_or(true, |d| s.departure_utc.date_naive() == d)
            })
            .map(|s| s.clone())
            .collect();
        schedules.sort_by_key(|s| s.departure_utc);
        schedules
    }

    // Bookings ---------------------------------------------------------

    pub fn insert_booking(&self, booking: Booking) {
        self.bookings.insert(booking.id, booking);
    }

    pub fn get_booking(&self, id: Uuid) -> Option<Booking> {
        self.bookings.get(&id).map(|b| b.clone())
    }

    /// Apply `f` to the booking under its entry lock. The closure decides
    /// whether the mutation is legal; an `Err` leaves the booking untouched
    /// only if the closure itself did not mutate before failing.
    pub fn update_booking<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Booking) -> Result<T, BookingError>,
    ) -> Result<T, BookingError> {
        let mut entry = self
            .bookings
            .get_mut(&id)
            .ok_or(BookingError::BookingNotFound(id))?;
        f(entry.value_mut())
    }

    pub fn list_bookings_for_user(&self, user_id: &str) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.clone())
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings
    }

    /// Ids of bookings whose hold TTL has lapsed while still awaiting
    /// payment. Snapshot only; the expiry transition re-checks under the
    /// entry lock.
    pub fn bookings_with_lapsed_holds(&self) -> Vec<Uuid> {
        let now = Utc::now();
        self.bookings
            .iter()
            .filter(|b| !b.status.is_terminal() && b.hold_lapsed_at(now))
            .map(|b| b.id)
            .collect()
    }

    // Payment orders ---------------------------------------------------

    pub fn insert_order(&self, order: PaymentOrder) {
        self.orders_by_booking
            .insert(order.booking_id, order.order_id.clone());
        self.orders.insert(order.order_id.clone(), order);
    }

    pub fn get_order(&self, order_id: &str) -> Option<PaymentOrder> {
        self.orders.get(order_id).map(|o| o.clone())
    }

    pub fn get_order_for_booking(&self, booking_id: Uuid) -> Option<PaymentOrder> {
        let order_id = self.orders_by_booking.get(&booking_id)?;
        self.get_order(order_id.value())
    }

    pub fn update_order(&self, order_id: &str, f: impl FnOnce(&mut PaymentOrder)) {
        if let Some(mut entry) = self.orders.get_mut(order_id) {
            f(entry.value_mut());
        }
    }
}

impl Default for BookingRepository {
    fn default() -> Self {
        Self::new()
    }
}

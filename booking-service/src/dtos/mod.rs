//! Request/response DTOs for the HTTP surface.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    BoardingPoint, Booking, BookingStatus, DroppingPoint, Gender, LayoutPreset, Passenger,
    PaymentOrder, Schedule, ScheduleStatus, SeatLayout,
};
use crate::services::bookings;
use crate::services::inventory::{SeatSnapshot, SeatState};

// Schedules ------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    #[validate(length(min = 1, max = 100))]
    pub origin: String,
    #[validate(length(min = 1, max = 100))]
    pub destination: String,
    #[validate(length(min = 1, max = 50))]
    pub registration_no: String,
    /// Pick a preset, or supply an explicit layout instead.
    pub layout_preset: Option<LayoutPreset>,
    pub layout: Option<SeatLayout>,
    pub departure_utc: DateTime<Utc>,
    pub arrival_utc: DateTime<Utc>,
    #[validate(range(min = 1))]
    pub fare_paise: u64,
    #[validate(nested)]
    #[serde(default)]
    pub boarding_points: Vec<BoardingPointInput>,
    #[validate(nested)]
    #[serde(default)]
    pub dropping_points: Vec<DroppingPointInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BoardingPointInput {
    pub time: NaiveTime,
    #[validate(length(min = 1, max = 150))]
    pub location_name: String,
    pub landmark: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DroppingPointInput {
    pub time: NaiveTime,
    #[validate(length(min = 1, max = 150))]
    pub location_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub registration_no: String,
    pub capacity: u32,
    pub departure_utc: DateTime<Utc>,
    pub arrival_utc: DateTime<Utc>,
    pub fare_paise: u64,
    pub status: ScheduleStatus,
    pub boarding_points: Vec<BoardingPoint>,
    pub dropping_points: Vec<DroppingPoint>,
}

impl From<Schedule> for ScheduleResponse {
    fn from(s: Schedule) -> Self {
        Self {
            id: s.id,
            origin: s.route.origin,
            destination: s.route.destination,
            registration_no: s.bus.registration_no,
            capacity: s.bus.capacity,
            departure_utc: s.departure_utc,
            arrival_utc: s.arrival_utc,
            fare_paise: s.fare_paise,
            status: s.status,
            boarding_points: s.boarding_points,
            dropping_points: s.dropping_points,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleFilter {
    pub origin: Option<String>,
    pub destination: Option<String>,
    /// Departure date (UTC), `YYYY-MM-DD`.
    pub date: Option<chrono::NaiveDate>,
}

// Bookings -------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct ReserveRequest {
    pub schedule_id: Uuid,
    #[validate(length(min = 1, message = "select at least one seat"))]
    pub seats: Vec<String>,
    #[validate(length(min = 1), nested)]
    pub passengers: Vec<PassengerInput>,
    #[validate(length(min = 7, max = 20))]
    pub contact_phone: String,
    #[validate(email)]
    pub contact_email: Option<String>,
    pub boarding_point_id: Option<Uuid>,
    pub dropping_point_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PassengerInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 1, max = 120))]
    pub age: u8,
    pub gender: Gender,
}

impl ReserveRequest {
    pub fn into_domain(self) -> bookings::ReserveRequest {
        bookings::ReserveRequest {
            schedule_id: self.schedule_id,
            seats: self.seats,
            passengers: self
                .passengers
                .into_iter()
                .map(|p| Passenger {
                    name: p.name,
                    age: p.age,
                    gender: p.gender,
                })
                .collect(),
            contact_phone: self.contact_phone,
            contact_email: self.contact_email,
            boarding_point_id: self.boarding_point_id,
            dropping_point_id: self.dropping_point_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub status: BookingStatus,
    pub seats: Vec<String>,
    pub passengers: Vec<Passenger>,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub boarding_point_id: Option<Uuid>,
    pub dropping_point_id: Option<Uuid>,
    pub amount_paise: u64,
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            schedule_id: b.schedule_id,
            status: b.status,
            seats: b.seats,
            passengers: b.passengers,
            contact_phone: b.contact_phone,
            contact_email: b.contact_email,
            boarding_point_id: b.boarding_point_id,
            dropping_point_id: b.dropping_point_id,
            amount_paise: b.amount_paise,
            hold_expires_at: b.hold_expires_at,
            order_id: b.order_id,
            created_at: b.created_at,
        }
    }
}

// Payments -------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PaymentOrderResponse {
    pub booking_id: Uuid,
    pub order_id: String,
    pub amount_paise: u64,
    pub currency: String,
    /// For initializing the gateway's checkout widget.
    pub key_id: String,
}

impl PaymentOrderResponse {
    pub fn new(order: PaymentOrder, key_id: String) -> Self {
        Self {
            booking_id: order.booking_id,
            order_id: order.order_id,
            amount_paise: order.amount_paise,
            currency: order.currency,
            key_id,
        }
    }
}

/// Webhook acknowledgement: the booking the event landed on, if any.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
}

impl WebhookAck {
    pub fn for_booking(booking: &Booking) -> Self {
        Self {
            ok: true,
            booking_id: Some(booking.id),
            status: Some(booking.status),
        }
    }

    pub fn ignored() -> Self {
        Self {
            ok: true,
            booking_id: None,
            status: None,
        }
    }
}

// Seat map -------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Held,
    Sold,
}

#[derive(Debug, Serialize)]
pub struct SeatView {
    pub status: SeatStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
}

impl From<&SeatState> for SeatView {
    fn from(state: &SeatState) -> Self {
        match state {
            SeatState::Available => SeatView {
                status: SeatStatus::Available,
                gender: None,
            },
            SeatState::Held { .. } => SeatView {
                status: SeatStatus::Held,
                gender: None,
            },
            SeatState::Sold { gender, .. } => SeatView {
                status: SeatStatus::Sold,
                gender: *gender,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SeatMapResponse {
    pub schedule_id: Uuid,
    pub layout: SeatLayout,
    pub fare_paise: u64,
    /// Inventory version; bumps whenever occupancy changes.
    pub version: u64,
    pub seats: BTreeMap<String, SeatView>,
}

impl SeatMapResponse {
    pub fn new(schedule: &Schedule, snapshot: SeatSnapshot) -> Self {
        Self {
            schedule_id: schedule.id,
            layout: schedule.bus.layout.clone(),
            fare_paise: schedule.fare_paise,
            version: snapshot.version,
            seats: snapshot
                .seats
                .iter()
                .map(|(label, state)| (label.clone(), SeatView::from(state)))
                .collect(),
        }
    }
}

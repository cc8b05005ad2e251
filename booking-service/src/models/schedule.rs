//! Schedules, routes and boarding/dropping reference data.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::layout::SeatLayout;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub registration_no: String,
    pub capacity: u32,
    pub layout: SeatLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Active,
    Cancelled,
}

/// One bus trip on one route. Immutable once created except for the fare and
/// point lists, which an operator may amend before departure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub route: Route,
    pub bus: Bus,
    pub departure_utc: DateTime<Utc>,
    pub arrival_utc: DateTime<Utc>,
    /// Flat per-seat fare in the smallest currency unit (paise).
    pub fare_paise: u64,
    pub status: ScheduleStatus,
    pub boarding_points: Vec<BoardingPoint>,
    pub dropping_points: Vec<DroppingPoint>,
    pub created_at: DateTime<Utc>,
}

impl Schedule {
    pub fn is_bookable(&self) -> bool {
        self.status == ScheduleStatus::Active
    }

    pub fn boarding_point(&self, id: Uuid) -> Option<&BoardingPoint> {
        self.boarding_points.iter().find(|p| p.id == id)
    }

    pub fn dropping_point(&self, id: Uuid) -> Option<&DroppingPoint> {
        self.dropping_points.iter().find(|p| p.id == id)
    }
}

/// Where the bus picks passengers up, ordered by time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardingPoint {
    pub id: Uuid,
    pub time: NaiveTime,
    pub location_name: String,
    pub landmark: Option<String>,
}

/// Where the bus drops passengers off, ordered by time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroppingPoint {
    pub id: Uuid,
    pub time: NaiveTime,
    pub location_name: String,
    pub description: Option<String>,
}

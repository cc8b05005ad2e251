//! Schedule registration and the read side buyers browse: trip search,
//! boarding/dropping points and the live seat map.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateScheduleRequest, ScheduleFilter, ScheduleResponse, SeatMapResponse};
use crate::middleware::BuyerContext;
use crate::models::{BoardingPoint, Bus, DroppingPoint, Route, Schedule, ScheduleStatus};
use crate::services::error::BookingError;
use crate::AppState;

/// Register a trip an operator wants to sell. Seeds the seat arena with the
/// bus layout; every seat starts AVAILABLE.
pub async fn create_schedule(
    State(state): State<AppState>,
    operator: BuyerContext,
    Json(payload): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleResponse>), AppError> {
    payload.validate()?;

    if payload.arrival_utc <= payload.departure_utc {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "arrival must be after departure"
        )));
    }

    let layout = match (payload.layout, payload.layout_preset) {
        (Some(layout), _) => {
            layout
                .validate()
                .map_err(|e| AppError::BadRequest(anyhow::anyhow!("invalid layout: {e}")))?;
            layout
        }
        (None, Some(preset)) => preset.layout(),
        (None, None) => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "either layout or layout_preset is required"
            )));
        }
    };

    let labels = layout.seat_labels();
    let schedule = Schedule {
        id: Uuid::new_v4(),
        route: Route {
            origin: payload.origin,
            destination: payload.destination,
        },
        bus: Bus {
            registration_no: payload.registration_no,
            capacity: labels.len() as u32,
            layout,
        },
        departure_utc: payload.departure_utc,
        arrival_utc: payload.arrival_utc,
        fare_paise: payload.fare_paise,
        status: ScheduleStatus::Active,
        boarding_points: payload
            .boarding_points
            .into_iter()
            .map(|p| BoardingPoint {
                id: Uuid::new_v4(),
                time: p.time,
                location_name: p.location_name,
                landmark: p.landmark,
            })
            .collect(),
        dropping_points: payload
            .dropping_points
            .into_iter()
            .map(|p| DroppingPoint {
                id: Uuid::new_v4(),
                time: p.time,
                location_name: p.location_name,
                description: p.description,
            })
            .collect(),
        created_at: Utc::now(),
    };

    state.inventory.register_schedule(schedule.id, &labels);
    state.repository.insert_schedule(schedule.clone());

    tracing::info!(
        schedule_id = %schedule.id,
        operator_id = %operator.user_id,
        origin = %schedule.route.origin,
        destination = %schedule.route.destination,
        seats = labels.len(),
        "schedule registered"
    );

    Ok((StatusCode::CREATED, Json(ScheduleResponse::from(schedule))))
}

/// List active schedules, optionally filtered by route and departure date.
pub async fn list_schedules(
    State(state): State<AppState>,
    Query(filter): Query<ScheduleFilter>,
) -> Json<Vec<ScheduleResponse>> {
    let schedules = state
        .repository
        .list_schedules(
            filter.origin.as_deref(),
            filter.destination.as_deref(),
            filter.date,
        )
        .into_iter()
        .map(ScheduleResponse::from)
        .collect();
    Json(schedules)
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let schedule = bookable_schedule(&state, schedule_id)?;
    Ok(Json(ScheduleResponse::from(schedule)))
}

pub async fn boarding_points(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<Vec<BoardingPoint>>, AppError> {
    let mut points = bookable_schedule(&state, schedule_id)?.boarding_points;
    points.sort_by_key(|p| p.time);
    Ok(Json(points))
}

pub async fn dropping_points(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<Vec<DroppingPoint>>, AppError> {
    let mut points = bookable_schedule(&state, schedule_id)?.dropping_points;
    points.sort_by_key(|p| p.time);
    Ok(Json(points))
}

/// Seat layout plus per-seat occupancy for visual seat selection. HELD and
/// SOLD both render as taken; SOLD carries the passenger's gender tag.
pub async fn seatmap(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<SeatMapResponse>, AppError> {
    let schedule = bookable_schedule(&state, schedule_id)?;
    let snapshot = state.inventory.snapshot(schedule_id).map_err(AppError::from)?;
    Ok(Json(SeatMapResponse::new(&schedule, snapshot)))
}

/// Cancelled schedules are invisible to buyers, like unknown ones.
fn bookable_schedule(state: &AppState, schedule_id: Uuid) -> Result<Schedule, AppError> {
    state
        .repository
        .get_schedule(schedule_id)
        .filter(|s| s.is_bookable())
        .ok_or_else(|| AppError::from(BookingError::ScheduleNotFound(schedule_id)))
}

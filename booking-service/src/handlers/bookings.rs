//! Booking handlers: reserve seats, request payment, read bookings.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{BookingResponse, PaymentOrderResponse, ReserveRequest};
use crate::middleware::BuyerContext;
use crate::AppState;

/// Reserve seats on a schedule. On success the buyer owns a time-bounded
/// hold and the booking is RESERVED; on a seat conflict nothing is held and
/// the buyer must re-select.
pub async fn reserve(
    State(state): State<AppState>,
    buyer: BuyerContext,
    Json(payload): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    payload.validate()?;

    let booking = state
        .bookings
        .reserve(&buyer.user_id, payload.into_domain())?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(booking))))
}

/// Create the payment order for a RESERVED booking. Safe to retry: while
/// the booking is PAYMENT_PENDING the original order comes back unchanged.
pub async fn request_payment(
    State(state): State<AppState>,
    buyer: BuyerContext,
    Path(booking_id): Path<Uuid>,
) -> Result<(StatusCode, Json<PaymentOrderResponse>), AppError> {
    let (order, created) = state
        .bookings
        .request_payment(booking_id, &buyer.user_id)
        .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(PaymentOrderResponse::new(
            order,
            state.gateway.checkout_key_id(),
        )),
    ))
}

pub async fn get_booking(
    State(state): State<AppState>,
    buyer: BuyerContext,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.bookings.get_for_user(booking_id, &buyer.user_id)?;
    Ok(Json(BookingResponse::from(booking)))
}

/// The buyer's bookings, newest first.
pub async fn list_bookings(
    State(state): State<AppState>,
    buyer: BuyerContext,
) -> Json<Vec<BookingResponse>> {
    let bookings = state
        .bookings
        .list_for_user(&buyer.user_id)
        .into_iter()
        .map(BookingResponse::from)
        .collect();
    Json(bookings)
}

//! Razorpay webhook handler.
//!
//! Verifies the HMAC signature over the raw body, then hands the order id
//! to the payment processor. Delivery may be duplicated or out of order;
//! the processor is idempotent per order id, so every delivery of the same
//! event acknowledges with the same terminal booking.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use service_core::error::AppError;

use crate::dtos::WebhookAck;
use crate::services::error::BookingError;
use crate::services::metrics;
use crate::AppState;

const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<WebhookAck>), AppError> {
    if state.config.razorpay.verify_webhook {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::warn!("missing {SIGNATURE_HEADER} header");
                AppError::Unauthorized(anyhow::anyhow!("Missing webhook signature"))
            })?;

        if !state.gateway.verify_webhook_signature(&body, signature) {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Invalid webhook signature"
            )));
        }
    }

    let event = state.gateway.parse_webhook_event(&body).map_err(|e| {
        tracing::error!(error = %e, "failed to parse webhook event");
        AppError::BadRequest(anyhow::anyhow!("Invalid webhook payload"))
    })?;

    tracing::info!(event_type = %event.event, "processing payment webhook");

    let Some((order_id, payment_id)) = event.order_and_payment() else {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "order_id not found in payload"
        )));
    };

    match event.event.as_str() {
        "payment.captured" | "order.paid" => {
            match state.payments.confirm(&order_id, payment_id.as_deref()) {
                Ok(booking) => Ok((StatusCode::OK, Json(WebhookAck::for_booking(&booking)))),
                // Payment landed after the hold lapsed. The booking is FAILED
                // and flagged for reconciliation; acknowledge so the gateway
                // stops redelivering an event that cannot change the outcome.
                Err(BookingError::HoldExpired) => {
                    let booking = state
                        .repository
                        .get_order(&order_id)
                        .and_then(|o| state.repository.get_booking(o.booking_id));
                    match booking {
                        Some(b) => Ok((StatusCode::OK, Json(WebhookAck::for_booking(&b)))),
                        None => Err(AppError::from(BookingError::UnknownOrder(order_id))),
                    }
                }
                Err(err) => Err(AppError::from(err)),
            }
        }
        "payment.failed" => {
            let booking = state.payments.fail(&order_id, payment_id.as_deref())?;
            Ok((StatusCode::OK, Json(WebhookAck::for_booking(&booking))))
        }
        other => {
            tracing::debug!(event_type = %other, "unhandled webhook event type");
            metrics::record_webhook(other, "ignored");
            Ok((StatusCode::OK, Json(WebhookAck::ignored())))
        }
    }
}

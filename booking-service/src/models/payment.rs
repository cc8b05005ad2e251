//! Payment orders: one gateway order per booking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOrderStatus {
    Created,
    Paid,
    Failed,
}

/// Gateway-side order bound one-to-one to a booking. The amount recorded
/// here was agreed at order creation and must match the booking's amount
/// bit-for-bit at confirmation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub order_id: String,
    pub booking_id: Uuid,
    pub amount_paise: u64,
    pub currency: String,
    pub status: PaymentOrderStatus,
    pub gateway_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentOrder {
    pub fn new(order_id: String, booking_id: Uuid, amount_paise: u64, currency: String) -> Self {
        let now = Utc::now();
        Self {
            order_id,
            booking_id,
            amount_paise,
            currency,
            status: PaymentOrderStatus::Created,
            gateway_payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

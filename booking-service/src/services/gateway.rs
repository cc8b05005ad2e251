//! Razorpay payment provider client.
//!
//! Implements order creation against Razorpay's Orders API and HMAC
//! signature verification for inbound webhooks. Without configured
//! credentials the client runs in demo mode and mints local order ids, so
//! the whole booking lifecycle works in development and tests with no
//! network access.

use backoff::ExponentialBackoffBuilder;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

use crate::config::RazorpayConfig;
use crate::services::error::BookingError;

type HmacSha256 = Hmac<Sha256>;

/// Razorpay client for creating orders and verifying webhooks.
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    config: RazorpayConfig,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    /// Amount in the smallest currency unit (paise for INR).
    amount: u64,
    currency: &'a str,
    receipt: &'a str,
}

/// The slice of Razorpay's order entity this engine cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    pub status: String,
}

/// Inbound webhook event, signature already verified by the caller.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<WebhookPaymentEntity>,
    pub order: Option<WebhookOrderEntity>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPaymentEntity {
    pub entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    pub order_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookOrderEntity {
    pub entity: OrderEntity,
}

#[derive(Debug, Deserialize)]
pub struct OrderEntity {
    pub id: String,
}

impl WebhookEvent {
    /// Extract `(order_id, gateway_payment_id)` from whichever entity the
    /// event carries: `payment.*` events embed a payment with its order id,
    /// `order.paid` only the order.
    pub fn order_and_payment(&self) -> Option<(String, Option<String>)> {
        if let Some(payment) = &self.payload.payment {
            if let Some(order_id) = &payment.entity.order_id {
                return Some((order_id.clone(), Some(payment.entity.id.clone())));
            }
        }
        self.payload
            .order
            .as_ref()
            .map(|order| (order.entity.id.clone(), None))
    }
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Whether real credentials are present; otherwise demo mode is active.
    pub fn is_configured(&self) -> bool {
        !self.config.key_id.is_empty() && !self.config.key_secret.expose_secret().is_empty()
    }

    /// Key id the frontend needs to initialize checkout.
    pub fn checkout_key_id(&self) -> String {
        if self.is_configured() {
            self.config.key_id.clone()
        } else {
            "rzp_test_demo".to_string()
        }
    }

    /// Create an order for `amount_paise`. Transient gateway failures are
    /// retried with exponential backoff before surfacing
    /// `ProviderUnavailable`; nothing is committed locally until this
    /// returns Ok.
    pub async fn create_order(
        &self,
        amount_paise: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, BookingError> {
        if !self.is_configured() {
            let order = GatewayOrder {
                id: format!("order_demo_{receipt}"),
                amount: amount_paise,
                currency: currency.to_string(),
                status: "created".to_string(),
            };
            tracing::info!(order_id = %order.id, amount = amount_paise, "demo payment order created");
            return Ok(order);
        }

        let request = CreateOrderRequest {
            amount: amount_paise,
            currency,
            receipt,
        };

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_interval(Duration::from_secs(2))
            .with_max_elapsed_time(Some(Duration::from_secs(10)))
            .build();

        let order = backoff::future::retry(policy, || async {
            self.post_order(&request).await
        })
        .await?;

        tracing::info!(
            order_id = %order.id,
            amount = order.amount,
            currency = %order.currency,
            "payment order created"
        );
        Ok(order)
    }

    async fn post_order(
        &self,
        request: &CreateOrderRequest<'_>,
    ) -> Result<GatewayOrder, backoff::Error<BookingError>> {
        let url = format!("{}/orders", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.key_id,
                Some(self.config.key_secret.expose_secret()),
            )
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "payment gateway unreachable, will retry");
                backoff::Error::transient(BookingError::ProviderUnavailable(e.to_string()))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            backoff::Error::transient(BookingError::ProviderUnavailable(e.to_string()))
        })?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                backoff::Error::permanent(BookingError::ProviderUnavailable(format!(
                    "malformed gateway response: {e}"
                )))
            })
        } else if status.is_server_error() {
            tracing::warn!(status = %status, "payment gateway error, will retry");
            Err(backoff::Error::transient(BookingError::ProviderUnavailable(
                format!("gateway returned {status}"),
            )))
        } else {
            tracing::error!(status = %status, body = %body, "payment gateway rejected order");
            Err(backoff::Error::permanent(BookingError::ProviderUnavailable(
                format!("gateway rejected order: {status}"),
            )))
        }
    }

    /// Verify a webhook signature: `HMAC-SHA256(raw_body, webhook_secret)`,
    /// hex-encoded.
    pub fn verify_webhook_signature(&self, body: &str, signature: &str) -> bool {
        let expected = compute_signature(body, self.config.webhook_secret.expose_secret());
        let valid = expected == signature;
        if !valid {
            tracing::warn!("webhook signature verification failed");
        }
        valid
    }

    pub fn parse_webhook_event(&self, body: &str) -> Result<WebhookEvent, serde_json::Error> {
        serde_json::from_str(body)
    }
}

fn compute_signature(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

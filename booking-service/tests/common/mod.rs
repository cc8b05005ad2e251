use booking_service::config::{Config, HoldConfig, RazorpayConfig, ServerConfig};
use booking_service::Application;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::Secret;
use serde_json::{json, Value};
use sha2::Sha256;

pub const WEBHOOK_SECRET: &str = "test_webhook_secret";
pub const OPERATOR: &str = "operator-1";

pub struct TestOptions {
    pub hold_ttl_seconds: u64,
    /// 0 disables the background sweep so tests control expiry timing.
    pub sweep_interval_seconds: u64,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            hold_ttl_seconds: 600,
            sweep_interval_seconds: 0,
        }
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestOptions::default()).await
    }

    pub async fn spawn_with(options: TestOptions) -> Self {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            hold: HoldConfig {
                ttl_seconds: options.hold_ttl_seconds,
                sweep_interval_seconds: options.sweep_interval_seconds,
            },
            // No credentials: the gateway runs in demo mode, webhooks are
            // still signature-checked against the test secret.
            razorpay: RazorpayConfig {
                key_id: String::new(),
                key_secret: Secret::new(String::new()),
                webhook_secret: Secret::new(WEBHOOK_SECRET.to_string()),
                api_base_url: "https://api.razorpay.com/v1".to_string(),
                verify_webhook: true,
            },
            service_name: "booking-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
        }
    }

    /// Register a 2x2 seater schedule departing tomorrow; returns the
    /// created schedule JSON (id, point ids, layout).
    pub async fn seed_schedule(&self, fare_paise: u64) -> Value {
        let departure = Utc::now() + Duration::days(1);
        let arrival = departure + Duration::hours(4);
        let response = self
            .client
            .post(format!("{}/schedules", self.address))
            .header("X-User-ID", OPERATOR)
            .json(&json!({
                "origin": "Pune",
                "destination": "Mumbai",
                "registration_no": "MH12AB1234",
                "layout_preset": "seater2x2",
                "departure_utc": departure.to_rfc3339(),
                "arrival_utc": arrival.to_rfc3339(),
                "fare_paise": fare_paise,
                "boarding_points": [
                    {"time": "06:00:00", "location_name": "Station Road", "landmark": "Near the flyover"}
                ],
                "dropping_points": [
                    {"time": "10:00:00", "location_name": "Central Depot"}
                ]
            }))
            .send()
            .await
            .expect("Failed to create schedule");
        assert_eq!(response.status(), 201, "schedule creation failed");
        response.json().await.expect("Invalid schedule response")
    }

    pub async fn reserve(&self, user: &str, schedule_id: &str, seats: &[&str]) -> reqwest::Response {
        let passengers: Vec<Value> = seats
            .iter()
            .enumerate()
            .map(|(i, _)| json!({"name": format!("Passenger {}", i + 1), "age": 30, "gender": "male"}))
            .collect();
        self.reserve_with(user, schedule_id, seats, passengers).await
    }

    pub async fn reserve_with(
        &self,
        user: &str,
        schedule_id: &str,
        seats: &[&str],
        passengers: Vec<Value>,
    ) -> reqwest::Response {
        self.client
            .post(format!("{}/reserve", self.address))
            .header("X-User-ID", user)
            .json(&json!({
                "schedule_id": schedule_id,
                "seats": seats,
                "passengers": passengers,
                "contact_phone": "9999900000",
                "contact_email": "buyer@example.com"
            }))
            .send()
            .await
            .expect("Failed to send reserve request")
    }

    pub async fn request_payment(&self, user: &str, booking_id: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/bookings/{}/payment", self.address, booking_id))
            .header("X-User-ID", user)
            .send()
            .await
            .expect("Failed to send payment request")
    }

    pub async fn get_booking(&self, user: &str, booking_id: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/bookings/{}", self.address, booking_id))
            .header("X-User-ID", user)
            .send()
            .await
            .expect("Failed to fetch booking")
    }

    pub async fn seatmap(&self, schedule_id: &str) -> Value {
        let response = self
            .client
            .get(format!("{}/schedules/{}/seatmap", self.address, schedule_id))
            .send()
            .await
            .expect("Failed to fetch seat map");
        assert_eq!(response.status(), 200, "seat map fetch failed");
        response.json().await.expect("Invalid seat map response")
    }

    /// Deliver a signed webhook body.
    pub async fn send_webhook(&self, body: &Value) -> reqwest::Response {
        let raw = body.to_string();
        self.client
            .post(format!("{}/webhooks/razorpay", self.address))
            .header("X-Razorpay-Signature", sign_webhook(&raw))
            .header("content-type", "application/json")
            .body(raw)
            .send()
            .await
            .expect("Failed to deliver webhook")
    }

    pub async fn webhook_captured(&self, order_id: &str, payment_id: &str) -> reqwest::Response {
        self.send_webhook(&payment_event("payment.captured", order_id, payment_id))
            .await
    }

    pub async fn webhook_failed(&self, order_id: &str, payment_id: &str) -> reqwest::Response {
        self.send_webhook(&payment_event("payment.failed", order_id, payment_id))
            .await
    }
}

pub fn payment_event(event: &str, order_id: &str, payment_id: &str) -> Value {
    json!({
        "event": event,
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": order_id,
                    "status": if event == "payment.captured" { "captured" } else { "failed" }
                }
            }
        }
    })
}

pub fn sign_webhook(raw_body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(raw_body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Drive a booking through reserve + request-payment; returns
/// `(booking_id, order_id)`.
pub async fn reserved_with_order(
    app: &TestApp,
    user: &str,
    schedule_id: &str,
    seats: &[&str],
) -> (String, String) {
    let response = app.reserve(user, schedule_id, seats).await;
    assert_eq!(response.status(), 201);
    let booking: Value = response.json().await.unwrap();
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let response = app.request_payment(user, &booking_id).await;
    assert_eq!(response.status(), 201);
    let order: Value = response.json().await.unwrap();
    let order_id = order["order_id"].as_str().unwrap().to_string();

    (booking_id, order_id)
}

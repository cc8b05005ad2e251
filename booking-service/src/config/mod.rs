use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub hold: HoldConfig,
    pub razorpay: RazorpayConfig,
    pub service_name: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct HoldConfig {
    /// Seat hold time-to-live during checkout.
    pub ttl_seconds: u64,
    /// Background expiry sweep cadence; 0 disables the sweep.
    pub sweep_interval_seconds: u64,
}

impl HoldConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_seconds as i64)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_seconds)
    }
}

#[derive(Clone, Debug)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub api_base_url: String,
    /// Disable only in development; webhooks are otherwise unauthenticated.
    pub verify_webhook: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("BOOKING_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("BOOKING_SERVICE_PORT")
            .unwrap_or_else(|_| "3004".to_string())
            .parse()?;

        let ttl_seconds = env::var("SEAT_HOLD_TTL_SECONDS")
            .unwrap_or_else(|_| "600".to_string())
            .parse()?;
        let sweep_interval_seconds = env::var("HOLD_SWEEP_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()?;

        let key_id = env::var("RAZORPAY_KEY_ID").unwrap_or_default();
        let key_secret = env::var("RAZORPAY_KEY_SECRET").unwrap_or_default();
        let webhook_secret = env::var("RAZORPAY_WEBHOOK_SECRET").unwrap_or_default();
        let api_base_url = env::var("RAZORPAY_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string());
        let verify_webhook = env::var("RAZORPAY_VERIFY_WEBHOOK")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Self {
            server: ServerConfig { host, port },
            hold: HoldConfig {
                ttl_seconds,
                sweep_interval_seconds,
            },
            razorpay: RazorpayConfig {
                key_id,
                key_secret: Secret::new(key_secret),
                webhook_secret: Secret::new(webhook_secret),
                api_base_url,
                verify_webhook,
            },
            service_name: "booking-service".to_string(),
        })
    }
}

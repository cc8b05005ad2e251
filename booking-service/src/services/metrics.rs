use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record a booking lifecycle transition.
pub fn record_booking(status: &str) {
    counter!("bookings_total", "status" => status.to_string()).increment(1);
}

/// Record seats claimed by a new hold.
pub fn record_hold_created(seats: usize) {
    counter!("seat_holds_created_total").increment(1);
    counter!("seats_held_total").increment(seats as u64);
}

/// Record holds reclaimed by the expiry sweep.
pub fn record_holds_expired(holds: usize) {
    counter!("seat_holds_expired_total").increment(holds as u64);
}

/// Record the outcome of a gateway webhook delivery.
pub fn record_webhook(event: &str, outcome: &str) {
    counter!(
        "payment_webhooks_total",
        "event" => event.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

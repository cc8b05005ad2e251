mod common;

use common::{payment_event, reserved_with_order, sign_webhook, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn full_booking_lifecycle_reaches_confirmed() {
    let app = TestApp::spawn().await;
    // Fare 500.00 -> two seats cost 1000.00.
    let schedule = app.seed_schedule(50_000).await;
    let schedule_id = schedule["id"].as_str().unwrap();

    let response = app.reserve("buyer-1", schedule_id, &["1A", "1B"]).await;
    assert_eq!(response.status(), 201);
    let booking: Value = response.json().await.unwrap();
    let booking_id = booking["id"].as_str().unwrap().to_string();
    assert_eq!(booking["amount_paise"], 100_000);

    let response = app.request_payment("buyer-1", &booking_id).await;
    assert_eq!(response.status(), 201);
    let order: Value = response.json().await.unwrap();
    let order_id = order["order_id"].as_str().unwrap().to_string();
    assert!(order_id.starts_with("order_demo_"));
    assert_eq!(order["amount_paise"], 100_000);
    assert_eq!(order["currency"], "INR");

    let booking: Value = app
        .get_booking("buyer-1", &booking_id)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(booking["status"], "PAYMENT_PENDING");

    let response = app.webhook_captured(&order_id, "pay_1").await;
    assert_eq!(response.status(), 200);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack["booking_id"], booking_id.as_str());
    assert_eq!(ack["status"], "CONFIRMED");

    let booking: Value = app
        .get_booking("buyer-1", &booking_id)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(booking["status"], "CONFIRMED");

    let seatmap = app.seatmap(schedule_id).await;
    assert_eq!(seatmap["seats"]["1A"]["status"], "SOLD");
    assert_eq!(seatmap["seats"]["1B"]["status"], "SOLD");
}

#[tokio::test]
async fn request_payment_is_idempotent_per_booking() {
    let app = TestApp::spawn().await;
    let schedule = app.seed_schedule(50_000).await;
    let schedule_id = schedule["id"].as_str().unwrap();

    let (booking_id, order_id) = reserved_with_order(&app, "buyer-1", schedule_id, &["2A"]).await;

    // A retry must not create a second order for the same booking.
    let response = app.request_payment("buyer-1", &booking_id).await;
    assert_eq!(response.status(), 200);
    let order: Value = response.json().await.unwrap();
    assert_eq!(order["order_id"].as_str().unwrap(), order_id);
}

#[tokio::test]
async fn duplicate_webhook_delivery_is_a_noop() {
    let app = TestApp::spawn().await;
    let schedule = app.seed_schedule(50_000).await;
    let schedule_id = schedule["id"].as_str().unwrap();

    let (booking_id, order_id) = reserved_with_order(&app, "buyer-1", schedule_id, &["3A"]).await;

    let first = app.webhook_captured(&order_id, "pay_dup").await;
    assert_eq!(first.status(), 200);
    let first_ack: Value = first.json().await.unwrap();
    assert_eq!(first_ack["status"], "CONFIRMED");

    // Redelivery acknowledges the same terminal booking, no error.
    let second = app.webhook_captured(&order_id, "pay_dup").await;
    assert_eq!(second.status(), 200);
    let second_ack: Value = second.json().await.unwrap();
    assert_eq!(second_ack["booking_id"], booking_id.as_str());
    assert_eq!(second_ack["status"], "CONFIRMED");

    let seatmap = app.seatmap(schedule_id).await;
    assert_eq!(seatmap["seats"]["3A"]["status"], "SOLD");
}

#[tokio::test]
async fn webhook_for_unknown_order_has_no_side_effects() {
    let app = TestApp::spawn().await;
    app.seed_schedule(50_000).await;

    let response = app.webhook_captured("order_ghost", "pay_ghost").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_rejected() {
    let app = TestApp::spawn().await;
    let schedule = app.seed_schedule(50_000).await;
    let schedule_id = schedule["id"].as_str().unwrap();

    let (booking_id, order_id) = reserved_with_order(&app, "buyer-1", schedule_id, &["4A"]).await;

    let body = payment_event("payment.captured", &order_id, "pay_forged").to_string();
    let response = app
        .client
        .post(format!("{}/webhooks/razorpay", app.address))
        .header("X-Razorpay-Signature", "not-a-real-signature")
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // And without any signature header at all.
    let body = payment_event("payment.captured", &order_id, "pay_forged").to_string();
    let response = app
        .client
        .post(format!("{}/webhooks/razorpay", app.address))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let booking: Value = app
        .get_booking("buyer-1", &booking_id)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(booking["status"], "PAYMENT_PENDING");
}

#[tokio::test]
async fn failed_payment_webhook_releases_the_seats() {
    let app = TestApp::spawn().await;
    let schedule = app.seed_schedule(50_000).await;
    let schedule_id = schedule["id"].as_str().unwrap();

    let (booking_id, order_id) = reserved_with_order(&app, "buyer-1", schedule_id, &["5A"]).await;

    let response = app.webhook_failed(&order_id, "pay_failed").await;
    assert_eq!(response.status(), 200);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack["status"], "FAILED");

    // Seats are back in the pool immediately, not after the TTL.
    let seatmap = app.seatmap(schedule_id).await;
    assert_eq!(seatmap["seats"]["5A"]["status"], "AVAILABLE");
    let response = app.reserve("buyer-2", schedule_id, &["5A"]).await;
    assert_eq!(response.status(), 201);

    let booking: Value = app
        .get_booking("buyer-1", &booking_id)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(booking["status"], "FAILED");
}

#[tokio::test]
async fn order_paid_event_confirms_via_the_order_entity() {
    let app = TestApp::spawn().await;
    let schedule = app.seed_schedule(50_000).await;
    let schedule_id = schedule["id"].as_str().unwrap();

    let (_, order_id) = reserved_with_order(&app, "buyer-1", schedule_id, &["6A"]).await;

    // order.paid carries no payment entity, only the order id.
    let body = json!({
        "event": "order.paid",
        "payload": { "order": { "entity": { "id": order_id } } }
    });
    let response = app.send_webhook(&body).await;
    assert_eq!(response.status(), 200);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack["status"], "CONFIRMED");
}

#[tokio::test]
async fn unhandled_webhook_events_are_acknowledged() {
    let app = TestApp::spawn().await;
    let schedule = app.seed_schedule(50_000).await;
    let schedule_id = schedule["id"].as_str().unwrap();

    let (_, order_id) = reserved_with_order(&app, "buyer-1", schedule_id, &["7A"]).await;

    let body = payment_event("refund.created", &order_id, "pay_refund");
    let response = app.send_webhook(&body).await;
    assert_eq!(response.status(), 200);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack["ok"], true);
    assert!(ack.get("status").is_none());
}

#[tokio::test]
async fn request_payment_is_owner_only() {
    let app = TestApp::spawn().await;
    let schedule = app.seed_schedule(50_000).await;
    let schedule_id = schedule["id"].as_str().unwrap();

    let response = app.reserve("buyer-1", schedule_id, &["8A"]).await;
    assert_eq!(response.status(), 201);
    let booking: Value = response.json().await.unwrap();
    let booking_id = booking["id"].as_str().unwrap();

    let response = app.request_payment("intruder", booking_id).await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn signature_covers_the_exact_raw_body() {
    let app = TestApp::spawn().await;
    let schedule = app.seed_schedule(50_000).await;
    let schedule_id = schedule["id"].as_str().unwrap();

    let (_, order_id) = reserved_with_order(&app, "buyer-1", schedule_id, &["9A"]).await;

    // Sign one body, deliver another: must be rejected.
    let signed_body = payment_event("payment.captured", &order_id, "pay_a").to_string();
    let delivered_body = payment_event("payment.captured", &order_id, "pay_b").to_string();
    let response = app
        .client
        .post(format!("{}/webhooks/razorpay", app.address))
        .header("X-Razorpay-Signature", sign_webhook(&signed_body))
        .header("content-type", "application/json")
        .body(delivered_body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

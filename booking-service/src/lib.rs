pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{
    sweeper, BookingRepository, BookingService, EventBus, HoldManager, PaymentProcessor,
    RazorpayClient, SeatInventory,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub repository: Arc<BookingRepository>,
    pub inventory: Arc<SeatInventory>,
    pub holds: Arc<HoldManager>,
    pub bookings: Arc<BookingService>,
    pub payments: Arc<PaymentProcessor>,
    pub gateway: RazorpayClient,
    pub events: Arc<EventBus>,
}

pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let repository = Arc::new(BookingRepository::new());
        let inventory = Arc::new(SeatInventory::new());
        let holds = Arc::new(HoldManager::new(Arc::clone(&inventory)));
        let events = Arc::new(EventBus::default());

        let gateway = RazorpayClient::new(config.razorpay.clone());
        if gateway.is_configured() {
            tracing::info!("Razorpay client initialized");
        } else {
            tracing::warn!("Razorpay credentials not configured - running in demo payment mode");
        }

        let bookings = Arc::new(BookingService::new(
            Arc::clone(&repository),
            Arc::clone(&holds),
            gateway.clone(),
            config.hold.ttl(),
        ));
        let payments = Arc::new(PaymentProcessor::new(
            Arc::clone(&repository),
            Arc::clone(&holds),
            Arc::clone(&events),
        ));

        let state = AppState {
            config: config.clone(),
            repository,
            inventory,
            holds,
            bookings,
            payments,
            gateway,
            events,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics))
            // Schedules and the read side buyers browse
            .route(
                "/schedules",
                get(handlers::schedules::list_schedules)
                    .post(handlers::schedules::create_schedule),
            )
            .route("/schedules/:id", get(handlers::schedules::get_schedule))
            .route(
                "/schedules/:id/boarding-points",
                get(handlers::schedules::boarding_points),
            )
            .route(
                "/schedules/:id/dropping-points",
                get(handlers::schedules::dropping_points),
            )
            .route("/schedules/:id/seatmap", get(handlers::schedules::seatmap))
            // Booking lifecycle
            .route("/reserve", post(handlers::bookings::reserve))
            .route("/bookings", get(handlers::bookings::list_bookings))
            .route("/bookings/:id", get(handlers::bookings::get_booking))
            .route(
                "/bookings/:id/payment",
                post(handlers::bookings::request_payment),
            )
            // Gateway callbacks
            .route("/webhooks/razorpay", post(handlers::webhook::razorpay_webhook))
            .layer(from_fn(metrics_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        user_id = tracing::field::Empty,
                    )
                }),
            )
            .with_state(state.clone());

        // Port 0 binds a random free port, which tests rely on.
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or(self.state.config.server.port)
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve until the listener fails, with the hold expiry sweep running
    /// alongside.
    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        let sweeper = sweeper::spawn_sweeper(
            Arc::clone(&self.state.bookings),
            self.state.config.hold.sweep_interval(),
        );

        let result = axum::serve(self.listener, self.router).await;

        if let Some(handle) = sweeper {
            handle.abort();
        }
        result?;
        Ok(())
    }
}

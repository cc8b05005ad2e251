pub mod bookings;
pub mod error;
pub mod events;
pub mod gateway;
pub mod holds;
pub mod inventory;
pub mod metrics;
pub mod payments;
pub mod repository;
pub mod sweeper;

pub use bookings::{BookingService, ReserveRequest};
pub use error::BookingError;
pub use events::{DomainEvent, EventBus};
pub use gateway::RazorpayClient;
pub use holds::HoldManager;
pub use inventory::{SeatInventory, SeatSnapshot, SeatState};
pub use payments::PaymentProcessor;
pub use repository::BookingRepository;

/// The engine is single-currency by design.
pub const CURRENCY: &str = "INR";

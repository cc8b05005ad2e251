pub mod booking;
pub mod hold;
pub mod layout;
pub mod payment;
pub mod schedule;

pub use booking::{Booking, BookingStatus, Gender, Passenger};
pub use hold::{HoldToken, ReservationHold};
pub use layout::{LayoutPreset, SeatLayout, SeatType};
pub use payment::{PaymentOrder, PaymentOrderStatus};
pub use schedule::{BoardingPoint, Bus, DroppingPoint, Route, Schedule, ScheduleStatus};

pub mod availability;
pub mod booking;
pub mod catalog;
pub mod inventory;
pub mod seat_map;
pub mod seed;

pub use availability::{Availability, AvailabilityCalculator, SeatAvailability};
pub use booking::{BookingEngine, BookingError, Cancellation, ReserveRequest, Reservation};
pub use catalog::{CatalogError, CatalogService, ShowtimeSummary, TheaterView};
pub use inventory::SeatInventory;

use serde::Serialize;

use super::inventory::SeatInventory;
use crate::models::{Seat, ShowtimeContext};
use crate::store::{Store, StoreResult};
use std::sync::Arc;

/// Availability numbers for one showtime. `available + booked == total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub showtime_id: i64,
    pub total: i64,
    pub booked: i64,
    pub available: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAvailability {
    pub showtime_id: i64,
    pub seats: Vec<Seat>,
    pub available_count: i64,
    pub total_seats: i64,
}

/// Reads always materialize the inventory first, so every count comes from real seat rows
/// and never from the theater's nominal capacity.
#[derive(Clone)]
pub struct AvailabilityCalculator {
    store: Arc<dyn Store>,
    inventory: SeatInventory,
}

impl AvailabilityCalculator {
    pub fn new(store: Arc<dyn Store>, inventory: SeatInventory) -> Self {
        Self { store, inventory }
    }

    pub async fn count_available(&self, showtime: &ShowtimeContext) -> StoreResult<Availability> {
        self.inventory.ensure_generated(showtime).await?;
        let counts = self.store.seat_counts(showtime.id()).await?;
        Ok(Availability {
            showtime_id: showtime.id(),
            total: counts.total,
            booked: counts.booked,
            available: counts.available(),
        })
    }

    /// Full seat map plus the available count, taken from the same listing so the two agree.
    pub async fn snapshot(&self, showtime: &ShowtimeContext) -> StoreResult<SeatAvailability> {
        let seats = self.inventory.list_seats(showtime).await?;
        let available_count = seats.iter().filter(|s| !s.is_booked).count() as i64;
        Ok(SeatAvailability {
            showtime_id: showtime.id(),
            total_seats: seats.len() as i64,
            seats,
            available_count,
        })
    }

    pub async fn available_seats(&self, showtime: &ShowtimeContext) -> StoreResult<Vec<Seat>> {
        self.inventory.list_available(showtime).await
    }
}

use std::sync::Arc;
use tracing::{debug, info};

use super::seat_map;
use crate::models::{Seat, SeatFilter, SeatLabel, ShowtimeContext};
use crate::store::{Store, StoreResult};

/// Per-showtime seat records, seeded lazily from the theater layout.
#[derive(Clone)]
pub struct SeatInventory {
    store: Arc<dyn Store>,
}

impl SeatInventory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates the showtime's seat rows if they are not all there yet.
    ///
    /// Safe to race: the store inserts with insert-if-absent semantics on
    /// `(showtime_id, label)`, so concurrent first accesses never duplicate a seat. A stale
    /// `showtime` (deleted or moved since it was read) creates nothing.
    /// Returns how many rows this call created.
    pub async fn ensure_generated(&self, showtime: &ShowtimeContext) -> StoreResult<u64> {
        let counts = self.store.seat_counts(showtime.id()).await?;
        if counts.total >= showtime.capacity() {
            return Ok(0);
        }

        let labels = seat_map::generate(showtime.theater.seat_rows, showtime.theater.seat_columns);
        let inserted = self.store.insert_seats_if_absent(showtime, &labels).await?;
        if inserted > 0 {
            info!(
                "Generated {} seats for showtime {} (theater {})",
                inserted,
                showtime.id(),
                showtime.theater.id
            );
        } else {
            debug!(
                "No seats generated for showtime {}: already present or showtime changed",
                showtime.id()
            );
        }
        Ok(inserted)
    }

    pub async fn list_seats(&self, showtime: &ShowtimeContext) -> StoreResult<Vec<Seat>> {
        self.ensure_generated(showtime).await?;
        self.store.seats(showtime.id(), SeatFilter::All).await
    }

    pub async fn list_available(&self, showtime: &ShowtimeContext) -> StoreResult<Vec<Seat>> {
        self.ensure_generated(showtime).await?;
        self.store.seats(showtime.id(), SeatFilter::Available).await
    }

    pub async fn list_booked(&self, showtime: &ShowtimeContext) -> StoreResult<Vec<Seat>> {
        self.ensure_generated(showtime).await?;
        self.store.seats(showtime.id(), SeatFilter::Booked).await
    }

    /// Seat rows for the given labels. Fewer rows than distinct labels means some label
    /// does not exist for this showtime.
    pub async fn find_by_labels(
        &self,
        showtime: &ShowtimeContext,
        labels: &[SeatLabel],
    ) -> StoreResult<Vec<Seat>> {
        self.ensure_generated(showtime).await?;
        self.store.seats_by_labels(showtime.id(), labels).await
    }
}

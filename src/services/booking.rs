//! booking.rs
//!
//! Booking engine: turns a requested seat selection into a booking, and a cancellation back
//! into free seats.
//!
//! Every seat is either FREE or RESERVED. `reserve` moves a whole selection FREE -> RESERVED
//! in one atomic store call or moves nothing; `cancel` moves a booking's seats back and
//! deletes the booking in one atomic store call. All checks that can fail without touching
//! state (validation, showtime and seat lookup) run before the mutating step, so a rejected
//! request can be retried with no side effects.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::availability::AvailabilityCalculator;
use super::inventory::SeatInventory;
use crate::config::BookingConfig;
use crate::models::{Booking, NewBooking, SeatLabel, ShowtimeContext};
use crate::store::{ReserveOutcome, Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Seats not found for this showtime: {}", .0.join(", "))]
    SeatNotFound(Vec<String>),
    #[error("One or more selected seats are not available: {}", .0.join(", "))]
    SeatUnavailable(Vec<String>),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// Typed reservation input, as posted by clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    pub showtime_id: i64,
    pub num_tickets: i32,
    #[serde(default)]
    pub selected_seats: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub booking: Booking,
    /// Fresh count after the flip. `None` if it could not be read; the booking still stands.
    pub available_seats: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub booking_id: i64,
    pub showtime_id: i64,
    pub released_seats: Vec<String>,
    pub available_seats: Option<i64>,
}

#[derive(Clone)]
pub struct BookingEngine {
    store: Arc<dyn Store>,
    availability: AvailabilityCalculator,
    inventory: SeatInventory,
    config: BookingConfig,
}

impl BookingEngine {
    pub fn new(store: Arc<dyn Store>, config: BookingConfig) -> Self {
        let inventory = SeatInventory::new(store.clone());
        let availability = AvailabilityCalculator::new(store.clone(), inventory.clone());
        Self {
            store,
            availability,
            inventory,
            config,
        }
    }

    pub fn inventory(&self) -> &SeatInventory {
        &self.inventory
    }

    pub fn availability(&self) -> &AvailabilityCalculator {
        &self.availability
    }

    /// Reserves every seat in `request.selected_seats` for `user_id`, or none of them.
    pub async fn reserve(&self, user_id: i64, request: ReserveRequest) -> Result<Reservation, BookingError> {
        let (labels, unparsable) = self.validate(&request)?;

        let showtime = self
            .store
            .showtime(request.showtime_id)
            .await?
            .ok_or_else(|| BookingError::NotFound("Showtime not found".to_string()))?;

        let unknown = self.unknown_labels(&showtime, &labels, unparsable).await?;
        if !unknown.is_empty() {
            return Err(BookingError::SeatNotFound(unknown));
        }

        let booking = self.reserve_with_retry(user_id, &showtime, labels).await?;
        info!(
            "Booking {} created: user {} reserved {} seats for showtime {}",
            booking.id,
            user_id,
            booking.seat_labels.len(),
            showtime.id()
        );

        let available_seats = self.fresh_count(&showtime).await;
        Ok(Reservation { booking, available_seats })
    }

    /// Cancels a booking owned by `user_id` and returns its seats to the free pool.
    pub async fn cancel(&self, user_id: i64, booking_id: i64) -> Result<Cancellation, BookingError> {
        self.owned_booking(user_id, booking_id).await?;

        let mut attempt = 0;
        let released = loop {
            match self.store.release_booking(booking_id).await {
                Ok(Some(released)) => break released,
                // lost a race with another cancel of the same booking
                Ok(None) => return Err(BookingError::NotFound("Booking not found".to_string())),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!("Cancel of booking {} hit a conflict, retry {}", booking_id, attempt);
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(e) => {
                    error!("Failed to cancel booking {}: {}", booking_id, e);
                    return Err(e.into());
                }
            }
        };

        let showtime_id = released.booking.showtime_id;
        info!(
            "Booking {} cancelled: {} seats released for showtime {}",
            booking_id,
            released.released.len(),
            showtime_id
        );

        let available_seats = match self.store.showtime(showtime_id).await {
            Ok(Some(showtime)) => self.fresh_count(&showtime).await,
            Ok(None) => None,
            Err(e) => {
                warn!("Showtime {} lookup after cancel failed: {}", showtime_id, e);
                None
            }
        };

        Ok(Cancellation {
            booking_id,
            showtime_id,
            released_seats: released.released,
            available_seats,
        })
    }

    /// A single booking, visible only to its owner.
    pub async fn owned_booking(&self, user_id: i64, booking_id: i64) -> Result<Booking, BookingError> {
        let booking = self
            .store
            .booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound("Booking not found".to_string()))?;
        if booking.user_id != user_id {
            return Err(BookingError::Forbidden(
                "You can only access your own bookings".to_string(),
            ));
        }
        Ok(booking)
    }

    pub async fn bookings_for_user(&self, user_id: i64) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.bookings_for_user(user_id).await?)
    }

    pub async fn all_bookings(&self) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.all_bookings().await?)
    }

    /// Step 1: shape checks. Returns the parsed labels in seat order plus the raw strings that
    /// are not seat labels at all.
    fn validate(&self, request: &ReserveRequest) -> Result<(Vec<SeatLabel>, Vec<String>), BookingError> {
        if request.selected_seats.is_empty() {
            return Err(BookingError::InvalidRequest("No seats selected".to_string()));
        }
        if request.num_tickets <= 0 || request.selected_seats.len() != request.num_tickets as usize {
            return Err(BookingError::InvalidRequest(
                "Number of selected seats doesn't match ticket count".to_string(),
            ));
        }
        if request.selected_seats.len() > self.config.max_seats_per_booking {
            return Err(BookingError::InvalidRequest(format!(
                "At most {} seats can be booked at once",
                self.config.max_seats_per_booking
            )));
        }

        let mut labels = BTreeSet::new();
        let mut unparsable = Vec::new();
        for raw in &request.selected_seats {
            match raw.parse::<SeatLabel>() {
                Ok(label) => {
                    if !labels.insert(label) {
                        return Err(BookingError::InvalidRequest(format!(
                            "Seat {} is selected more than once",
                            label
                        )));
                    }
                }
                Err(_) => unparsable.push(raw.clone()),
            }
        }
        Ok((labels.into_iter().collect(), unparsable))
    }

    /// Step 2: every label must resolve to a seat row of this showtime.
    async fn unknown_labels(
        &self,
        showtime: &ShowtimeContext,
        labels: &[SeatLabel],
        mut unknown: Vec<String>,
    ) -> Result<Vec<String>, BookingError> {
        let seats = self.inventory.find_by_labels(showtime, labels).await?;
        if seats.len() != labels.len() {
            let found: BTreeSet<&str> = seats.iter().map(|s| s.label.as_str()).collect();
            unknown.extend(
                labels
                    .iter()
                    .map(ToString::to_string)
                    .filter(|label| !found.contains(label.as_str())),
            );
        }
        Ok(unknown)
    }

    /// Steps 3-4: atomic check-and-flip plus booking insert. Storage conflicts are retried a
    /// bounded number of times, then reported as unavailable seats.
    async fn reserve_with_retry(
        &self,
        user_id: i64,
        showtime: &ShowtimeContext,
        labels: Vec<SeatLabel>,
    ) -> Result<Booking, BookingError> {
        let mut attempt = 0;
        loop {
            let request = NewBooking {
                user_id,
                showtime_id: showtime.id(),
                seat_labels: labels.clone(),
                created_at: Utc::now(),
            };
            match self.store.reserve_seats(request).await {
                Ok(ReserveOutcome::Reserved(booking)) => return Ok(booking),
                Ok(ReserveOutcome::Unavailable(taken)) => {
                    let taken: Vec<String> = taken.iter().map(ToString::to_string).collect();
                    warn!(
                        "Showtime {}: seats {:?} already booked, rejecting request of user {}",
                        showtime.id(),
                        taken,
                        user_id
                    );
                    return Err(BookingError::SeatUnavailable(taken));
                }
                Ok(ReserveOutcome::Missing(missing)) => {
                    return Err(BookingError::SeatNotFound(
                        missing.iter().map(ToString::to_string).collect(),
                    ));
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!("Showtime {}: reservation conflict, retry {}", showtime.id(), attempt);
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        "Showtime {}: giving up after {} conflicting attempts",
                        showtime.id(),
                        attempt + 1
                    );
                    return Err(BookingError::SeatUnavailable(
                        labels.iter().map(ToString::to_string).collect(),
                    ));
                }
                Err(e) => {
                    error!("Showtime {}: reservation failed: {}", showtime.id(), e);
                    return Err(e.into());
                }
            }
        }
    }

    async fn fresh_count(&self, showtime: &ShowtimeContext) -> Option<i64> {
        match self.availability.count_available(showtime).await {
            Ok(availability) => Some(availability.available),
            Err(e) => {
                warn!("Could not refresh availability for showtime {}: {}", showtime.id(), e);
                None
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.config.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

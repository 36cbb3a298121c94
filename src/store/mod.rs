//! Storage seam for the catalog, the per-showtime seat inventory and the booking records.
//!
//! Two implementations exist: [`postgres::PgStore`] for deployments and
//! [`memory::MemoryStore`] for tests and single-process runs. Both guarantee that
//! [`BookingStore::reserve_seats`] and [`BookingStore::release_booking`] are all-or-nothing
//! and serialized per seat, so concurrent requests on one showtime can never claim the same
//! seat twice.

use async_trait::async_trait;

use crate::models::{
    Booking, Movie, NewBooking, NewMovie, NewShowtime, NewTheater, NewUser, Seat, SeatCounts,
    SeatFilter, SeatLabel, Showtime, ShowtimeContext, Theater, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Serialization failure or deadlock; the operation changed nothing and may be retried.
    #[error("concurrent update conflict")]
    Conflict,
    #[error("integrity violation: {0}")]
    Integrity(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of the atomic check-and-flip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved(Booking),
    /// Some labels have no seat row for the showtime. Nothing was changed.
    Missing(Vec<SeatLabel>),
    /// Some seats were already booked at flip time. Nothing was changed.
    Unavailable(Vec<SeatLabel>),
}

/// Result of a catalog update that may conflict with an existing seat inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogUpdate<T> {
    Updated(T),
    NotFound,
    /// The change would alter the layout of a showtime that already has seat rows.
    InventoryExists,
}

/// A cancelled booking and the seats that went back to the free pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedBooking {
    pub booking: Booking,
    pub released: Vec<String>,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_theater(&self, theater: NewTheater) -> StoreResult<Theater>;
    async fn theaters(&self, active_only: bool) -> StoreResult<Vec<Theater>>;
    async fn theater(&self, id: i64) -> StoreResult<Option<Theater>>;
    async fn set_theater_active(&self, id: i64, active: bool) -> StoreResult<Option<Theater>>;
    /// Case-insensitive substring match on the name, ordered by id.
    async fn theaters_by_name(&self, fragment: &str) -> StoreResult<Vec<Theater>>;
    async fn count_active_theaters(&self) -> StoreResult<i64>;
    /// Replaces name, description and layout. A layout change is refused once any showtime
    /// in the theater has seat rows. `is_active` is left alone.
    async fn update_theater(&self, id: i64, theater: NewTheater) -> StoreResult<CatalogUpdate<Theater>>;
    /// Deletes the theater and cascades through its showtimes, seats and bookings.
    /// Returns the ids of the removed showtimes, or `None` if the theater did not exist.
    async fn delete_theater(&self, id: i64) -> StoreResult<Option<Vec<i64>>>;

    async fn insert_movie(&self, movie: NewMovie) -> StoreResult<Movie>;
    async fn movies(&self) -> StoreResult<Vec<Movie>>;
    async fn movie(&self, id: i64) -> StoreResult<Option<Movie>>;
    async fn count_movies(&self) -> StoreResult<i64>;
    async fn update_movie(&self, id: i64, movie: NewMovie) -> StoreResult<Option<Movie>>;
    /// Same cascade as [`CatalogStore::delete_theater`], through the movie's showtimes.
    async fn delete_movie(&self, id: i64) -> StoreResult<Option<Vec<i64>>>;

    async fn insert_showtime(&self, showtime: NewShowtime) -> StoreResult<Showtime>;
    /// Showtimes ordered by start time, optionally limited to one movie.
    async fn showtimes(&self, movie_id: Option<i64>) -> StoreResult<Vec<ShowtimeContext>>;
    async fn showtime(&self, id: i64) -> StoreResult<Option<ShowtimeContext>>;
    /// Moving a showtime to another theater is refused once it has seat rows; bookings
    /// can only exist on seat rows, so held bookings block it too.
    async fn update_showtime(
        &self,
        id: i64,
        showtime: NewShowtime,
    ) -> StoreResult<CatalogUpdate<ShowtimeContext>>;
    /// Removes the showtime with its seats and bookings. Returns false if it did not exist.
    async fn delete_showtime(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait SeatStore: Send + Sync {
    /// Inserts one free seat per label, skipping labels the showtime already has.
    /// Returns how many rows were actually created.
    ///
    /// `showtime` may be stale. Nothing is inserted when the showtime has since been deleted
    /// or no longer sits in a theater with the same layout.
    async fn insert_seats_if_absent(&self, showtime: &ShowtimeContext, labels: &[SeatLabel]) -> StoreResult<u64>;
    /// Seats ordered row-major with numeric columns.
    async fn seats(&self, showtime_id: i64, filter: SeatFilter) -> StoreResult<Vec<Seat>>;
    async fn seats_by_labels(&self, showtime_id: i64, labels: &[SeatLabel]) -> StoreResult<Vec<Seat>>;
    async fn seat_counts(&self, showtime_id: i64) -> StoreResult<SeatCounts>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Flips every requested seat from free to booked and inserts the booking, or changes
    /// nothing at all.
    async fn reserve_seats(&self, booking: NewBooking) -> StoreResult<ReserveOutcome>;
    /// Frees the booking's seats and deletes it in one step. `None` if it no longer exists.
    async fn release_booking(&self, booking_id: i64) -> StoreResult<Option<ReleasedBooking>>;
    async fn booking(&self, id: i64) -> StoreResult<Option<Booking>>;
    /// Newest first.
    async fn bookings_for_user(&self, user_id: i64) -> StoreResult<Vec<Booking>>;
    async fn all_bookings(&self) -> StoreResult<Vec<Booking>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    /// Inserts the user unless the username is taken; returns the stored row either way.
    async fn insert_user_if_absent(&self, user: NewUser) -> StoreResult<User>;
}

pub trait Store: CatalogStore + SeatStore + BookingStore + UserStore {}

impl<T> Store for T where T: CatalogStore + SeatStore + BookingStore + UserStore {}

//! In-process store.
//!
//! Each showtime's inventory sits behind its own mutex, so reserve/cancel on one showtime
//! never waits on another. Lock order is always inventory first (ascending showtime id when
//! several are held), then the catalog, then the booking table.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    BookingStore, CatalogStore, CatalogUpdate, ReleasedBooking, ReserveOutcome, SeatStore,
    StoreError, StoreResult, UserStore,
};
use crate::models::{
    Booking, Movie, NewBooking, NewMovie, NewShowtime, NewTheater, NewUser, Seat, SeatCounts,
    SeatFilter, SeatLabel, Showtime, ShowtimeContext, Theater, User,
};

#[derive(Debug, Clone, Copy)]
struct SeatSlot {
    id: i64,
    booking_id: Option<i64>,
}

#[derive(Debug, Default)]
struct Inventory {
    seats: BTreeMap<SeatLabel, SeatSlot>,
}

impl Inventory {
    fn to_seat(showtime_id: i64, label: &SeatLabel, slot: &SeatSlot) -> Seat {
        Seat {
            id: slot.id,
            showtime_id,
            label: label.to_string(),
            row_index: i32::from(label.row_index()),
            column_number: i32::from(label.column()),
            is_booked: slot.booking_id.is_some(),
            booking_id: slot.booking_id,
        }
    }
}

#[derive(Debug, Default)]
struct Catalog {
    theaters: BTreeMap<i64, Theater>,
    movies: BTreeMap<i64, Movie>,
    showtimes: BTreeMap<i64, Showtime>,
    users: BTreeMap<i64, User>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
    inventories: RwLock<HashMap<i64, Arc<Mutex<Inventory>>>>,
    bookings: RwLock<BTreeMap<i64, Booking>>,
    next_id: AtomicI64,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Inventory handle for a showtime, created empty on first use.
    fn inventory(&self, showtime_id: i64) -> Arc<Mutex<Inventory>> {
        if let Some(inventory) = read(&self.inventories).get(&showtime_id) {
            return inventory.clone();
        }
        write(&self.inventories).entry(showtime_id).or_default().clone()
    }

    fn existing_inventory(&self, showtime_id: i64) -> Option<Arc<Mutex<Inventory>>> {
        read(&self.inventories).get(&showtime_id).cloned()
    }

    /// False once the handle was dropped from the map while its caller waited on the lock.
    fn is_current(&self, showtime_id: i64, handle: &Arc<Mutex<Inventory>>) -> bool {
        read(&self.inventories)
            .get(&showtime_id)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
    }

    fn discard_inventory(&self, showtime_id: i64, handle: &Arc<Mutex<Inventory>>) {
        let mut inventories = write(&self.inventories);
        if inventories.get(&showtime_id).is_some_and(|current| Arc::ptr_eq(current, handle)) {
            inventories.remove(&showtime_id);
        }
    }

    /// Drops seats and bookings of a showtime whose catalog entry is already gone.
    fn purge_showtime(&self, showtime_id: i64) {
        let inventory = write(&self.inventories).remove(&showtime_id);
        // hold the inventory lock so no reservation lands between the two removals
        let _guard = inventory.as_ref().map(|inv| lock(inv));
        write(&self.bookings).retain(|_, b| b.showtime_id != showtime_id);
    }

    fn remove_showtimes(catalog: &mut Catalog, matches: impl Fn(&Showtime) -> bool) -> Vec<i64> {
        let ids: Vec<i64> = catalog
            .showtimes
            .values()
            .filter(|s| matches(s))
            .map(|s| s.id)
            .collect();
        for id in &ids {
            catalog.showtimes.remove(id);
        }
        ids
    }

    fn showtimes_in(catalog: &Catalog, theater_id: i64) -> Vec<i64> {
        catalog
            .showtimes
            .values()
            .filter(|s| s.theater_id == theater_id)
            .map(|s| s.id)
            .collect()
    }

    fn context(catalog: &Catalog, showtime: &Showtime) -> StoreResult<ShowtimeContext> {
        let theater = catalog.theaters.get(&showtime.theater_id).cloned().ok_or_else(|| {
            StoreError::Integrity(format!(
                "showtime {} references missing theater {}",
                showtime.id, showtime.theater_id
            ))
        })?;
        Ok(ShowtimeContext { showtime: showtime.clone(), theater })
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_theater(&self, theater: NewTheater) -> StoreResult<Theater> {
        let theater = Theater {
            id: self.next_id(),
            name: theater.name,
            description: theater.description,
            seat_rows: theater.seat_rows,
            seat_columns: theater.seat_columns,
            is_active: true,
        };
        write(&self.catalog).theaters.insert(theater.id, theater.clone());
        Ok(theater)
    }

    async fn theaters(&self, active_only: bool) -> StoreResult<Vec<Theater>> {
        Ok(read(&self.catalog)
            .theaters
            .values()
            .filter(|t| !active_only || t.is_active)
            .cloned()
            .collect())
    }

    async fn theater(&self, id: i64) -> StoreResult<Option<Theater>> {
        Ok(read(&self.catalog).theaters.get(&id).cloned())
    }

    async fn set_theater_active(&self, id: i64, active: bool) -> StoreResult<Option<Theater>> {
        let mut catalog = write(&self.catalog);
        Ok(catalog.theaters.get_mut(&id).map(|t| {
            t.is_active = active;
            t.clone()
        }))
    }

    async fn theaters_by_name(&self, fragment: &str) -> StoreResult<Vec<Theater>> {
        let fragment = fragment.to_lowercase();
        Ok(read(&self.catalog)
            .theaters
            .values()
            .filter(|t| t.name.to_lowercase().contains(&fragment))
            .cloned()
            .collect())
    }

    async fn count_active_theaters(&self) -> StoreResult<i64> {
        Ok(read(&self.catalog).theaters.values().filter(|t| t.is_active).count() as i64)
    }

    async fn update_theater(&self, id: i64, update: NewTheater) -> StoreResult<CatalogUpdate<Theater>> {
        loop {
            // BTreeMap order, so the inventories below are locked by ascending showtime id
            let showtime_ids = Self::showtimes_in(&read(&self.catalog), id);
            let handles: Vec<_> = showtime_ids.iter().map(|&s| self.inventory(s)).collect();
            let inventories: Vec<_> = handles.iter().map(|h| lock(h)).collect();
            let mut catalog = write(&self.catalog);
            if Self::showtimes_in(&catalog, id) != showtime_ids {
                continue;
            }

            let Some(theater) = catalog.theaters.get_mut(&id) else {
                return Ok(CatalogUpdate::NotFound);
            };
            let relayout = theater.seat_rows != update.seat_rows || theater.seat_columns != update.seat_columns;
            if relayout && inventories.iter().any(|inv| !inv.seats.is_empty()) {
                return Ok(CatalogUpdate::InventoryExists);
            }
            theater.name = update.name;
            theater.description = update.description;
            theater.seat_rows = update.seat_rows;
            theater.seat_columns = update.seat_columns;
            return Ok(CatalogUpdate::Updated(theater.clone()));
        }
    }

    async fn delete_theater(&self, id: i64) -> StoreResult<Option<Vec<i64>>> {
        let removed = {
            let mut catalog = write(&self.catalog);
            if catalog.theaters.remove(&id).is_none() {
                return Ok(None);
            }
            Self::remove_showtimes(&mut catalog, |s| s.theater_id == id)
        };
        for &showtime_id in &removed {
            self.purge_showtime(showtime_id);
        }
        Ok(Some(removed))
    }

    async fn insert_movie(&self, movie: NewMovie) -> StoreResult<Movie> {
        let movie = Movie {
            id: self.next_id(),
            title: movie.title,
            description: movie.description,
            duration_minutes: movie.duration_minutes,
            genre: movie.genre,
            rating: movie.rating,
        };
        write(&self.catalog).movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn movies(&self) -> StoreResult<Vec<Movie>> {
        Ok(read(&self.catalog).movies.values().cloned().collect())
    }

    async fn movie(&self, id: i64) -> StoreResult<Option<Movie>> {
        Ok(read(&self.catalog).movies.get(&id).cloned())
    }

    async fn count_movies(&self) -> StoreResult<i64> {
        Ok(read(&self.catalog).movies.len() as i64)
    }

    async fn update_movie(&self, id: i64, update: NewMovie) -> StoreResult<Option<Movie>> {
        let mut catalog = write(&self.catalog);
        Ok(catalog.movies.get_mut(&id).map(|movie| {
            movie.title = update.title;
            movie.description = update.description;
            movie.duration_minutes = update.duration_minutes;
            movie.genre = update.genre;
            movie.rating = update.rating;
            movie.clone()
        }))
    }

    async fn delete_movie(&self, id: i64) -> StoreResult<Option<Vec<i64>>> {
        let removed = {
            let mut catalog = write(&self.catalog);
            if catalog.movies.remove(&id).is_none() {
                return Ok(None);
            }
            Self::remove_showtimes(&mut catalog, |s| s.movie_id == id)
        };
        for &showtime_id in &removed {
            self.purge_showtime(showtime_id);
        }
        Ok(Some(removed))
    }

    async fn insert_showtime(&self, showtime: NewShowtime) -> StoreResult<Showtime> {
        let mut catalog = write(&self.catalog);
        if !catalog.movies.contains_key(&showtime.movie_id)
            || !catalog.theaters.contains_key(&showtime.theater_id)
        {
            return Err(StoreError::Integrity(
                "showtime must reference an existing movie and theater".to_string(),
            ));
        }
        let showtime = Showtime {
            id: self.next_id(),
            movie_id: showtime.movie_id,
            theater_id: showtime.theater_id,
            starts_at: showtime.starts_at,
        };
        catalog.showtimes.insert(showtime.id, showtime.clone());
        Ok(showtime)
    }

    async fn showtimes(&self, movie_id: Option<i64>) -> StoreResult<Vec<ShowtimeContext>> {
        let catalog = read(&self.catalog);
        let mut showtimes = catalog
            .showtimes
            .values()
            .filter(|s| movie_id.map_or(true, |m| s.movie_id == m))
            .map(|s| Self::context(&catalog, s))
            .collect::<StoreResult<Vec<_>>>()?;
        showtimes.sort_by_key(|ctx| (ctx.showtime.starts_at, ctx.showtime.id));
        Ok(showtimes)
    }

    async fn showtime(&self, id: i64) -> StoreResult<Option<ShowtimeContext>> {
        let catalog = read(&self.catalog);
        catalog
            .showtimes
            .get(&id)
            .map(|s| Self::context(&catalog, s))
            .transpose()
    }

    async fn update_showtime(
        &self,
        id: i64,
        update: NewShowtime,
    ) -> StoreResult<CatalogUpdate<ShowtimeContext>> {
        loop {
            let handle = self.inventory(id);
            let inventory = lock(&handle);
            if !self.is_current(id, &handle) {
                continue;
            }
            let mut catalog = write(&self.catalog);
            let Some(current) = catalog.showtimes.get(&id).cloned() else {
                drop(catalog);
                self.discard_inventory(id, &handle);
                return Ok(CatalogUpdate::NotFound);
            };
            if !catalog.movies.contains_key(&update.movie_id)
                || !catalog.theaters.contains_key(&update.theater_id)
            {
                return Err(StoreError::Integrity(
                    "showtime must reference an existing movie and theater".to_string(),
                ));
            }
            if current.theater_id != update.theater_id && !inventory.seats.is_empty() {
                return Ok(CatalogUpdate::InventoryExists);
            }

            let showtime = Showtime {
                id,
                movie_id: update.movie_id,
                theater_id: update.theater_id,
                starts_at: update.starts_at,
            };
            catalog.showtimes.insert(id, showtime.clone());
            return Self::context(&catalog, &showtime).map(CatalogUpdate::Updated);
        }
    }

    async fn delete_showtime(&self, id: i64) -> StoreResult<bool> {
        if write(&self.catalog).showtimes.remove(&id).is_none() {
            return Ok(false);
        }
        self.purge_showtime(id);
        Ok(true)
    }
}

#[async_trait]
impl SeatStore for MemoryStore {
    async fn insert_seats_if_absent(&self, showtime: &ShowtimeContext, labels: &[SeatLabel]) -> StoreResult<u64> {
        let showtime_id = showtime.id();
        loop {
            let handle = self.inventory(showtime_id);
            let mut inventory = lock(&handle);
            if !self.is_current(showtime_id, &handle) {
                continue;
            }

            let catalog = read(&self.catalog);
            let Some(current) = catalog.showtimes.get(&showtime_id) else {
                drop(catalog);
                // deleted after the caller looked it up; leave no orphan inventory behind
                self.discard_inventory(showtime_id, &handle);
                return Ok(0);
            };
            let same_layout = current.theater_id == showtime.theater.id
                && catalog.theaters.get(&current.theater_id).is_some_and(|t| {
                    t.seat_rows == showtime.theater.seat_rows
                        && t.seat_columns == showtime.theater.seat_columns
                });
            drop(catalog);
            if !same_layout {
                return Ok(0);
            }

            let mut inserted = 0;
            for label in labels {
                if !inventory.seats.contains_key(label) {
                    let slot = SeatSlot { id: self.next_id(), booking_id: None };
                    inventory.seats.insert(*label, slot);
                    inserted += 1;
                }
            }
            return Ok(inserted);
        }
    }

    async fn seats(&self, showtime_id: i64, filter: SeatFilter) -> StoreResult<Vec<Seat>> {
        let Some(inventory) = self.existing_inventory(showtime_id) else {
            return Ok(Vec::new());
        };
        let inventory = lock(&inventory);
        Ok(inventory
            .seats
            .iter()
            .filter(|(_, slot)| filter.matches(slot.booking_id.is_some()))
            .map(|(label, slot)| Inventory::to_seat(showtime_id, label, slot))
            .collect())
    }

    async fn seats_by_labels(&self, showtime_id: i64, labels: &[SeatLabel]) -> StoreResult<Vec<Seat>> {
        let Some(inventory) = self.existing_inventory(showtime_id) else {
            return Ok(Vec::new());
        };
        let inventory = lock(&inventory);
        let mut wanted: Vec<SeatLabel> = labels.to_vec();
        wanted.sort();
        wanted.dedup();
        Ok(wanted
            .iter()
            .filter_map(|label| {
                inventory
                    .seats
                    .get(label)
                    .map(|slot| Inventory::to_seat(showtime_id, label, slot))
            })
            .collect())
    }

    async fn seat_counts(&self, showtime_id: i64) -> StoreResult<SeatCounts> {
        let Some(inventory) = self.existing_inventory(showtime_id) else {
            return Ok(SeatCounts::default());
        };
        let inventory = lock(&inventory);
        let booked = inventory.seats.values().filter(|s| s.booking_id.is_some()).count();
        Ok(SeatCounts {
            total: inventory.seats.len() as i64,
            booked: booked as i64,
        })
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn reserve_seats(&self, booking: NewBooking) -> StoreResult<ReserveOutcome> {
        let Some(inventory) = self.existing_inventory(booking.showtime_id) else {
            return Ok(ReserveOutcome::Missing(booking.seat_labels));
        };
        let mut inventory = lock(&inventory);
        if !read(&self.catalog).showtimes.contains_key(&booking.showtime_id) {
            return Ok(ReserveOutcome::Missing(booking.seat_labels));
        }

        let missing: Vec<SeatLabel> = booking
            .seat_labels
            .iter()
            .filter(|label| !inventory.seats.contains_key(label))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Ok(ReserveOutcome::Missing(missing));
        }

        let taken: Vec<SeatLabel> = booking
            .seat_labels
            .iter()
            .filter(|label| inventory.seats.get(label).is_some_and(|s| s.booking_id.is_some()))
            .copied()
            .collect();
        if !taken.is_empty() {
            return Ok(ReserveOutcome::Unavailable(taken));
        }

        let record = Booking {
            id: self.next_id(),
            user_id: booking.user_id,
            showtime_id: booking.showtime_id,
            num_tickets: booking.seat_labels.len() as i32,
            seat_labels: booking.label_strings(),
            created_at: booking.created_at,
        };
        for label in &booking.seat_labels {
            if let Some(slot) = inventory.seats.get_mut(label) {
                slot.booking_id = Some(record.id);
            }
        }
        write(&self.bookings).insert(record.id, record.clone());
        Ok(ReserveOutcome::Reserved(record))
    }

    async fn release_booking(&self, booking_id: i64) -> StoreResult<Option<ReleasedBooking>> {
        let Some(showtime_id) = read(&self.bookings).get(&booking_id).map(|b| b.showtime_id) else {
            return Ok(None);
        };
        let Some(inventory) = self.existing_inventory(showtime_id) else {
            return Ok(None);
        };
        let mut inventory = lock(&inventory);

        // a concurrent cancel may have won while we waited for the inventory
        let Some(booking) = write(&self.bookings).remove(&booking_id) else {
            return Ok(None);
        };
        let mut released = Vec::new();
        for (label, slot) in inventory.seats.iter_mut() {
            if slot.booking_id == Some(booking_id) {
                slot.booking_id = None;
                released.push(label.to_string());
            }
        }
        Ok(Some(ReleasedBooking { booking, released }))
    }

    async fn booking(&self, id: i64) -> StoreResult<Option<Booking>> {
        Ok(read(&self.bookings).get(&id).cloned())
    }

    async fn bookings_for_user(&self, user_id: i64) -> StoreResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = read(&self.bookings)
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(bookings)
    }

    async fn all_bookings(&self) -> StoreResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = read(&self.bookings).values().cloned().collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(bookings)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.catalog)
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user_if_absent(&self, user: NewUser) -> StoreResult<User> {
        let mut catalog = write(&self.catalog);
        if let Some(existing) = catalog.users.values().find(|u| u.username == user.username) {
            return Ok(existing.clone());
        }
        let user = User {
            id: self.next_id(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        };
        catalog.users.insert(user.id, user.clone());
        Ok(user)
    }
}

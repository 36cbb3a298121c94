//! Postgres store.
//!
//! Reservation locks only the requested seat rows (`SELECT ... FOR UPDATE` in row-major
//! order), so bookings of disjoint seats on one showtime proceed in parallel and two
//! transactions never lock overlapping seats in opposite orders.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    BookingStore, CatalogStore, CatalogUpdate, ReleasedBooking, ReserveOutcome, SeatStore,
    StoreError, StoreResult, UserStore,
};
use crate::models::{
    Booking, Movie, NewBooking, NewMovie, NewShowtime, NewTheater, NewUser, Seat, SeatCounts,
    SeatFilter, SeatLabel, Showtime, ShowtimeContext, Theater, User,
};

const THEATER_COLUMNS: &str = "id, name, description, seat_rows, seat_columns, is_active";
const MOVIE_COLUMNS: &str = "id, title, description, duration_minutes, genre, rating";
const SEAT_COLUMNS: &str = "id, showtime_id, label, row_index, column_number, is_booked, booking_id";
const BOOKING_COLUMNS: &str = "id, user_id, showtime_id, num_tickets, seat_labels, created_at";

const SHOWTIME_SELECT: &str = r#"
    SELECT s.id, s.movie_id, s.theater_id, s.starts_at,
           t.name AS theater_name, t.description AS theater_description,
           t.seat_rows, t.seat_columns, t.is_active
    FROM showtimes s
    JOIN theaters t ON t.id = s.theater_id
"#;

#[derive(FromRow)]
struct ShowtimeRow {
    id: i64,
    movie_id: i64,
    theater_id: i64,
    starts_at: chrono::DateTime<chrono::Utc>,
    theater_name: String,
    theater_description: Option<String>,
    seat_rows: i32,
    seat_columns: i32,
    is_active: bool,
}

impl From<ShowtimeRow> for ShowtimeContext {
    fn from(row: ShowtimeRow) -> Self {
        ShowtimeContext {
            showtime: Showtime {
                id: row.id,
                movie_id: row.movie_id,
                theater_id: row.theater_id,
                starts_at: row.starts_at,
            },
            theater: Theater {
                id: row.theater_id,
                name: row.theater_name,
                description: row.theater_description,
                seat_rows: row.seat_rows,
                seat_columns: row.seat_columns,
                is_active: row.is_active,
            },
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse()
            .map_err(|e| StoreError::Integrity(format!("user {}: {}", row.id, e)))?;
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
        })
    }
}

/// Serialization failures and deadlocks become [`StoreError::Conflict`] so callers can retry.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.code().as_deref(), Some("40001") | Some("40P01")) {
            return StoreError::Conflict;
        }
    }
    StoreError::Database(err)
}

/// `ILIKE` pattern matching `fragment` anywhere, with its wildcards taken literally.
fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn sort_labels(labels: &mut [String]) {
    labels.sort_by_key(|l| l.parse::<SeatLabel>().ok());
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn insert_theater(&self, theater: NewTheater) -> StoreResult<Theater> {
        let theater = sqlx::query_as::<_, Theater>(
            "INSERT INTO theaters (name, description, seat_rows, seat_columns)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, description, seat_rows, seat_columns, is_active",
        )
        .bind(&theater.name)
        .bind(&theater.description)
        .bind(theater.seat_rows)
        .bind(theater.seat_columns)
        .fetch_one(&self.pool)
        .await?;
        Ok(theater)
    }

    async fn theaters(&self, active_only: bool) -> StoreResult<Vec<Theater>> {
        let theaters = sqlx::query_as::<_, Theater>(
            "SELECT id, name, description, seat_rows, seat_columns, is_active
             FROM theaters
             WHERE ($1 = FALSE OR is_active)
             ORDER BY id",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(theaters)
    }

    async fn theater(&self, id: i64) -> StoreResult<Option<Theater>> {
        let theater = sqlx::query_as::<_, Theater>(
            "SELECT id, name, description, seat_rows, seat_columns, is_active
             FROM theaters WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(theater)
    }

    async fn set_theater_active(&self, id: i64, active: bool) -> StoreResult<Option<Theater>> {
        let theater = sqlx::query_as::<_, Theater>(
            "UPDATE theaters SET is_active = $2 WHERE id = $1
             RETURNING id, name, description, seat_rows, seat_columns, is_active",
        )
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(theater)
    }

    async fn theaters_by_name(&self, fragment: &str) -> StoreResult<Vec<Theater>> {
        let query = format!("SELECT {THEATER_COLUMNS} FROM theaters WHERE name ILIKE $1 ORDER BY id");
        let theaters = sqlx::query_as::<_, Theater>(&query)
            .bind(contains_pattern(fragment))
            .fetch_all(&self.pool)
            .await?;
        Ok(theaters)
    }

    async fn count_active_theaters(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM theaters WHERE is_active")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_theater(&self, id: i64, update: NewTheater) -> StoreResult<CatalogUpdate<Theater>> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        // seat generation holds FOR SHARE on this row, so the check below cannot go stale
        let Some(layout) = sqlx::query_as::<_, (i32, i32)>(
            "SELECT seat_rows, seat_columns FROM theaters WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?
        else {
            tx.rollback().await.map_err(classify)?;
            return Ok(CatalogUpdate::NotFound);
        };

        if layout != (update.seat_rows, update.seat_columns) {
            let seeded: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM seats se
                    JOIN showtimes s ON s.id = se.showtime_id
                    WHERE s.theater_id = $1
                )
                "#,
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;
            if seeded {
                tx.rollback().await.map_err(classify)?;
                return Ok(CatalogUpdate::InventoryExists);
            }
        }

        let query = format!(
            "UPDATE theaters SET name = $2, description = $3, seat_rows = $4, seat_columns = $5
             WHERE id = $1
             RETURNING {THEATER_COLUMNS}"
        );
        let theater = sqlx::query_as::<_, Theater>(&query)
            .bind(id)
            .bind(&update.name)
            .bind(&update.description)
            .bind(update.seat_rows)
            .bind(update.seat_columns)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;

        tx.commit().await.map_err(classify)?;
        Ok(CatalogUpdate::Updated(theater))
    }

    async fn delete_theater(&self, id: i64) -> StoreResult<Option<Vec<i64>>> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        // blocks new showtimes for this theater until the delete commits
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM theaters WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(classify)?;
        if exists.is_none() {
            tx.rollback().await.map_err(classify)?;
            return Ok(None);
        }

        let showtimes: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM showtimes WHERE theater_id = $1 ORDER BY id")
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .map_err(classify)?;

        // showtimes, seats and bookings follow through ON DELETE CASCADE
        sqlx::query("DELETE FROM theaters WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        tx.commit().await.map_err(classify)?;
        Ok(Some(showtimes))
    }

    async fn insert_movie(&self, movie: NewMovie) -> StoreResult<Movie> {
        let movie = sqlx::query_as::<_, Movie>(
            "INSERT INTO movies (title, description, duration_minutes, genre, rating)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, title, description, duration_minutes, genre, rating",
        )
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(movie.duration_minutes)
        .bind(&movie.genre)
        .bind(&movie.rating)
        .fetch_one(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn movies(&self) -> StoreResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(
            "SELECT id, title, description, duration_minutes, genre, rating FROM movies ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn movie(&self, id: i64) -> StoreResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            "SELECT id, title, description, duration_minutes, genre, rating FROM movies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn count_movies(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM movies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_movie(&self, id: i64, update: NewMovie) -> StoreResult<Option<Movie>> {
        let query = format!(
            "UPDATE movies
             SET title = $2, description = $3, duration_minutes = $4, genre = $5, rating = $6
             WHERE id = $1
             RETURNING {MOVIE_COLUMNS}"
        );
        let movie = sqlx::query_as::<_, Movie>(&query)
            .bind(id)
            .bind(&update.title)
            .bind(&update.description)
            .bind(update.duration_minutes)
            .bind(&update.genre)
            .bind(&update.rating)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movie)
    }

    async fn delete_movie(&self, id: i64) -> StoreResult<Option<Vec<i64>>> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM movies WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(classify)?;
        if exists.is_none() {
            tx.rollback().await.map_err(classify)?;
            return Ok(None);
        }

        let showtimes: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM showtimes WHERE movie_id = $1 ORDER BY id")
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .map_err(classify)?;

        sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        tx.commit().await.map_err(classify)?;
        Ok(Some(showtimes))
    }

    async fn insert_showtime(&self, showtime: NewShowtime) -> StoreResult<Showtime> {
        let showtime = sqlx::query_as::<_, Showtime>(
            "INSERT INTO showtimes (movie_id, theater_id, starts_at)
             VALUES ($1, $2, $3)
             RETURNING id, movie_id, theater_id, starts_at",
        )
        .bind(showtime.movie_id)
        .bind(showtime.theater_id)
        .bind(showtime.starts_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(showtime)
    }

    async fn showtimes(&self, movie_id: Option<i64>) -> StoreResult<Vec<ShowtimeContext>> {
        let query = format!(
            "{SHOWTIME_SELECT} WHERE ($1::BIGINT IS NULL OR s.movie_id = $1) ORDER BY s.starts_at, s.id"
        );
        let rows = sqlx::query_as::<_, ShowtimeRow>(&query)
            .bind(movie_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ShowtimeContext::from).collect())
    }

    async fn showtime(&self, id: i64) -> StoreResult<Option<ShowtimeContext>> {
        let query = format!("{SHOWTIME_SELECT} WHERE s.id = $1");
        let row = sqlx::query_as::<_, ShowtimeRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ShowtimeContext::from))
    }

    async fn update_showtime(
        &self,
        id: i64,
        update: NewShowtime,
    ) -> StoreResult<CatalogUpdate<ShowtimeContext>> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let Some(theater_id) =
            sqlx::query_scalar::<_, i64>("SELECT theater_id FROM showtimes WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(classify)?
        else {
            tx.rollback().await.map_err(classify)?;
            return Ok(CatalogUpdate::NotFound);
        };

        if theater_id != update.theater_id {
            let seeded: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM seats WHERE showtime_id = $1)")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(classify)?;
            if seeded {
                tx.rollback().await.map_err(classify)?;
                return Ok(CatalogUpdate::InventoryExists);
            }
        }

        sqlx::query("UPDATE showtimes SET movie_id = $2, theater_id = $3, starts_at = $4 WHERE id = $1")
            .bind(id)
            .bind(update.movie_id)
            .bind(update.theater_id)
            .bind(update.starts_at)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        let query = format!("{SHOWTIME_SELECT} WHERE s.id = $1");
        let row = sqlx::query_as::<_, ShowtimeRow>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;

        tx.commit().await.map_err(classify)?;
        Ok(CatalogUpdate::Updated(row.into()))
    }

    async fn delete_showtime(&self, id: i64) -> StoreResult<bool> {
        // seats and bookings go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM showtimes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SeatStore for PgStore {
    async fn insert_seats_if_absent(&self, showtime: &ShowtimeContext, labels: &[SeatLabel]) -> StoreResult<u64> {
        let names: Vec<String> = labels.iter().map(ToString::to_string).collect();
        let rows: Vec<i32> = labels.iter().map(|l| i32::from(l.row_index())).collect();
        let columns: Vec<i32> = labels.iter().map(|l| i32::from(l.column())).collect();

        let mut tx = self.pool.begin().await.map_err(classify)?;

        // FOR SHARE on both rows: a concurrent delete, move or relayout either finishes
        // first and is seen here, or waits for this insert to commit
        let current = sqlx::query_as::<_, (i64, i32, i32)>(
            r#"
            SELECT s.theater_id, t.seat_rows, t.seat_columns
            FROM showtimes s
            JOIN theaters t ON t.id = s.theater_id
            WHERE s.id = $1
            FOR SHARE
            "#,
        )
        .bind(showtime.id())
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?;

        let expected = (showtime.theater.id, showtime.theater.seat_rows, showtime.theater.seat_columns);
        if current != Some(expected) {
            tx.rollback().await.map_err(classify)?;
            debug!("Showtime {} changed or vanished before seat generation", showtime.id());
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO seats (showtime_id, label, row_index, column_number)
            SELECT $1, l.label, l.row_index, l.column_number
            FROM UNNEST($2::text[], $3::int4[], $4::int4[]) AS l(label, row_index, column_number)
            ON CONFLICT (showtime_id, label) DO NOTHING
            "#,
        )
        .bind(showtime.id())
        .bind(&names)
        .bind(&rows)
        .bind(&columns)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;

        tx.commit().await.map_err(classify)?;
        Ok(result.rows_affected())
    }

    async fn seats(&self, showtime_id: i64, filter: SeatFilter) -> StoreResult<Vec<Seat>> {
        let booked: Option<bool> = match filter {
            SeatFilter::All => None,
            SeatFilter::Available => Some(false),
            SeatFilter::Booked => Some(true),
        };
        let query = format!(
            "SELECT {SEAT_COLUMNS} FROM seats
             WHERE showtime_id = $1 AND ($2::BOOLEAN IS NULL OR is_booked = $2)
             ORDER BY row_index, column_number"
        );
        let seats = sqlx::query_as::<_, Seat>(&query)
            .bind(showtime_id)
            .bind(booked)
            .fetch_all(&self.pool)
            .await?;
        Ok(seats)
    }

    async fn seats_by_labels(&self, showtime_id: i64, labels: &[SeatLabel]) -> StoreResult<Vec<Seat>> {
        let names: Vec<String> = labels.iter().map(ToString::to_string).collect();
        let query = format!(
            "SELECT {SEAT_COLUMNS} FROM seats
             WHERE showtime_id = $1 AND label = ANY($2)
             ORDER BY row_index, column_number"
        );
        let seats = sqlx::query_as::<_, Seat>(&query)
            .bind(showtime_id)
            .bind(&names)
            .fetch_all(&self.pool)
            .await?;
        Ok(seats)
    }

    async fn seat_counts(&self, showtime_id: i64) -> StoreResult<SeatCounts> {
        let (total, booked) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_booked) FROM seats WHERE showtime_id = $1",
        )
        .bind(showtime_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(SeatCounts { total, booked })
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn reserve_seats(&self, booking: NewBooking) -> StoreResult<ReserveOutcome> {
        let labels = booking.label_strings();
        let mut tx = self.pool.begin().await.map_err(classify)?;

        // 1) lock the requested seats, always in the same order
        let locked: Vec<(String, bool)> = sqlx::query_as(
            r#"
            SELECT label, is_booked
            FROM seats
            WHERE showtime_id = $1 AND label = ANY($2)
            ORDER BY row_index, column_number
            FOR UPDATE
            "#,
        )
        .bind(booking.showtime_id)
        .bind(&labels)
        .fetch_all(&mut *tx)
        .await
        .map_err(classify)?;

        if locked.len() != labels.len() {
            let found: HashSet<&str> = locked.iter().map(|(label, _)| label.as_str()).collect();
            let missing = booking
                .seat_labels
                .iter()
                .filter(|label| !found.contains(label.to_string().as_str()))
                .copied()
                .collect();
            tx.rollback().await.map_err(classify)?;
            return Ok(ReserveOutcome::Missing(missing));
        }

        let taken: Vec<SeatLabel> = locked
            .iter()
            .filter(|(_, is_booked)| *is_booked)
            .filter_map(|(label, _)| label.parse().ok())
            .collect();
        if !taken.is_empty() {
            tx.rollback().await.map_err(classify)?;
            return Ok(ReserveOutcome::Unavailable(taken));
        }

        // 2) booking row first, the seats reference it
        let query = format!(
            "INSERT INTO bookings (user_id, showtime_id, num_tickets, seat_labels, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {BOOKING_COLUMNS}"
        );
        let record = sqlx::query_as::<_, Booking>(&query)
            .bind(booking.user_id)
            .bind(booking.showtime_id)
            .bind(labels.len() as i32)
            .bind(&labels)
            .bind(booking.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;

        // 3) conditional flip; the row locks make a short count impossible, but never commit one
        let flipped = sqlx::query(
            r#"
            UPDATE seats
            SET is_booked = TRUE, booking_id = $1
            WHERE showtime_id = $2 AND label = ANY($3) AND is_booked = FALSE
            "#,
        )
        .bind(record.id)
        .bind(booking.showtime_id)
        .bind(&labels)
        .execute(&mut *tx)
        .await
        .map_err(classify)?
        .rows_affected();

        if flipped != labels.len() as u64 {
            tx.rollback().await.map_err(classify)?;
            return Err(StoreError::Conflict);
        }

        tx.commit().await.map_err(classify)?;
        Ok(ReserveOutcome::Reserved(record))
    }

    async fn release_booking(&self, booking_id: i64) -> StoreResult<Option<ReleasedBooking>> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE");
        let Some(booking) = sqlx::query_as::<_, Booking>(&query)
            .bind(booking_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(classify)?
        else {
            tx.rollback().await.map_err(classify)?;
            return Ok(None);
        };

        let mut released: Vec<String> = sqlx::query_scalar(
            r#"
            WITH target AS (
                SELECT id FROM seats
                WHERE booking_id = $1
                ORDER BY row_index, column_number
                FOR UPDATE
            )
            UPDATE seats s
            SET is_booked = FALSE, booking_id = NULL
            FROM target
            WHERE s.id = target.id
            RETURNING s.label
            "#,
        )
        .bind(booking_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(classify)?;

        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        tx.commit().await.map_err(classify)?;

        sort_labels(&mut released);
        Ok(Some(ReleasedBooking { booking, released }))
    }

    async fn booking(&self, id: i64) -> StoreResult<Option<Booking>> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    async fn bookings_for_user(&self, user_id: i64) -> StoreResult<Vec<Booking>> {
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let bookings = sqlx::query_as::<_, Booking>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(bookings)
    }

    async fn all_bookings(&self) -> StoreResult<Vec<Booking>> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC, id DESC");
        let bookings = sqlx::query_as::<_, Booking>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(bookings)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn insert_user_if_absent(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query(
            "INSERT INTO users (username, email, password_hash, role)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await?;

        self.user_by_username(&user.username)
            .await?
            .ok_or_else(|| StoreError::Integrity(format!("user {} vanished after insert", user.username)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_labels_sort_row_major() {
        let mut labels = vec!["B1".to_string(), "A10".to_string(), "A2".to_string()];
        sort_labels(&mut labels);
        assert_eq!(labels, vec!["A2", "A10", "B1"]);
    }

    #[test]
    fn name_search_escapes_wildcards() {
        assert_eq!(contains_pattern("hall"), "%hall%");
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}

use chrono::{Duration, DurationRound, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::SampleData;
use crate::models::{NewMovie, NewShowtime, NewTheater, NewUser, Role};
use crate::store::{Store, StoreError, StoreResult};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub theaters: usize,
    pub movies: usize,
    pub showtimes: usize,
}

const USERS: &[(&str, &str, &str, Role)] = &[
    ("admin", "admin@cinema.local", "admin123", Role::Admin),
    ("user", "user@cinema.local", "user123", Role::User),
];

// name, description, rows, columns
const THEATERS: &[(&str, &str, i32, i32)] = &[
    ("Standard Hall", "Classic layout for everyday screenings", 12, 12),
    ("Large Hall", "Wide screen with surround sound", 10, 16),
    ("VIP Lounge", "Recliner seats and table service", 6, 8),
];

// title, genre, duration, rating
const MOVIES: &[(&str, &str, i32, &str)] = &[
    ("Avengers: Endgame", "Action/Adventure", 181, "PG-13"),
    ("The Dark Knight", "Action/Crime", 152, "PG-13"),
    ("Inception", "Sci-Fi/Thriller", 148, "PG-13"),
    ("Spirited Away", "Animation/Fantasy", 125, "PG"),
];

// hours from the next full hour, per movie
const SCREENINGS: &[i64] = &[2, 5, 26];

/// Decides whether to seed and loads the sample catalog if so.
pub async fn load_sample_data(
    store: &Arc<dyn Store>,
    mode: SampleData,
    bcrypt_cost: u32,
) -> Result<Option<SeedReport>, SeedError> {
    let load = match mode {
        SampleData::Off => false,
        SampleData::Always => true,
        SampleData::Auto => store.count_movies().await? == 0,
    };
    if !load {
        debug!("Sample data skipped ({:?})", mode);
        return Ok(None);
    }

    let report = seed(store, bcrypt_cost).await?;
    info!(
        "Sample data loaded: {} users, {} theaters, {} movies, {} showtimes",
        report.users, report.theaters, report.movies, report.showtimes
    );
    Ok(Some(report))
}

/// Inserts whatever part of the sample catalog is not there yet. Rows are matched by
/// username, theater name and movie title, so running it twice adds nothing.
pub async fn seed(store: &Arc<dyn Store>, bcrypt_cost: u32) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    for (username, email, password, role) in USERS {
        if store.user_by_username(username).await?.is_some() {
            continue;
        }
        store
            .insert_user_if_absent(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: bcrypt::hash(password, bcrypt_cost)?,
                role: *role,
            })
            .await?;
        report.users += 1;
    }

    let mut theaters: HashMap<String, i64> = store
        .theaters(false)
        .await?
        .into_iter()
        .map(|t| (t.name, t.id))
        .collect();
    for (name, description, rows, columns) in THEATERS {
        if theaters.contains_key(*name) {
            continue;
        }
        let theater = store
            .insert_theater(NewTheater {
                name: name.to_string(),
                description: Some(description.to_string()),
                seat_rows: *rows,
                seat_columns: *columns,
            })
            .await?;
        theaters.insert(theater.name, theater.id);
        report.theaters += 1;
    }
    let theater_ids: Vec<i64> = THEATERS
        .iter()
        .filter_map(|(name, ..)| theaters.get(*name).copied())
        .collect();

    let existing: Vec<String> = store.movies().await?.into_iter().map(|m| m.title).collect();
    let base = next_hour();
    for (i, (title, genre, duration, rating)) in MOVIES.iter().enumerate() {
        if existing.iter().any(|t| t == title) {
            continue;
        }
        let movie = store
            .insert_movie(NewMovie {
                title: title.to_string(),
                description: None,
                duration_minutes: Some(*duration),
                genre: Some(genre.to_string()),
                rating: Some(rating.to_string()),
            })
            .await?;
        report.movies += 1;

        report.showtimes += add_screenings(store, movie.id, i, &theater_ids, base).await?;
    }

    Ok(report)
}

async fn add_screenings(
    store: &Arc<dyn Store>,
    movie_id: i64,
    offset: usize,
    theater_ids: &[i64],
    base: chrono::DateTime<Utc>,
) -> StoreResult<usize> {
    if theater_ids.is_empty() {
        return Ok(0);
    }
    let mut created = 0;
    for (j, hours) in SCREENINGS.iter().enumerate() {
        let theater_id = theater_ids[(offset + j) % theater_ids.len()];
        store
            .insert_showtime(NewShowtime {
                movie_id,
                theater_id,
                starts_at: base + Duration::hours(*hours) + Duration::minutes(15 * offset as i64),
            })
            .await?;
        created += 1;
    }
    Ok(created)
}

fn next_hour() -> chrono::DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(Duration::hours(1)).unwrap_or(now) + Duration::hours(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> Arc<dyn Store> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn seeds_once() {
        let store = store();
        let first = load_sample_data(&store, SampleData::Auto, 4).await.unwrap().unwrap();
        assert_eq!(first.users, 2);
        assert_eq!(first.theaters, 3);
        assert_eq!(first.movies, MOVIES.len());
        assert_eq!(first.showtimes, MOVIES.len() * SCREENINGS.len());

        // catalog is no longer empty
        assert!(load_sample_data(&store, SampleData::Auto, 4).await.unwrap().is_none());

        let again = load_sample_data(&store, SampleData::Always, 4).await.unwrap().unwrap();
        assert_eq!(again, SeedReport::default());
        assert_eq!(store.showtimes(None).await.unwrap().len(), first.showtimes);
    }

    #[tokio::test]
    async fn off_never_seeds() {
        let store = store();
        assert!(load_sample_data(&store, SampleData::Off, 4).await.unwrap().is_none());
        assert_eq!(store.count_movies().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn seeded_passwords_verify() {
        let store = store();
        seed(&store, 4).await.unwrap();
        let admin = store.user_by_username("admin").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(bcrypt::verify("admin123", &admin.password_hash).unwrap());
    }
}

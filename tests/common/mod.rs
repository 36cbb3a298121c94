#![allow(dead_code)]

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use cinema_booking::cache::CacheService;
use cinema_booking::config::{BookingConfig, Config};
use cinema_booking::models::{NewMovie, NewShowtime, NewTheater, NewUser, Role, ShowtimeContext};
use cinema_booking::services::{BookingEngine, ReserveRequest};
use cinema_booking::store::{MemoryStore, Store};
use cinema_booking::AppState;

pub const ADMIN: (&str, &str) = ("admin", "admin-pass");
pub const ALICE: (&str, &str) = ("alice", "alice-pass");
pub const BOB: (&str, &str) = ("bob", "bob-pass");

pub struct Fixture {
    pub store: Arc<dyn Store>,
    pub engine: BookingEngine,
    pub showtime: ShowtimeContext,
    pub admin_id: i64,
    pub alice_id: i64,
    pub bob_id: i64,
}

impl Fixture {
    pub async fn context(&self, showtime_id: i64) -> ShowtimeContext {
        self.store.showtime(showtime_id).await.unwrap().unwrap()
    }

    pub async fn available(&self) -> i64 {
        self.engine
            .availability()
            .count_available(&self.showtime)
            .await
            .unwrap()
            .available
    }
}

pub fn request(showtime_id: i64, seats: &[&str]) -> ReserveRequest {
    ReserveRequest {
        showtime_id,
        num_tickets: seats.len() as i32,
        selected_seats: seats.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn memory_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([("STORAGE", "memory"), ("LOAD_SAMPLE_DATA", "off")]);
    Config::from_lookup(move |key| vars.get(key).map(|v| v.to_string())).unwrap()
}

pub async fn add_showtime(store: &Arc<dyn Store>, rows: i32, columns: i32) -> ShowtimeContext {
    let theater = store
        .insert_theater(NewTheater {
            name: format!("Hall {}x{}", rows, columns),
            description: None,
            seat_rows: rows,
            seat_columns: columns,
        })
        .await
        .unwrap();
    let movie = store
        .insert_movie(NewMovie {
            title: "Inception".to_string(),
            description: None,
            duration_minutes: Some(148),
            genre: None,
            rating: None,
        })
        .await
        .unwrap();
    let showtime = store
        .insert_showtime(NewShowtime {
            movie_id: movie.id,
            theater_id: theater.id,
            starts_at: Utc::now() + Duration::hours(3),
        })
        .await
        .unwrap();
    store.showtime(showtime.id).await.unwrap().unwrap()
}

async fn add_user(store: &Arc<dyn Store>, (username, password): (&str, &str), role: Role) -> i64 {
    store
        .insert_user_if_absent(NewUser {
            username: username.to_string(),
            email: format!("{}@cinema.test", username),
            password_hash: bcrypt::hash(password, 4).unwrap(),
            role,
        })
        .await
        .unwrap()
        .id
}

/// In-memory store with a 12x12 theater, one showtime and three users.
pub async fn fixture() -> Fixture {
    fixture_with(BookingConfig::default()).await
}

pub async fn fixture_with(config: BookingConfig) -> Fixture {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let showtime = add_showtime(&store, 12, 12).await;
    let admin_id = add_user(&store, ADMIN, Role::Admin).await;
    let alice_id = add_user(&store, ALICE, Role::User).await;
    let bob_id = add_user(&store, BOB, Role::User).await;
    let engine = BookingEngine::new(store.clone(), config);
    Fixture {
        store,
        engine,
        showtime,
        admin_id,
        alice_id,
        bob_id,
    }
}

pub fn app_state(fixture: &Fixture) -> Arc<AppState> {
    AppState::with_store(fixture.store.clone(), CacheService::disabled(), memory_config())
}

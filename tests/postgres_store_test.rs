//! Runs against a real database: `DATABASE_URL=... cargo test -- --ignored`.

mod common;

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;

use cinema_booking::config::BookingConfig;
use cinema_booking::models::{NewShowtime, NewUser, Role, SeatCounts, SeatFilter};
use cinema_booking::services::{BookingEngine, BookingError};
use cinema_booking::store::{CatalogUpdate, PgStore, Store};

use common::{add_showtime, request};

fn unique() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

async fn pg_store() -> Arc<dyn Store> {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
    let store = PgStore::connect(&url, 8).await.unwrap();
    store.run_migrations().await.unwrap();
    Arc::new(store)
}

async fn add_user(store: &Arc<dyn Store>) -> i64 {
    let name = format!("pg-{}", unique());
    store
        .insert_user_if_absent(NewUser {
            email: format!("{}@cinema.test", name),
            username: name,
            password_hash: "not-a-real-hash".to_string(),
            role: Role::User,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn reserve_and_cancel_flip_seat_rows() {
    let store = pg_store().await;
    let showtime = add_showtime(&store, 3, 4).await;
    let user = add_user(&store).await;
    let engine = BookingEngine::new(store.clone(), BookingConfig::default());

    let booking = engine
        .reserve(user, request(showtime.id(), &["A2", "A1"]))
        .await
        .unwrap()
        .booking;
    assert_eq!(booking.seat_labels, vec!["A1", "A2"]);
    assert_eq!(store.seat_counts(showtime.id()).await.unwrap(), SeatCounts { total: 12, booked: 2 });

    // overlaps on A2: all or nothing
    assert!(matches!(
        engine.reserve(user, request(showtime.id(), &["A2", "A3"])).await,
        Err(BookingError::SeatUnavailable(seats)) if seats == vec!["A2"]
    ));
    let free = store.seats(showtime.id(), SeatFilter::Available).await.unwrap();
    assert!(free.iter().any(|s| s.label == "A3"));

    let cancellation = engine.cancel(user, booking.id).await.unwrap();
    assert_eq!(cancellation.released_seats, vec!["A1", "A2"]);
    assert_eq!(store.seat_counts(showtime.id()).await.unwrap().booked, 0);
    assert!(matches!(
        engine.cancel(user, booking.id).await,
        Err(BookingError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs DATABASE_URL"]
async fn contested_seat_has_one_winner() {
    let store = pg_store().await;
    let showtime = add_showtime(&store, 2, 2).await;
    let user = add_user(&store).await;
    let engine = BookingEngine::new(store.clone(), BookingConfig::default());

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let engine = engine.clone();
        let id = showtime.id();
        tasks.spawn(async move { engine.reserve(user, request(id, &["B2"])).await });
    }
    let mut won = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => won += 1,
            Err(BookingError::SeatUnavailable(_)) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(store.seat_counts(showtime.id()).await.unwrap(), SeatCounts { total: 4, booked: 1 });
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn theater_delete_cascades_to_seats_and_bookings() {
    let store = pg_store().await;
    let showtime = add_showtime(&store, 2, 3).await;
    let user = add_user(&store).await;
    let engine = BookingEngine::new(store.clone(), BookingConfig::default());
    let booking = engine
        .reserve(user, request(showtime.id(), &["B3"]))
        .await
        .unwrap()
        .booking;

    assert_eq!(
        store.delete_theater(showtime.theater.id).await.unwrap(),
        Some(vec![showtime.id()])
    );
    assert!(store.showtime(showtime.id()).await.unwrap().is_none());
    assert!(store.booking(booking.id).await.unwrap().is_none());
    assert_eq!(store.seat_counts(showtime.id()).await.unwrap(), SeatCounts::default());
    assert_eq!(store.delete_theater(showtime.theater.id).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn stale_context_and_seeded_moves_are_refused() {
    let store = pg_store().await;
    let showtime = add_showtime(&store, 2, 2).await;
    let other = add_showtime(&store, 3, 3).await;
    let engine = BookingEngine::new(store.clone(), BookingConfig::default());

    engine.inventory().ensure_generated(&showtime).await.unwrap();
    let moved = NewShowtime {
        movie_id: showtime.showtime.movie_id,
        theater_id: other.theater.id,
        starts_at: showtime.showtime.starts_at,
    };
    assert_eq!(
        store.update_showtime(showtime.id(), moved).await.unwrap(),
        CatalogUpdate::InventoryExists
    );

    assert!(store.delete_showtime(showtime.id()).await.unwrap());
    assert_eq!(engine.inventory().ensure_generated(&showtime).await.unwrap(), 0);
    assert_eq!(store.seat_counts(showtime.id()).await.unwrap(), SeatCounts::default());
}

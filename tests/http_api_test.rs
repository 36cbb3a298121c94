mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use tower::ServiceExt;

use cinema_booking::controllers;

use common::{app_state, fixture, Fixture, ADMIN, ALICE, BOB};

fn app(f: &Fixture) -> Router {
    controllers::router(app_state(f))
}

fn basic((username, password): (&str, &str)) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{}:{}", username, password))
    )
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    auth: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(credentials) = auth {
        builder = builder.header(header::AUTHORIZATION, basic(credentials));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

#[tokio::test]
async fn health_and_root_respond() {
    let f = fixture().await;
    let app = app(&f);
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));
}

#[tokio::test]
async fn seat_map_lists_all_seats_with_counts() {
    let f = fixture().await;
    let app = app(&f);
    let uri = format!("/api/seats/showtime/{}", f.showtime.id());

    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availableCount"], 144);
    assert_eq!(body["totalSeats"], 144);
    assert_eq!(body["seats"].as_array().unwrap().len(), 144);
    assert_eq!(body["seats"][0]["label"], "A1");

    let (status, _) = send(&app, Method::GET, "/api/seats/showtime/424242", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn booking_flow_over_http() {
    let f = fixture().await;
    let app = app(&f);
    let id = f.showtime.id();
    let payload = json!({ "showtimeId": id, "numTickets": 3, "selectedSeats": ["A1", "A2", "A3"] });

    let (status, body) = send(&app, Method::POST, "/api/bookings", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, booking) = send(&app, Method::POST, "/api/bookings", Some(ALICE), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["numTickets"], 3);
    assert_eq!(booking["seatLabels"], json!(["A1", "A2", "A3"]));
    let booking_id = booking["id"].as_i64().unwrap();

    let (status, body) = send(&app, Method::GET, &format!("/api/showtimes/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availableSeats"], 141);
    assert_eq!(body["totalSeats"], 144);

    let (status, body) = send(&app, Method::POST, "/api/bookings", Some(BOB), Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("A1"));

    let (status, body) = send(&app, Method::DELETE, &format!("/api/bookings/{}", booking_id), Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only access your own bookings");

    let (status, body) = send(&app, Method::DELETE, &format!("/api/bookings/{}", booking_id), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availableSeats"], 144);
    assert_eq!(body["releasedSeats"], json!(["A1", "A2", "A3"]));

    let (status, _) = send(&app, Method::DELETE, &format!("/api/bookings/{}", booking_id), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_booking_requests_are_bad_requests() {
    let f = fixture().await;
    let app = app(&f);
    let id = f.showtime.id();

    for payload in [
        json!({ "showtimeId": id, "numTickets": 0, "selectedSeats": [] }),
        json!({ "showtimeId": id, "numTickets": 2, "selectedSeats": ["A1"] }),
        json!({ "showtimeId": id, "numTickets": 1, "selectedSeats": ["Q1"] }),
        json!({ "showtimeId": "nope" }),
    ] {
        let (status, body) = send(&app, Method::POST, "/api/bookings", Some(ALICE), Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    let payload = json!({ "showtimeId": 777, "numTickets": 1, "selectedSeats": ["A1"] });
    let (status, _) = send(&app, Method::POST, "/api/bookings", Some(ALICE), Some(payload)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let f = fixture().await;
    let app = app(&f);
    let (status, _) = send(&app, Method::GET, "/api/bookings", Some(("alice", "guess")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::GET, "/api/bookings", Some(("nobody", "x")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_only_routes_check_role() {
    let f = fixture().await;
    let app = app(&f);

    let (status, _) = send(&app, Method::GET, "/api/bookings/admin/all", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, Method::GET, "/api/bookings/admin/all", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let theater = json!({ "name": "Studio 4", "seatRows": 5, "seatColumns": 6 });
    let (status, _) = send(&app, Method::POST, "/api/theaters", Some(BOB), Some(theater.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, Method::POST, "/api/theaters", Some(ADMIN), Some(theater)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["totalSeats"], 30);
    assert_eq!(body["isActive"], true);
}

#[tokio::test]
async fn catalog_management_round_trip() {
    let f = fixture().await;
    let app = app(&f);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/theaters",
        Some(ADMIN),
        Some(json!({ "name": "Too Deep", "seatRows": 27, "seatColumns": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, movie) = send(
        &app,
        Method::POST,
        "/api/movies",
        Some(ADMIN),
        Some(json!({ "title": "Arrival", "durationMinutes": 116 })),
    )
    .await;
    let movie_id = movie["id"].as_i64().unwrap();
    let theater_id = f.showtime.theater.id;

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/theaters/{}/active", theater_id),
        Some(ADMIN),
        Some(json!({ "active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let showtime = json!({ "movieId": movie_id, "theaterId": theater_id, "startsAt": "2030-01-01T18:00:00Z" });
    let (status, _) = send(&app, Method::POST, "/api/showtimes", Some(ADMIN), Some(showtime.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, active) = send(&app, Method::GET, "/api/theaters?activeOnly=true", None, None).await;
    assert_eq!(active, json!([]));

    send(
        &app,
        Method::PATCH,
        &format!("/api/theaters/{}/active", theater_id),
        Some(ADMIN),
        Some(json!({ "active": true })),
    )
    .await;
    let (status, created) = send(&app, Method::POST, "/api/showtimes", Some(ADMIN), Some(showtime)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["availableSeats"], 144);

    let (_, listed) = send(&app, Method::GET, &format!("/api/showtimes/movie/{}", movie_id), None, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let showtime_id = created["id"].as_i64().unwrap();
    let (status, _) = send(&app, Method::DELETE, &format!("/api/showtimes/{}", showtime_id), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &format!("/api/showtimes/{}", showtime_id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn available_listing_excludes_booked_seats() {
    let f = fixture().await;
    let app = app(&f);
    let id = f.showtime.id();
    let payload = json!({ "showtimeId": id, "numTickets": 2, "selectedSeats": ["A1", "B1"] });
    send(&app, Method::POST, "/api/bookings", Some(ALICE), Some(payload)).await;

    let (status, seats) = send(&app, Method::GET, &format!("/api/seats/available/showtime/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let seats = seats.as_array().unwrap();
    assert_eq!(seats.len(), 142);
    assert!(seats.iter().all(|s| s["isBooked"] == false));
    assert!(seats.iter().all(|s| s["label"] != "A1" && s["label"] != "B1"));

    let (_, mine) = send(&app, Method::GET, "/api/bookings", Some(ALICE), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn theater_search_and_active_count() {
    let f = fixture().await;
    let app = app(&f);

    let (status, found) = send(&app, Method::GET, "/api/theaters/search?name=HALL", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["name"], "Hall 12x12");

    let (_, none) = send(&app, Method::GET, "/api/theaters/search?name=lounge", None, None).await;
    assert_eq!(none, json!([]));
    let (status, _) = send(&app, Method::GET, "/api/theaters/search", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, count) = send(&app, Method::GET, "/api/theaters/count", None, None).await;
    assert_eq!(count, json!({ "count": 1 }));
    send(
        &app,
        Method::PATCH,
        &format!("/api/theaters/{}/active", f.showtime.theater.id),
        Some(ADMIN),
        Some(json!({ "active": false })),
    )
    .await;
    let (_, count) = send(&app, Method::GET, "/api/theaters/count", None, None).await;
    assert_eq!(count, json!({ "count": 0 }));
}

#[tokio::test]
async fn showtime_moves_only_before_its_seats_exist() {
    let f = fixture().await;
    let app = app(&f);
    let id = f.showtime.id();
    let movie_id = f.showtime.showtime.movie_id;

    let (_, small) = send(
        &app,
        Method::POST,
        "/api/theaters",
        Some(ADMIN),
        Some(json!({ "name": "Studio", "seatRows": 5, "seatColumns": 6 })),
    )
    .await;
    let small_id = small["id"].as_i64().unwrap();

    let moved = json!({ "movieId": movie_id, "theaterId": small_id, "startsAt": "2030-01-01T18:00:00Z" });
    let (status, _) = send(&app, Method::PUT, &format!("/api/showtimes/{}", id), Some(ALICE), Some(moved.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // nobody has looked at the seat map yet, so the move is free
    let (status, body) = send(&app, Method::PUT, &format!("/api/showtimes/{}", id), Some(ADMIN), Some(moved)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["theaterId"], small_id);
    assert_eq!(body["totalSeats"], 30);
    assert_eq!(body["availableSeats"], 30);

    let payload = json!({ "showtimeId": id, "numTickets": 1, "selectedSeats": ["E6"] });
    let (status, _) = send(&app, Method::POST, "/api/bookings", Some(ALICE), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);

    let back = json!({ "movieId": movie_id, "theaterId": f.showtime.theater.id, "startsAt": "2030-01-01T18:00:00Z" });
    let (status, body) = send(&app, Method::PUT, &format!("/api/showtimes/{}", id), Some(ADMIN), Some(back)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("another theater"));

    // rescheduling in place is still allowed
    let later = json!({ "movieId": movie_id, "theaterId": small_id, "startsAt": "2030-01-02T20:30:00Z" });
    let (status, body) = send(&app, Method::PUT, &format!("/api/showtimes/{}", id), Some(ADMIN), Some(later)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["startsAt"], "2030-01-02T20:30:00Z");
    assert_eq!(body["availableSeats"], 29);

    let missing = json!({ "movieId": movie_id, "theaterId": small_id, "startsAt": "2030-01-02T20:30:00Z" });
    let (status, _) = send(&app, Method::PUT, "/api/showtimes/999999", Some(ADMIN), Some(missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn theater_update_keeps_seeded_layout_and_delete_cascades() {
    let f = fixture().await;
    let app = app(&f);
    let theater_id = f.showtime.theater.id;
    let id = f.showtime.id();

    let payload = json!({ "showtimeId": id, "numTickets": 1, "selectedSeats": ["A1"] });
    send(&app, Method::POST, "/api/bookings", Some(BOB), Some(payload)).await;

    let wider = json!({ "name": "Hall 12x14", "seatRows": 12, "seatColumns": 14 });
    let (status, _) = send(&app, Method::PUT, &format!("/api/theaters/{}", theater_id), Some(ADMIN), Some(wider)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let renamed = json!({ "name": "Main Hall", "description": "Renovated", "seatRows": 12, "seatColumns": 12 });
    let (status, body) = send(&app, Method::PUT, &format!("/api/theaters/{}", theater_id), Some(ADMIN), Some(renamed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Main Hall");
    assert_eq!(body["totalSeats"], 144);

    let (status, _) = send(&app, Method::PUT, "/api/theaters/999999", Some(ADMIN), Some(json!({ "name": "X", "seatRows": 1, "seatColumns": 1 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::DELETE, &format!("/api/theaters/{}", theater_id), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Theater deleted successfully");

    let (status, _) = send(&app, Method::GET, &format!("/api/showtimes/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, mine) = send(&app, Method::GET, "/api/bookings", Some(BOB), None).await;
    assert_eq!(mine, json!([]));
    let (status, _) = send(&app, Method::DELETE, &format!("/api/theaters/{}", theater_id), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn movie_update_and_cascading_delete() {
    let f = fixture().await;
    let app = app(&f);
    let movie_id = f.showtime.showtime.movie_id;
    let id = f.showtime.id();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/movies/{}", movie_id),
        Some(ADMIN),
        Some(json!({ "title": "Inception (IMAX)", "durationMinutes": 148, "rating": "PG-13" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Inception (IMAX)");
    assert_eq!(body["rating"], "PG-13");

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/movies/{}", movie_id),
        Some(ADMIN),
        Some(json!({ "title": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let payload = json!({ "showtimeId": id, "numTickets": 1, "selectedSeats": ["C3"] });
    send(&app, Method::POST, "/api/bookings", Some(ALICE), Some(payload)).await;

    let (status, _) = send(&app, Method::DELETE, &format!("/api/movies/{}", movie_id), Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &format!("/api/movies/{}", movie_id), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &format!("/api/showtimes/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, all) = send(&app, Method::GET, "/api/bookings/admin/all", Some(ADMIN), None).await;
    assert_eq!(all, json!([]));
    let (status, _) = send(&app, Method::DELETE, &format!("/api/movies/{}", movie_id), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::SeatLabel;

/// A confirmed reservation. Every label in `seat_labels` is held by a seat row of the same
/// showtime whose `booking_id` points back here.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub showtime_id: i64,
    pub num_tickets: i32,
    pub seat_labels: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Input to the atomic reserve step. Labels are deduplicated and sorted row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub user_id: i64,
    pub showtime_id: i64,
    pub seat_labels: Vec<SeatLabel>,
    pub created_at: DateTime<Utc>,
}

impl NewBooking {
    pub fn label_strings(&self) -> Vec<String> {
        self.seat_labels.iter().map(ToString::to_string).collect()
    }
}

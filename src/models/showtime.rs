use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Theater;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Showtime {
    pub id: i64,
    pub movie_id: i64,
    pub theater_id: i64,
    pub starts_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShowtime {
    pub movie_id: i64,
    pub theater_id: i64,
    pub starts_at: DateTime<Utc>,
}

/// A showtime together with the theater whose layout seeds its inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowtimeContext {
    pub showtime: Showtime,
    pub theater: Theater,
}

impl ShowtimeContext {
    pub fn id(&self) -> i64 {
        self.showtime.id
    }

    pub fn capacity(&self) -> i64 {
        self.theater.capacity()
    }
}

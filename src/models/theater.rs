use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A screening room. Its seat map is fixed: `seat_rows` lettered rows of `seat_columns` seats.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theater {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub seat_rows: i32,
    pub seat_columns: i32,
    pub is_active: bool,
}

impl Theater {
    pub fn capacity(&self) -> i64 {
        i64::from(self.seat_rows) * i64::from(self.seat_columns)
    }
}

#[derive(Debug, Clone, Deserialize, validator::Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTheater {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(max = 100))]
    pub description: Option<String>,
    /// Row letters stop at `Z`.
    #[validate(range(min = 1, max = 26))]
    pub seat_rows: i32,
    #[validate(range(min = 1, max = 99))]
    pub seat_columns: i32,
}

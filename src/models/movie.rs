use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub genre: Option<String>,
    pub rating: Option<String>,
}

#[derive(Debug, Clone, Deserialize, validator::Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewMovie {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i32>,
    pub genre: Option<String>,
    pub rating: Option<String>,
}

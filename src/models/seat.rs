use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Seat position inside a theater, written as `<RowLetter><ColumnNumber>` (`A1`, `L12`).
///
/// Ordering is row-major with a numeric column, so `A2 < A10 < B1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatLabel {
    row: u8,
    column: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseSeatLabelError {
    #[error("seat label is empty")]
    Empty,
    #[error("seat label `{0}` must start with a row letter A-Z")]
    InvalidRow(String),
    #[error("seat label `{0}` must end with a column number starting at 1")]
    InvalidColumn(String),
}

impl SeatLabel {
    /// Row letters run from `A` to `Z`.
    pub const MAX_ROWS: u16 = 26;

    /// `row` is zero-based (0 => `A`), `column` is one-based.
    pub fn new(row: u8, column: u16) -> Option<Self> {
        if u16::from(row) >= Self::MAX_ROWS || column == 0 {
            return None;
        }
        Some(Self { row, column })
    }

    pub fn row_index(&self) -> u8 {
        self.row
    }

    pub fn row_letter(&self) -> char {
        char::from(b'A' + self.row)
    }

    pub fn column(&self) -> u16 {
        self.column
    }
}

impl fmt::Display for SeatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.column)
    }
}

impl FromStr for SeatLabel {
    type Err = ParseSeatLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let letter = chars.next().ok_or(ParseSeatLabelError::Empty)?;
        if !letter.is_ascii_uppercase() {
            return Err(ParseSeatLabelError::InvalidRow(s.to_string()));
        }
        let digits = chars.as_str();
        // no leading zeros, "A01" must not alias "A1"
        if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseSeatLabelError::InvalidColumn(s.to_string()));
        }
        let column: u16 = digits
            .parse()
            .map_err(|_| ParseSeatLabelError::InvalidColumn(s.to_string()))?;
        let row = letter as u8 - b'A';
        SeatLabel::new(row, column).ok_or_else(|| ParseSeatLabelError::InvalidColumn(s.to_string()))
    }
}

impl TryFrom<String> for SeatLabel {
    type Error = ParseSeatLabelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeatLabel> for String {
    fn from(label: SeatLabel) -> Self {
        label.to_string()
    }
}

/// One row of a showtime's seat inventory.
///
/// `is_booked` is true exactly when `booking_id` is set; the database enforces this with a
/// check constraint.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub id: i64,
    pub showtime_id: i64,
    pub label: String,
    pub row_index: i32,
    pub column_number: i32,
    pub is_booked: bool,
    pub booking_id: Option<i64>,
}

/// Which part of the inventory a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatFilter {
    All,
    Available,
    Booked,
}

impl SeatFilter {
    pub fn matches(&self, is_booked: bool) -> bool {
        match self {
            SeatFilter::All => true,
            SeatFilter::Available => !is_booked,
            SeatFilter::Booked => is_booked,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatCounts {
    pub total: i64,
    pub booked: i64,
}

impl SeatCounts {
    pub fn available(&self) -> i64 {
        self.total - self.booked
    }
}

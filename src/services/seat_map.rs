//! Canonical seat labels for a theater layout.

use crate::models::SeatLabel;

/// Every seat of a `rows` x `columns` layout in row-major order: `A1..A<columns>, B1..`.
///
/// Rows beyond `Z` and non-positive sizes yield nothing for the out-of-range part, so the
/// result is always a valid label set. Pure and deterministic.
pub fn generate(rows: i32, columns: i32) -> Vec<SeatLabel> {
    let rows = rows.clamp(0, i32::from(SeatLabel::MAX_ROWS)) as u8;
    let columns = columns.clamp(0, i32::from(u16::MAX)) as u16;

    let mut labels = Vec::with_capacity(usize::from(rows) * usize::from(columns));
    for row in 0..rows {
        for column in 1..=columns {
            if let Some(label) = SeatLabel::new(row, column) {
                labels.push(label);
            }
        }
    }
    labels
}

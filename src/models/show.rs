use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Bookable event instance. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Show {
    pub id: i64,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub total_seats: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewShow {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub total_seats: i32,
}

impl NewShow {
    /// Seat labels created with the show: "1" through "total_seats".
    pub fn seat_labels(&self) -> Vec<String> {
        (1..=self.total_seats).map(|n| n.to_string()).collect()
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use super::SeatStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Failed,
}

impl BookingStatus {
    /// Seat state that a booking in this status imposes on its seats.
    pub fn seat_status(self) -> SeatStatus {
        match self {
            BookingStatus::Pending => SeatStatus::Reserved,
            BookingStatus::Confirmed => SeatStatus::Booked,
            BookingStatus::Failed => SeatStatus::Available,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub show_id: i64,
    pub user_id: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    /// Only set for bookings created as PENDING; ignored once the booking leaves PENDING.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending && self.expires_at.is_some_and(|deadline| deadline < now)
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub show_id: i64,
    pub user_id: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BookingWithShow {
    #[sqlx(flatten)]
    pub booking: Booking,
    pub show_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BookingSeatView {
    pub seat_no: String,
    pub status: SeatStatus,
}

/// Read model returned by the booking lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingView {
    pub id: i64,
    pub show_id: i64,
    pub show_name: String,
    pub user_id: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub seats: Vec<BookingSeatView>,
}

/// Outcome of a successful reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    #[serde(flatten)]
    pub booking: Booking,
    pub seat_nos: Vec<String>,
}

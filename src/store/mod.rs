//! Inventory store: the single source of truth for shows, seats and bookings.
//!
//! Every mutation goes through a [`StoreTx`]. A transaction either commits all of its
//! writes or none of them; dropping it without calling [`StoreTx::commit`] rolls back.
//! Row locks taken inside a transaction are held until it ends.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::BookingError;
use crate::models::{
    Booking, BookingSeatView, BookingStatus, BookingWithShow, NewBooking, NewShow, Seat,
    SeatStatus, Show,
};

pub use memory::MemoryInventoryStore;
pub use postgres::PgInventoryStore;

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, BookingError>;

    /// All shows ordered by start time, then id.
    async fn list_shows(&self) -> Result<Vec<Show>, BookingError>;

    async fn get_show(&self, show_id: i64) -> Result<Option<Show>, BookingError>;

    /// Seats of a show ordered by `seat_no`.
    async fn list_seats(&self, show_id: i64) -> Result<Vec<Seat>, BookingError>;

    async fn find_booking(&self, booking_id: i64) -> Result<Option<BookingWithShow>, BookingError>;

    /// Seats attached to a booking ordered by `seat_no`.
    async fn booking_seats(&self, booking_id: i64) -> Result<Vec<BookingSeatView>, BookingError>;
}

#[async_trait]
pub trait StoreTx: Send {
    async fn show_exists(&mut self, show_id: i64) -> Result<bool, BookingError>;

    async fn insert_show(&mut self, show: &NewShow) -> Result<Show, BookingError>;

    async fn insert_seats(&mut self, show_id: i64, seat_nos: &[String]) -> Result<u64, BookingError>;

    /// Exclusively locks the seats of `show_id` named in `seat_nos`, waiting for
    /// other holders. Locks are taken in ascending `seat_no` order. Labels that do not
    /// exist are simply absent from the result.
    async fn lock_seats(&mut self, show_id: i64, seat_nos: &[String]) -> Result<Vec<Seat>, BookingError>;

    async fn insert_booking(&mut self, booking: &NewBooking) -> Result<Booking, BookingError>;

    async fn insert_booking_seats(&mut self, booking_id: i64, seat_ids: &[i64]) -> Result<(), BookingError>;

    async fn set_seat_status(&mut self, seat_ids: &[i64], status: SeatStatus) -> Result<u64, BookingError>;

    /// Moves seats currently in `from` to `to`; seats in any other state are left alone.
    /// Returns the number of seats changed.
    async fn transition_seats(
        &mut self,
        seat_ids: &[i64],
        from: SeatStatus,
        to: SeatStatus,
    ) -> Result<u64, BookingError>;

    /// Locks PENDING bookings whose deadline is before `now`, skipping rows locked by
    /// any other transaction. Never waits.
    async fn lock_expired_bookings(&mut self, now: DateTime<Utc>) -> Result<Vec<i64>, BookingError>;

    /// Exclusively locks one booking row, waiting for other holders.
    async fn lock_booking(&mut self, booking_id: i64) -> Result<Option<Booking>, BookingError>;

    async fn booking_seat_ids(&mut self, booking_ids: &[i64]) -> Result<Vec<i64>, BookingError>;

    async fn set_booking_status(
        &mut self,
        booking_ids: &[i64],
        status: BookingStatus,
    ) -> Result<u64, BookingError>;

    async fn commit(self: Box<Self>) -> Result<(), BookingError>;

    async fn rollback(self: Box<Self>) -> Result<(), BookingError>;
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use std::time::Duration;

use super::{InventoryStore, StoreTx};
use crate::database::Database;
use crate::error::BookingError;
use crate::models::{
    Booking, BookingSeatView, BookingStatus, BookingWithShow, NewBooking, NewShow, Seat,
    SeatStatus, Show,
};

const SHOW_COLUMNS: &str = "id, name, start_time, total_seats, created_at";
const SEAT_COLUMNS: &str = "id, show_id, seat_no, status";
const BOOKING_COLUMNS: &str = "id, show_id, user_id, status, created_at, expires_at";

/// Postgres-backed store. Seat locking is `SELECT ... FOR UPDATE`, the sweeper's
/// booking scan is `FOR UPDATE SKIP LOCKED`, and every transaction runs with a
/// `lock_timeout` so blocked reservations fail instead of hanging.
#[derive(Clone)]
pub struct PgInventoryStore {
    db: Database,
    lock_timeout: Duration,
}

impl PgInventoryStore {
    pub fn new(db: Database, lock_timeout: Duration) -> Self {
        Self { db, lock_timeout }
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, BookingError> {
        let mut tx = self.db.pool.begin().await?;

        // SET does not accept bind parameters; the value is an integer we own.
        let set_timeout = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        sqlx::query(&set_timeout).execute(&mut *tx).await?;

        Ok(Box::new(PgTx { tx }))
    }

    async fn list_shows(&self) -> Result<Vec<Show>, BookingError> {
        let shows = sqlx::query_as::<_, Show>(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows ORDER BY start_time, id"
        ))
        .fetch_all(&self.db.pool)
        .await?;
        Ok(shows)
    }

    async fn get_show(&self, show_id: i64) -> Result<Option<Show>, BookingError> {
        let show = sqlx::query_as::<_, Show>(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows WHERE id = $1"
        ))
        .bind(show_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(show)
    }

    async fn list_seats(&self, show_id: i64) -> Result<Vec<Seat>, BookingError> {
        let seats = sqlx::query_as::<_, Seat>(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE show_id = $1 ORDER BY seat_no"
        ))
        .bind(show_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(seats)
    }

    async fn find_booking(&self, booking_id: i64) -> Result<Option<BookingWithShow>, BookingError> {
        let booking = sqlx::query_as::<_, BookingWithShow>(
            r#"
            SELECT b.id, b.show_id, b.user_id, b.status, b.created_at, b.expires_at,
                   s.name AS show_name
            FROM bookings b
            JOIN shows s ON b.show_id = s.id
            WHERE b.id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(booking)
    }

    async fn booking_seats(&self, booking_id: i64) -> Result<Vec<BookingSeatView>, BookingError> {
        let seats = sqlx::query_as::<_, BookingSeatView>(
            r#"
            SELECT s.seat_no, s.status
            FROM booking_seats bs
            JOIN seats s ON bs.seat_id = s.id
            WHERE bs.booking_id = $1
            ORDER BY s.seat_no
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(seats)
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn show_exists(&mut self, show_id: i64) -> Result<bool, BookingError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM shows WHERE id = $1)")
            .bind(show_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn insert_show(&mut self, show: &NewShow) -> Result<Show, BookingError> {
        let created = sqlx::query_as::<_, Show>(&format!(
            "INSERT INTO shows (name, start_time, total_seats) VALUES ($1, $2, $3) RETURNING {SHOW_COLUMNS}"
        ))
        .bind(&show.name)
        .bind(show.start_time)
        .bind(show.total_seats)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(created)
    }

    async fn insert_seats(&mut self, show_id: i64, seat_nos: &[String]) -> Result<u64, BookingError> {
        let result = sqlx::query(
            r#"
            INSERT INTO seats (show_id, seat_no, status)
            SELECT $1, seat_no, 'AVAILABLE'
            FROM UNNEST($2::text[]) AS t(seat_no)
            "#,
        )
        .bind(show_id)
        .bind(seat_nos)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn lock_seats(&mut self, show_id: i64, seat_nos: &[String]) -> Result<Vec<Seat>, BookingError> {
        let seats = sqlx::query_as::<_, Seat>(&format!(
            r#"
            SELECT {SEAT_COLUMNS}
            FROM seats
            WHERE show_id = $1 AND seat_no = ANY($2)
            ORDER BY seat_no
            FOR UPDATE
            "#
        ))
        .bind(show_id)
        .bind(seat_nos)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(seats)
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> Result<Booking, BookingError> {
        let created = sqlx::query_as::<_, Booking>(&format!(
            r#"
            INSERT INTO bookings (show_id, user_id, status, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking.show_id)
        .bind(&booking.user_id)
        .bind(booking.status)
        .bind(booking.created_at)
        .bind(booking.expires_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(created)
    }

    async fn insert_booking_seats(&mut self, booking_id: i64, seat_ids: &[i64]) -> Result<(), BookingError> {
        sqlx::query(
            "INSERT INTO booking_seats (booking_id, seat_id) SELECT $1, UNNEST($2::bigint[])",
        )
        .bind(booking_id)
        .bind(seat_ids)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn set_seat_status(&mut self, seat_ids: &[i64], status: SeatStatus) -> Result<u64, BookingError> {
        let result = sqlx::query("UPDATE seats SET status = $1 WHERE id = ANY($2)")
            .bind(status)
            .bind(seat_ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn transition_seats(
        &mut self,
        seat_ids: &[i64],
        from: SeatStatus,
        to: SeatStatus,
    ) -> Result<u64, BookingError> {
        // Lock in the same order reservations do before updating.
        sqlx::query("SELECT id FROM seats WHERE id = ANY($1) ORDER BY show_id, seat_no FOR UPDATE")
            .bind(seat_ids)
            .execute(&mut *self.tx)
            .await?;

        let result = sqlx::query("UPDATE seats SET status = $1 WHERE id = ANY($2) AND status = $3")
            .bind(to)
            .bind(seat_ids)
            .bind(from)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn lock_expired_bookings(&mut self, now: DateTime<Utc>) -> Result<Vec<i64>, BookingError> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM bookings
            WHERE status = 'PENDING' AND expires_at < $1
            ORDER BY id
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(now)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn lock_booking(&mut self, booking_id: i64) -> Result<Option<Booking>, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
        ))
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(booking)
    }

    async fn booking_seat_ids(&mut self, booking_ids: &[i64]) -> Result<Vec<i64>, BookingError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT seat_id FROM booking_seats WHERE booking_id = ANY($1) ORDER BY seat_id",
        )
        .bind(booking_ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn set_booking_status(
        &mut self,
        booking_ids: &[i64],
        status: BookingStatus,
    ) -> Result<u64, BookingError> {
        let result = sqlx::query("UPDATE bookings SET status = $1 WHERE id = ANY($2)")
            .bind(status)
            .bind(booking_ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), BookingError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), BookingError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

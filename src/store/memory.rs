//! In-process inventory store.
//!
//! Every seat and booking row carries its own async mutex. A transaction keeps the
//! owned guards of the rows it locked, buffers its writes, and publishes them in one
//! step on commit while still holding those guards. Readers outside a transaction only
//! ever see committed state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use super::{InventoryStore, StoreTx};
use crate::error::BookingError;
use crate::models::{
    Booking, BookingSeatView, BookingStatus, BookingWithShow, NewBooking, NewShow, Seat,
    SeatStatus, Show,
};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

struct Row<T> {
    data: T,
    lock: Arc<RowLock<()>>,
}

impl<T> Row<T> {
    fn new(data: T) -> Self {
        Self { data, lock: Arc::new(RowLock::new(())) }
    }
}

#[derive(Default)]
struct Tables {
    shows: BTreeMap<i64, Show>,
    seats: BTreeMap<i64, Row<Seat>>,
    // (show_id, seat_no) -> seat id; iteration order is the lock order
    seat_index: BTreeMap<(i64, String), i64>,
    bookings: BTreeMap<i64, Row<Booking>>,
    booking_seats: Vec<(i64, i64)>,
}

struct Shared {
    tables: Mutex<Tables>,
    next_show_id: AtomicI64,
    next_seat_id: AtomicI64,
    next_booking_id: AtomicI64,
    lock_timeout: Duration,
}

impl Shared {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        // Writers never panic while holding the guard; a poisoned map is still consistent.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct MemoryInventoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryInventoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl MemoryInventoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(Tables::default()),
                next_show_id: AtomicI64::new(1),
                next_seat_id: AtomicI64::new(1),
                next_booking_id: AtomicI64::new(1),
                lock_timeout,
            }),
        }
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, BookingError> {
        Ok(Box::new(MemoryTx::new(Arc::clone(&self.shared))))
    }

    async fn list_shows(&self) -> Result<Vec<Show>, BookingError> {
        let tables = self.shared.tables();
        let mut shows: Vec<Show> = tables.shows.values().cloned().collect();
        shows.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(shows)
    }

    async fn get_show(&self, show_id: i64) -> Result<Option<Show>, BookingError> {
        Ok(self.shared.tables().shows.get(&show_id).cloned())
    }

    async fn list_seats(&self, show_id: i64) -> Result<Vec<Seat>, BookingError> {
        let tables = self.shared.tables();
        let seats = tables
            .seat_index
            .range((show_id, String::new())..)
            .take_while(|((owner, _), _)| *owner == show_id)
            .filter_map(|(_, id)| tables.seats.get(id).map(|row| row.data.clone()))
            .collect();
        Ok(seats)
    }

    async fn find_booking(&self, booking_id: i64) -> Result<Option<BookingWithShow>, BookingError> {
        let tables = self.shared.tables();
        let found = tables.bookings.get(&booking_id).and_then(|row| {
            tables.shows.get(&row.data.show_id).map(|show| BookingWithShow {
                booking: row.data.clone(),
                show_name: show.name.clone(),
            })
        });
        Ok(found)
    }

    async fn booking_seats(&self, booking_id: i64) -> Result<Vec<BookingSeatView>, BookingError> {
        let tables = self.shared.tables();
        let mut seats: Vec<BookingSeatView> = tables
            .booking_seats
            .iter()
            .filter(|(owner, _)| *owner == booking_id)
            .filter_map(|(_, seat_id)| tables.seats.get(seat_id))
            .map(|row| BookingSeatView {
                seat_no: row.data.seat_no.clone(),
                status: row.data.status,
            })
            .collect();
        seats.sort_by(|a, b| a.seat_no.cmp(&b.seat_no));
        Ok(seats)
    }
}

pub struct MemoryTx {
    shared: Arc<Shared>,
    guards: Vec<OwnedMutexGuard<()>>,
    locked_seats: HashSet<i64>,
    locked_bookings: HashSet<i64>,
    new_shows: Vec<Show>,
    new_seats: Vec<Seat>,
    new_bookings: Vec<Booking>,
    new_booking_seats: Vec<(i64, i64)>,
    seat_writes: BTreeMap<i64, SeatStatus>,
    booking_writes: BTreeMap<i64, BookingStatus>,
}

impl MemoryTx {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            guards: Vec::new(),
            locked_seats: HashSet::new(),
            locked_bookings: HashSet::new(),
            new_shows: Vec::new(),
            new_seats: Vec::new(),
            new_bookings: Vec::new(),
            new_booking_seats: Vec::new(),
            seat_writes: BTreeMap::new(),
            booking_writes: BTreeMap::new(),
        }
    }

    async fn acquire(&mut self, lock: Arc<RowLock<()>>, what: String) -> Result<(), BookingError> {
        match tokio::time::timeout(self.shared.lock_timeout, lock.lock_owned()).await {
            Ok(guard) => {
                self.guards.push(guard);
                Ok(())
            }
            Err(_) => Err(BookingError::Transient(format!("timed out waiting for lock on {}", what))),
        }
    }

    /// Locks committed seat rows not yet held by this transaction, in
    /// (show_id, seat_no) order.
    async fn lock_seat_rows(&mut self, seat_ids: &[i64]) -> Result<(), BookingError> {
        let mut pending: Vec<((i64, String), i64, Arc<RowLock<()>>)> = {
            let tables = self.shared.tables();
            seat_ids
                .iter()
                .filter(|id| !self.locked_seats.contains(*id))
                .filter_map(|id| tables.seats.get(id))
                .map(|row| {
                    let key = (row.data.show_id, row.data.seat_no.clone());
                    (key, row.data.id, Arc::clone(&row.lock))
                })
                .collect()
        };
        pending.sort_by(|a, b| a.0.cmp(&b.0));
        pending.dedup_by_key(|entry| entry.1);

        for ((_, seat_no), id, lock) in pending {
            self.acquire(lock, format!("seat {}", seat_no)).await?;
            self.locked_seats.insert(id);
        }
        Ok(())
    }

    fn seat_view(&self, tables: &Tables, seat_id: i64) -> Option<Seat> {
        if let Some(seat) = self.new_seats.iter().find(|s| s.id == seat_id) {
            return Some(seat.clone());
        }
        tables.seats.get(&seat_id).map(|row| {
            let mut seat = row.data.clone();
            if let Some(status) = self.seat_writes.get(&seat_id) {
                seat.status = *status;
            }
            seat
        })
    }

    fn booking_view(&self, tables: &Tables, booking_id: i64) -> Option<Booking> {
        if let Some(booking) = self.new_bookings.iter().find(|b| b.id == booking_id) {
            return Some(booking.clone());
        }
        tables.bookings.get(&booking_id).map(|row| {
            let mut booking = row.data.clone();
            if let Some(status) = self.booking_writes.get(&booking_id) {
                booking.status = *status;
            }
            booking
        })
    }

    fn write_seat(&mut self, seat_id: i64, status: SeatStatus) {
        if let Some(seat) = self.new_seats.iter_mut().find(|s| s.id == seat_id) {
            seat.status = status;
        } else {
            self.seat_writes.insert(seat_id, status);
        }
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn show_exists(&mut self, show_id: i64) -> Result<bool, BookingError> {
        if self.new_shows.iter().any(|s| s.id == show_id) {
            return Ok(true);
        }
        Ok(self.shared.tables().shows.contains_key(&show_id))
    }

    async fn insert_show(&mut self, show: &NewShow) -> Result<Show, BookingError> {
        let created = Show {
            id: self.shared.next_show_id.fetch_add(1, Ordering::Relaxed),
            name: show.name.clone(),
            start_time: show.start_time,
            total_seats: show.total_seats,
            created_at: Utc::now(),
        };
        self.new_shows.push(created.clone());
        Ok(created)
    }

    async fn insert_seats(&mut self, show_id: i64, seat_nos: &[String]) -> Result<u64, BookingError> {
        let mut seen = HashSet::new();
        {
            let tables = self.shared.tables();
            for seat_no in seat_nos {
                let key = (show_id, seat_no.clone());
                let clash = tables.seat_index.contains_key(&key)
                    || self.new_seats.iter().any(|s| s.show_id == show_id && &s.seat_no == seat_no);
                if clash || !seen.insert(seat_no.as_str()) {
                    return Err(BookingError::Internal(anyhow::anyhow!(
                        "duplicate seat {} for show {}",
                        seat_no,
                        show_id
                    )));
                }
            }
        }

        for seat_no in seat_nos {
            self.new_seats.push(Seat {
                id: self.shared.next_seat_id.fetch_add(1, Ordering::Relaxed),
                show_id,
                seat_no: seat_no.clone(),
                status: SeatStatus::Available,
            });
        }
        Ok(seat_nos.len() as u64)
    }

    async fn lock_seats(&mut self, show_id: i64, seat_nos: &[String]) -> Result<Vec<Seat>, BookingError> {
        let wanted: HashSet<&str> = seat_nos.iter().map(String::as_str).collect();

        let committed: Vec<i64> = {
            let tables = self.shared.tables();
            tables
                .seat_index
                .range((show_id, String::new())..)
                .take_while(|((owner, _), _)| *owner == show_id)
                .filter(|((_, seat_no), _)| wanted.contains(seat_no.as_str()))
                .map(|(_, id)| *id)
                .collect()
        };
        self.lock_seat_rows(&committed).await?;

        let shared = Arc::clone(&self.shared);
        let tables = shared.tables();
        let mut seats: Vec<Seat> = committed
            .iter()
            .filter_map(|id| self.seat_view(&tables, *id))
            .chain(
                self.new_seats
                    .iter()
                    .filter(|s| s.show_id == show_id && wanted.contains(s.seat_no.as_str()))
                    .cloned(),
            )
            .collect();
        seats.sort_by(|a, b| a.seat_no.cmp(&b.seat_no));
        Ok(seats)
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> Result<Booking, BookingError> {
        let created = Booking {
            id: self.shared.next_booking_id.fetch_add(1, Ordering::Relaxed),
            show_id: booking.show_id,
            user_id: booking.user_id.clone(),
            status: booking.status,
            created_at: booking.created_at,
            expires_at: booking.expires_at,
        };
        self.new_bookings.push(created.clone());
        Ok(created)
    }

    async fn insert_booking_seats(&mut self, booking_id: i64, seat_ids: &[i64]) -> Result<(), BookingError> {
        self.new_booking_seats
            .extend(seat_ids.iter().map(|seat_id| (booking_id, *seat_id)));
        Ok(())
    }

    async fn set_seat_status(&mut self, seat_ids: &[i64], status: SeatStatus) -> Result<u64, BookingError> {
        self.lock_seat_rows(seat_ids).await?;

        let existing: Vec<i64> = {
            let tables = self.shared.tables();
            seat_ids
                .iter()
                .copied()
                .filter(|id| self.seat_view(&tables, *id).is_some())
                .collect()
        };
        for id in &existing {
            self.write_seat(*id, status);
        }
        Ok(existing.len() as u64)
    }

    async fn transition_seats(
        &mut self,
        seat_ids: &[i64],
        from: SeatStatus,
        to: SeatStatus,
    ) -> Result<u64, BookingError> {
        self.lock_seat_rows(seat_ids).await?;

        let matching: Vec<i64> = {
            let tables = self.shared.tables();
            let unique: HashSet<i64> = seat_ids.iter().copied().collect();
            unique
                .into_iter()
                .filter(|id| self.seat_view(&tables, *id).is_some_and(|seat| seat.status == from))
                .collect()
        };
        for id in &matching {
            self.write_seat(*id, to);
        }
        Ok(matching.len() as u64)
    }

    async fn lock_expired_bookings(&mut self, now: DateTime<Utc>) -> Result<Vec<i64>, BookingError> {
        let shared = Arc::clone(&self.shared);
        let candidates: Vec<(i64, Arc<RowLock<()>>)> = {
            let tables = shared.tables();
            tables
                .bookings
                .values()
                .filter(|row| {
                    self.booking_view(&tables, row.data.id)
                        .is_some_and(|b| b.is_expired_at(now))
                })
                .map(|row| (row.data.id, Arc::clone(&row.lock)))
                .collect()
        };

        let mut locked = Vec::new();
        for (id, lock) in candidates {
            if self.locked_bookings.contains(&id) {
                locked.push(id);
                continue;
            }
            // Held by another transaction: skip it, the next sweep will see it again.
            let Ok(guard) = lock.try_lock_owned() else {
                continue;
            };
            let still_expired = {
                let tables = shared.tables();
                self.booking_view(&tables, id).is_some_and(|b| b.is_expired_at(now))
            };
            if still_expired {
                self.guards.push(guard);
                self.locked_bookings.insert(id);
                locked.push(id);
            }
        }
        Ok(locked)
    }

    async fn lock_booking(&mut self, booking_id: i64) -> Result<Option<Booking>, BookingError> {
        if !self.locked_bookings.contains(&booking_id) {
            let lock = {
                let tables = self.shared.tables();
                tables.bookings.get(&booking_id).map(|row| Arc::clone(&row.lock))
            };
            if let Some(lock) = lock {
                self.acquire(lock, format!("booking {}", booking_id)).await?;
                self.locked_bookings.insert(booking_id);
            }
        }

        let shared = Arc::clone(&self.shared);
        let tables = shared.tables();
        Ok(self.booking_view(&tables, booking_id))
    }

    async fn booking_seat_ids(&mut self, booking_ids: &[i64]) -> Result<Vec<i64>, BookingError> {
        let wanted: HashSet<i64> = booking_ids.iter().copied().collect();
        let tables = self.shared.tables();
        let mut ids: Vec<i64> = tables
            .booking_seats
            .iter()
            .chain(self.new_booking_seats.iter())
            .filter(|(booking_id, _)| wanted.contains(booking_id))
            .map(|(_, seat_id)| *seat_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn set_booking_status(
        &mut self,
        booking_ids: &[i64],
        status: BookingStatus,
    ) -> Result<u64, BookingError> {
        let mut changed = 0;
        for id in booking_ids {
            let staged = self.new_bookings.iter_mut().find(|b| b.id == *id);
            if let Some(booking) = staged {
                booking.status = status;
                changed += 1;
                continue;
            }
            if self.lock_booking(*id).await?.is_some() {
                self.booking_writes.insert(*id, status);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn commit(self: Box<Self>) -> Result<(), BookingError> {
        let tx = *self;
        {
            let mut tables = tx.shared.tables();
            for show in &tx.new_shows {
                tables.shows.insert(show.id, show.clone());
            }
            for seat in &tx.new_seats {
                tables.seat_index.insert((seat.show_id, seat.seat_no.clone()), seat.id);
                tables.seats.insert(seat.id, Row::new(seat.clone()));
            }
            for booking in &tx.new_bookings {
                tables.bookings.insert(booking.id, Row::new(booking.clone()));
            }
            tables.booking_seats.extend(tx.new_booking_seats.iter().copied());
            for (id, status) in &tx.seat_writes {
                if let Some(row) = tables.seats.get_mut(id) {
                    row.data.status = *status;
                }
            }
            for (id, status) in &tx.booking_writes {
                if let Some(row) = tables.bookings.get_mut(id) {
                    row.data.status = *status;
                }
            }
        }
        // Row guards are released only after the writes are visible.
        drop(tx);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), BookingError> {
        drop(self);
        Ok(())
    }
}

//! Reservation engine: turns a seat request into a PENDING or CONFIRMED booking.
//!
//! Each call is one store transaction. The requested seat rows are locked (blocking,
//! ascending `seat_no`) before their status is inspected, so of any number of
//! concurrent requests for an overlapping seat, exactly one observes it AVAILABLE.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::BookingConfig;
use crate::error::BookingError;
use crate::models::{Booking, BookingStatus, NewBooking, Reservation, SeatStatus};
use crate::store::{InventoryStore, StoreTx};

#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub show_id: i64,
    pub seat_nos: Vec<String>,
    pub user_id: String,
    /// Book straight to CONFIRMED instead of placing a hold.
    pub immediate_confirm: bool,
}

#[derive(Clone)]
pub struct ReservationEngine {
    store: Arc<dyn InventoryStore>,
    config: BookingConfig,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn InventoryStore>, config: BookingConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    /// Input checks that need no transaction.
    pub fn validate(&self, req: &ReserveRequest) -> Result<(), BookingError> {
        if req.user_id.trim().is_empty() {
            return Err(BookingError::BadRequest("user_id is required".to_string()));
        }
        if req.seat_nos.is_empty() {
            return Err(BookingError::BadRequest("seat_nos must be a non-empty array".to_string()));
        }
        if req.seat_nos.len() > self.config.max_seats_per_booking {
            return Err(BookingError::BadRequest(format!(
                "Cannot book more than {} seats at once",
                self.config.max_seats_per_booking
            )));
        }
        if req.seat_nos.iter().any(|seat_no| seat_no.trim().is_empty()) {
            return Err(BookingError::BadRequest("seat numbers must not be blank".to_string()));
        }

        let mut seen = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();
        for seat_no in &req.seat_nos {
            if !seen.insert(seat_no.as_str()) && !duplicates.contains(seat_no) {
                duplicates.push(seat_no.clone());
            }
        }
        if !duplicates.is_empty() {
            return Err(BookingError::BadRequest(format!(
                "Duplicate seat numbers: {}",
                duplicates.join(", ")
            )));
        }
        Ok(())
    }

    pub async fn reserve(&self, req: ReserveRequest) -> Result<Reservation, BookingError> {
        self.validate(&req)?;

        let mut tx = self.store.begin().await?;
        let outcome = self.reserve_in(tx.as_mut(), &req, Utc::now()).await;
        let reservation = match super::finish(tx, outcome).await {
            Ok(reservation) => reservation,
            Err(err) => {
                if let BookingError::Conflict { seats, .. } = &err {
                    warn!(show_id = req.show_id, user_id = %req.user_id, ?seats, "Booking rejected: {}", err);
                }
                return Err(err);
            }
        };

        info!(
            "Booking {} created: {} - seats {}",
            reservation.booking.id,
            reservation.booking.status,
            reservation.seat_nos.join(", ")
        );
        Ok(reservation)
    }

    async fn reserve_in(
        &self,
        tx: &mut dyn StoreTx,
        req: &ReserveRequest,
        now: DateTime<Utc>,
    ) -> Result<Reservation, BookingError> {
        if !tx.show_exists(req.show_id).await? {
            return Err(BookingError::NotFound(format!("Show with id {} not found", req.show_id)));
        }

        let seats = tx.lock_seats(req.show_id, &req.seat_nos).await?;

        if seats.len() != req.seat_nos.len() {
            let found: HashSet<&str> = seats.iter().map(|seat| seat.seat_no.as_str()).collect();
            let missing = req
                .seat_nos
                .iter()
                .filter(|seat_no| !found.contains(seat_no.as_str()))
                .cloned()
                .collect();
            return Err(BookingError::conflict("Seats not found", missing));
        }

        let unavailable: Vec<String> = seats
            .iter()
            .filter(|seat| !seat.is_available())
            .map(|seat| seat.seat_no.clone())
            .collect();
        if !unavailable.is_empty() {
            return Err(BookingError::conflict("Seats not available", unavailable));
        }

        let status = if req.immediate_confirm {
            BookingStatus::Confirmed
        } else {
            BookingStatus::Pending
        };
        let expires_at = match status {
            BookingStatus::Pending => Some(
                now.checked_add_signed(self.config.hold_duration())
                    .ok_or_else(|| anyhow::anyhow!("hold duration overflows the booking deadline"))?,
            ),
            _ => None,
        };

        let booking = tx
            .insert_booking(&NewBooking {
                show_id: req.show_id,
                user_id: req.user_id.clone(),
                status,
                created_at: now,
                expires_at,
            })
            .await?;

        let seat_ids: Vec<i64> = seats.iter().map(|seat| seat.id).collect();
        tx.insert_booking_seats(booking.id, &seat_ids).await?;
        tx.set_seat_status(&seat_ids, status.seat_status()).await?;

        Ok(Reservation {
            booking,
            seat_nos: req.seat_nos.clone(),
        })
    }

    /// Confirms a held booking. The booking row is locked first, so this never races
    /// the expiry sweeper: whichever transaction locks the row first wins.
    pub async fn confirm(&self, booking_id: i64) -> Result<Booking, BookingError> {
        self.confirm_at(booking_id, Utc::now()).await
    }

    pub async fn confirm_at(&self, booking_id: i64, now: DateTime<Utc>) -> Result<Booking, BookingError> {
        let mut tx = self.store.begin().await?;
        let outcome = confirm_in(tx.as_mut(), booking_id, now).await;
        let booking = super::finish(tx, outcome).await?;

        info!("Booking {} confirmed", booking.id);
        Ok(booking)
    }
}

async fn confirm_in(
    tx: &mut dyn StoreTx,
    booking_id: i64,
    now: DateTime<Utc>,
) -> Result<Booking, BookingError> {
    let booking = tx
        .lock_booking(booking_id)
        .await?
        .ok_or_else(|| BookingError::NotFound(format!("Booking with id {} not found", booking_id)))?;

    if booking.status != BookingStatus::Pending {
        return Err(BookingError::Conflict {
            message: format!("Booking {} is already {}", booking_id, booking.status),
            seats: Vec::new(),
        });
    }
    if booking.is_expired_at(now) {
        return Err(BookingError::Conflict {
            message: format!("Hold for booking {} has expired", booking_id),
            seats: Vec::new(),
        });
    }

    let seat_ids = tx.booking_seat_ids(&[booking_id]).await?;
    let moved = tx
        .transition_seats(&seat_ids, SeatStatus::Reserved, SeatStatus::Booked)
        .await?;
    if moved != seat_ids.len() as u64 {
        return Err(BookingError::Internal(anyhow::anyhow!(
            "booking {} holds {} seats but only {} were RESERVED",
            booking_id,
            seat_ids.len(),
            moved
        )));
    }
    tx.set_booking_status(&[booking_id], BookingStatus::Confirmed).await?;

    Ok(Booking {
        status: BookingStatus::Confirmed,
        ..booking
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryInventoryStore;
    use proptest::prelude::*;

    fn engine() -> ReservationEngine {
        ReservationEngine::new(Arc::new(MemoryInventoryStore::default()), BookingConfig::default())
    }

    fn request(seats: &[&str]) -> ReserveRequest {
        ReserveRequest {
            show_id: 1,
            seat_nos: seats.iter().map(|s| s.to_string()).collect(),
            user_id: "u1".to_string(),
            immediate_confirm: true,
        }
    }

    #[test]
    fn rejects_empty_and_oversized_requests() {
        let engine = engine();
        assert!(matches!(engine.validate(&request(&[])), Err(BookingError::BadRequest(_))));

        let eleven: Vec<String> = (1..=11).map(|n| n.to_string()).collect();
        let refs: Vec<&str> = eleven.iter().map(String::as_str).collect();
        let err = engine.validate(&request(&refs)).unwrap_err();
        assert_eq!(err.to_string(), "Cannot book more than 10 seats at once");
    }

    #[test]
    fn rejects_duplicates_naming_them_once() {
        let err = engine().validate(&request(&["1", "2", "1", "1", "2"])).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate seat numbers: 1, 2");
    }

    #[test]
    fn rejects_blank_user_and_blank_labels() {
        let engine = engine();
        let mut req = request(&["1"]);
        req.user_id = "  ".to_string();
        assert!(matches!(engine.validate(&req), Err(BookingError::BadRequest(_))));
        assert!(matches!(engine.validate(&request(&["1", " "])), Err(BookingError::BadRequest(_))));
    }

    proptest! {
        #[test]
        fn distinct_labels_within_limit_are_accepted(labels in prop::collection::hash_set("[A-Z]?[0-9]{1,3}", 1..=10)) {
            let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
            prop_assert!(engine().validate(&request(&refs)).is_ok());
        }
    }
}

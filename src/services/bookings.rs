use std::sync::Arc;

use crate::error::BookingError;
use crate::models::BookingView;
use crate::store::InventoryStore;

/// Unlocked, read-only booking lookups.
#[derive(Clone)]
pub struct BookingQueryService {
    store: Arc<dyn InventoryStore>,
}

impl BookingQueryService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn get_booking(&self, booking_id: i64) -> Result<BookingView, BookingError> {
        let found = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Booking with id {} not found", booking_id)))?;
        let seats = self.store.booking_seats(booking_id).await?;

        let booking = found.booking;
        Ok(BookingView {
            id: booking.id,
            show_id: booking.show_id,
            show_name: found.show_name,
            user_id: booking.user_id,
            status: booking.status,
            created_at: booking.created_at,
            expires_at: booking.expires_at,
            seats,
        })
    }
}

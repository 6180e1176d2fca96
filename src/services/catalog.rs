use std::sync::Arc;
use tracing::info;

use crate::error::BookingError;
use crate::models::{NewShow, Seat, Show};
use crate::store::InventoryStore;

pub const MAX_SEATS_PER_SHOW: i32 = 1000;

/// Show creation and the read side of the seat inventory.
#[derive(Clone)]
pub struct ShowCatalog {
    store: Arc<dyn InventoryStore>,
}

impl ShowCatalog {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Creates the show together with seats "1".."total_seats", all AVAILABLE.
    pub async fn create_show(&self, new_show: NewShow) -> Result<Show, BookingError> {
        let new_show = NewShow {
            name: new_show.name.trim().to_string(),
            ..new_show
        };
        if new_show.name.is_empty() {
            return Err(BookingError::BadRequest("name is required".to_string()));
        }
        if !(1..=MAX_SEATS_PER_SHOW).contains(&new_show.total_seats) {
            return Err(BookingError::BadRequest(format!(
                "total_seats must be between 1 and {}",
                MAX_SEATS_PER_SHOW
            )));
        }

        let mut tx = self.store.begin().await?;
        let outcome = async {
            let show = tx.insert_show(&new_show).await?;
            tx.insert_seats(show.id, &new_show.seat_labels()).await?;
            Ok::<_, BookingError>(show)
        }
        .await;
        let show = super::finish(tx, outcome).await?;

        info!("Created show {} with {} seats", show.id, show.total_seats);
        Ok(show)
    }

    pub async fn list_shows(&self) -> Result<Vec<Show>, BookingError> {
        self.store.list_shows().await
    }

    pub async fn list_seats(&self, show_id: i64) -> Result<Vec<Seat>, BookingError> {
        if self.store.get_show(show_id).await?.is_none() {
            return Err(BookingError::NotFound(format!("Show with id {} not found", show_id)));
        }
        self.store.list_seats(show_id).await
    }
}

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use seat_reservation::config::BookingConfig;
use seat_reservation::models::{NewShow, SeatStatus, Show};
use seat_reservation::services::{
    BookingQueryService, ExpirySweeper, ReservationEngine, ReserveRequest, ShowCatalog,
};
use seat_reservation::store::{InventoryStore, MemoryInventoryStore};

pub struct Harness {
    pub store: Arc<dyn InventoryStore>,
    pub catalog: ShowCatalog,
    pub engine: ReservationEngine,
    pub bookings: BookingQueryService,
    pub sweeper: ExpirySweeper,
}

pub fn harness() -> Harness {
    harness_with(MemoryInventoryStore::default(), BookingConfig::default())
}

pub fn harness_with(store: MemoryInventoryStore, config: BookingConfig) -> Harness {
    harness_on(Arc::new(store), config)
}

pub fn harness_on(store: Arc<dyn InventoryStore>, config: BookingConfig) -> Harness {
    Harness {
        catalog: ShowCatalog::new(store.clone()),
        engine: ReservationEngine::new(store.clone(), config),
        bookings: BookingQueryService::new(store.clone()),
        sweeper: ExpirySweeper::new(store.clone()),
        store,
    }
}

pub fn gala_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 1, 20, 0, 0).unwrap()
}

pub async fn create_show(h: &Harness, name: &str, total_seats: i32) -> Show {
    h.catalog
        .create_show(NewShow {
            name: name.to_string(),
            start_time: gala_start(),
            total_seats,
        })
        .await
        .expect("show creation should succeed")
}

pub fn request(show_id: i64, seats: &[&str], user: &str, immediate_confirm: bool) -> ReserveRequest {
    ReserveRequest {
        show_id,
        seat_nos: seats.iter().map(|s| s.to_string()).collect(),
        user_id: user.to_string(),
        immediate_confirm,
    }
}

pub async fn seat_status(h: &Harness, show_id: i64, seat_no: &str) -> SeatStatus {
    h.catalog
        .list_seats(show_id)
        .await
        .unwrap()
        .into_iter()
        .find(|seat| seat.seat_no == seat_no)
        .map(|seat| seat.status)
        .unwrap_or_else(|| panic!("seat {} missing", seat_no))
}

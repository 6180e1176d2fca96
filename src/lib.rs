pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use config::BookingConfig;
use services::{BookingQueryService, ReservationEngine, ShowCatalog};
use store::InventoryStore;

pub use error::BookingError;

// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: ShowCatalog,
    pub engine: ReservationEngine,
    pub bookings: BookingQueryService,
}

impl AppState {
    pub fn new(store: Arc<dyn InventoryStore>, booking: BookingConfig) -> Self {
        Self {
            catalog: ShowCatalog::new(store.clone()),
            engine: ReservationEngine::new(store.clone(), booking),
            bookings: BookingQueryService::new(store),
        }
    }
}

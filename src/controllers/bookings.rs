use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::{AppState, BookingError};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{id}", get(get_booking))
        .route("/{id}/confirm", post(confirm_booking))
}

// GET /bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state.bookings.get_booking(booking_id).await?;
    Ok(Json(json!({ "booking": booking })))
}

// POST /bookings/{id}/confirm
async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    state.engine.confirm(booking_id).await?;
    let booking = state.bookings.get_booking(booking_id).await?;
    Ok(Json(json!({
        "message": "Booking confirmed",
        "booking": booking,
    })))
}

pub mod admin;
pub mod bookings;
pub mod shows;

use axum::{
    extract::rejection::JsonRejection,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{AppState, BookingError};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .nest("/admin", admin::routes())
        .nest("/shows", shows::routes())
        .nest("/bookings", bookings::routes())
}

/// Full application router with state attached.
pub fn router(state: Arc<AppState>) -> Router {
    routes().with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "timestamp": chrono::Utc::now() }))
}

/// Unwraps a JSON body and runs its `validator` rules; both failures are 400s.
pub(crate) fn validated<T: Validate>(body: Result<Json<T>, JsonRejection>) -> Result<T, BookingError> {
    let Json(payload) = body.map_err(|rejection| BookingError::BadRequest(rejection.body_text()))?;
    payload
        .validate()
        .map_err(|errors| BookingError::BadRequest(errors.to_string()))?;
    Ok(payload)
}

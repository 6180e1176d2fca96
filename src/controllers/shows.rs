use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{services::ReserveRequest, AppState, BookingError};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_shows))
        .route("/{id}/seats", get(list_seats))
        .route("/{id}/book", post(book_seats))
}

// GET /shows
async fn list_shows(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, BookingError> {
    let shows = state.catalog.list_shows().await?;
    Ok(Json(json!({
        "count": shows.len(),
        "shows": shows,
    })))
}

// GET /shows/{id}/seats
async fn list_seats(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let seats = state.catalog.list_seats(show_id).await?;
    Ok(Json(json!({
        "show_id": show_id,
        "count": seats.len(),
        "seats": seats,
    })))
}

// POST /shows/{id}/book
#[derive(Debug, Deserialize, Validate)]
pub struct BookSeatsRequest {
    #[validate(length(min = 1))]
    pub seat_nos: Vec<String>,
    #[validate(length(min = 1))]
    pub user_id: String,
    #[serde(default = "default_immediate_confirm")]
    pub immediate_confirm: bool,
}

fn default_immediate_confirm() -> bool {
    true
}

async fn book_seats(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<i64>,
    body: Result<Json<BookSeatsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BookingError> {
    let req = super::validated(body)?;

    let reservation = state
        .engine
        .reserve(ReserveRequest {
            show_id,
            seat_nos: req.seat_nos,
            user_id: req.user_id,
            immediate_confirm: req.immediate_confirm,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Booking created successfully",
            "booking": reservation,
        })),
    ))
}

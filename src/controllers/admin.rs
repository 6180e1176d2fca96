use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{models::NewShow, AppState, BookingError};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shows", post(create_show))
}

// POST /admin/shows
#[derive(Debug, Deserialize, Validate)]
pub struct CreateShowRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub start_time: DateTime<Utc>,
    #[validate(range(min = 1, max = 1000))]
    pub total_seats: i32,
}

async fn create_show(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateShowRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BookingError> {
    let req = super::validated(body)?;

    let show = state
        .catalog
        .create_show(NewShow {
            name: req.name,
            start_time: req.start_time,
            total_seats: req.total_seats,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Show created successfully",
            "show": show,
        })),
    ))
}

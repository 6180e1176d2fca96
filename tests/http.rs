use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use seat_reservation::config::BookingConfig;
use seat_reservation::controllers;
use seat_reservation::store::{InventoryStore, MemoryInventoryStore};
use seat_reservation::AppState;

fn app() -> Router {
    let store: Arc<dyn InventoryStore> = Arc::new(MemoryInventoryStore::default());
    controllers::router(Arc::new(AppState::new(store, BookingConfig::default())))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_show(app: &Router, total_seats: i32) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/admin/shows",
        Some(json!({
            "name": "Jazz Night",
            "start_time": "2025-12-01T20:00:00Z",
            "total_seats": total_seats,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["show"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn created_show_appears_with_its_seats() {
    let app = app();
    let show_id = create_show(&app, 3).await;

    let (status, body) = send(&app, Method::GET, "/shows", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["shows"][0]["name"], "Jazz Night");

    let (status, body) = send(&app, Method::GET, &format!("/shows/{show_id}/seats"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["seats"][0]["seat_no"], "1");
    assert_eq!(body["seats"][0]["status"], "AVAILABLE");
}

#[tokio::test]
async fn invalid_show_is_rejected() {
    let app = app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/admin/shows",
        Some(json!({ "name": "Too big", "start_time": "2025-12-01T20:00:00Z", "total_seats": 1001 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_defaults_to_immediate_confirmation() {
    let app = app();
    let show_id = create_show(&app, 5).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/shows/{show_id}/book"),
        Some(json!({ "seat_nos": ["2", "1"], "user_id": "alice" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["booking"]["status"], "CONFIRMED");
    assert_eq!(body["booking"]["seat_nos"], json!(["2", "1"]));
    assert!(body["booking"]["expires_at"].is_null());
}

#[tokio::test]
async fn taken_seats_answer_conflict_with_their_labels() {
    let app = app();
    let show_id = create_show(&app, 5).await;
    let uri = format!("/shows/{show_id}/book");

    let (status, _) = send(&app, Method::POST, &uri, Some(json!({ "seat_nos": ["3"], "user_id": "a" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "seat_nos": ["3", "4"], "user_id": "b" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["seats"], json!(["3"]));
    assert!(body["error"].as_str().unwrap().contains('3'));
}

#[tokio::test]
async fn malformed_booking_bodies_are_bad_requests() {
    let app = app();
    let show_id = create_show(&app, 20).await;
    let uri = format!("/shows/{show_id}/book");
    let eleven: Vec<String> = (1..=11).map(|n| n.to_string()).collect();

    let bodies = [
        json!({ "seat_nos": [], "user_id": "a" }),
        json!({ "seat_nos": ["1"] }),
        json!({ "seat_nos": "1", "user_id": "a" }),
        json!({ "seat_nos": ["1"], "user_id": "" }),
        json!({ "seat_nos": eleven, "user_id": "a" }),
    ];

    for body in bodies {
        let (status, response) = send(&app, Method::POST, &uri, Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body} -> {response}");
        assert!(response["error"].is_string());
    }
}

#[tokio::test]
async fn booking_for_unknown_show_is_not_found() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/shows/999/book",
        Some(json!({ "seat_nos": ["1"], "user_id": "a" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn pending_booking_can_be_viewed_and_confirmed() {
    let app = app();
    let show_id = create_show(&app, 4).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/shows/{show_id}/book"),
        Some(json!({ "seat_nos": ["4"], "user_id": "carol", "immediate_confirm": false })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["booking"]["status"], "PENDING");
    let booking_id = body["booking"]["id"].as_i64().unwrap();

    let (status, body) = send(&app, Method::GET, &format!("/bookings/{booking_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["show_name"], "Jazz Night");
    assert_eq!(body["booking"]["seats"], json!([{ "seat_no": "4", "status": "RESERVED" }]));

    let confirm = format!("/bookings/{booking_id}/confirm");
    let (status, body) = send(&app, Method::POST, &confirm, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "CONFIRMED");
    assert_eq!(body["booking"]["seats"][0]["status"], "BOOKED");

    let (status, _) = send(&app, Method::POST, &confirm, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_booking_is_not_found() {
    let app = app();

    let (status, _) = send(&app, Method::GET, "/bookings/77", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

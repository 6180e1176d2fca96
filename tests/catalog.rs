mod common;

use chrono::Duration;

use common::{create_show, gala_start, harness, request};
use seat_reservation::models::{BookingSeatView, BookingStatus, NewShow, SeatStatus};
use seat_reservation::BookingError;

#[tokio::test]
async fn new_show_has_every_seat_available() {
    let h = harness();
    let show = create_show(&h, "Concert", 5).await;

    assert_eq!(show.name, "Concert");
    assert_eq!(show.total_seats, 5);
    assert_eq!(show.start_time, gala_start());

    let seats = h.catalog.list_seats(show.id).await.unwrap();
    let labels: Vec<&str> = seats.iter().map(|s| s.seat_no.as_str()).collect();
    assert_eq!(labels, ["1", "2", "3", "4", "5"]);
    assert!(seats.iter().all(|s| s.status == SeatStatus::Available && s.show_id == show.id));
}

#[tokio::test]
async fn seats_are_listed_in_label_order() {
    let h = harness();
    let show = create_show(&h, "Dozen", 12).await;

    let seats = h.catalog.list_seats(show.id).await.unwrap();
    let labels: Vec<&str> = seats.iter().map(|s| s.seat_no.as_str()).collect();

    assert_eq!(labels, ["1", "10", "11", "12", "2", "3", "4", "5", "6", "7", "8", "9"]);
}

#[tokio::test]
async fn show_creation_rejects_bad_input() {
    let h = harness();
    let cases = [("Empty", 0), ("Huge", 1001), ("   ", 10)];

    for (name, total_seats) in cases {
        let err = h
            .catalog
            .create_show(NewShow {
                name: name.to_string(),
                start_time: gala_start(),
                total_seats,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::BadRequest(_)), "{name}/{total_seats}: {err:?}");
    }
    assert!(h.catalog.list_shows().await.unwrap().is_empty());
}

#[tokio::test]
async fn largest_show_is_accepted() {
    let h = harness();
    let show = create_show(&h, "Arena", 1000).await;

    assert_eq!(h.catalog.list_seats(show.id).await.unwrap().len(), 1000);
}

#[tokio::test]
async fn shows_are_listed_by_start_time() {
    let h = harness();
    for (name, offset_days) in [("Late", 3), ("Early", 1), ("Middle", 2)] {
        h.catalog
            .create_show(NewShow {
                name: name.to_string(),
                start_time: gala_start() + Duration::days(offset_days),
                total_seats: 1,
            })
            .await
            .unwrap();
    }

    let names: Vec<String> = h
        .catalog
        .list_shows()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();

    assert_eq!(names, ["Early", "Middle", "Late"]);
}

#[tokio::test]
async fn seats_of_unknown_show_are_not_found() {
    let h = harness();

    let err = h.catalog.list_seats(404).await.unwrap_err();

    assert!(matches!(err, BookingError::NotFound(_)));
}

#[tokio::test]
async fn booking_view_carries_show_name_and_seats() {
    let h = harness();
    let show = create_show(&h, "Opera", 4).await;
    let held = h
        .engine
        .reserve(request(show.id, &["3", "1"], "alice", false))
        .await
        .unwrap();

    let view = h.bookings.get_booking(held.booking.id).await.unwrap();

    assert_eq!(view.id, held.booking.id);
    assert_eq!(view.show_name, "Opera");
    assert_eq!(view.user_id, "alice");
    assert_eq!(view.status, BookingStatus::Pending);
    assert_eq!(view.expires_at, held.booking.expires_at);
    assert_eq!(
        view.seats,
        vec![
            BookingSeatView { seat_no: "1".to_string(), status: SeatStatus::Reserved },
            BookingSeatView { seat_no: "3".to_string(), status: SeatStatus::Reserved },
        ]
    );
}

#[tokio::test]
async fn unknown_booking_is_not_found() {
    let h = harness();

    let err = h.bookings.get_booking(12345).await.unwrap_err();

    assert!(matches!(err, BookingError::NotFound(msg) if msg.contains("12345")));
}

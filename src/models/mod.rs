pub mod show;
pub mod seat;
pub mod booking;

pub use show::{NewShow, Show};
pub use seat::{Seat, SeatStatus};
pub use booking::{Booking, BookingSeatView, BookingStatus, BookingView, BookingWithShow, NewBooking, Reservation};

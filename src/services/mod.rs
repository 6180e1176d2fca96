pub mod catalog;
pub mod reservation;
pub mod expiry;
pub mod bookings;

pub use bookings::BookingQueryService;
pub use catalog::ShowCatalog;
pub use expiry::{ExpirySweeper, SweepReport, SweeperHandle};
pub use reservation::{ReservationEngine, ReserveRequest};

use tracing::warn;

use crate::error::BookingError;
use crate::store::StoreTx;

/// Commits `tx` when `outcome` is Ok, otherwise rolls it back and hands the error on.
pub(crate) async fn finish<T>(
    tx: Box<dyn StoreTx>,
    outcome: Result<T, BookingError>,
) -> Result<T, BookingError> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback failed after {}: {:?}", err, rollback_err);
            }
            Err(err)
        }
    }
}

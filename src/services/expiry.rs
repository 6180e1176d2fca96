//! Expiry sweeper: releases the seats of PENDING bookings whose hold has lapsed.
//!
//! A sweep locks the expired bookings with skip-locked semantics, so it never waits
//! on a booking that a confirmation (or another sweep) is working on; such bookings
//! are picked up by a later sweep if they are still PENDING by then.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::BookingError;
use crate::models::{BookingStatus, SeatStatus};
use crate::store::{InventoryStore, StoreTx};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_bookings: usize,
    pub released_seats: u64,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired_bookings == 0
    }
}

#[derive(Clone)]
pub struct ExpirySweeper {
    store: Arc<dyn InventoryStore>,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Runs one sweep in its own transaction, treating `now` as the current time.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport, BookingError> {
        let mut tx = self.store.begin().await?;
        let outcome = sweep_in(tx.as_mut(), now).await;
        super::finish(tx, outcome).await
    }

    /// Spawns the recurring sweep. The first sweep runs immediately.
    pub fn start(&self, interval: Duration) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let sweeper = self.clone();
        let token = cancel.clone();

        info!("Starting booking expiry sweeper (every {:?})", interval);
        let task = tokio::spawn(async move {
            // interval() rejects a zero period
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("Booking expiry sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        sweeper.run_logged().await;
                    }
                }
            }
        });

        SweeperHandle { cancel, task }
    }

    // Failures are logged and never leave the loop; the next tick retries.
    async fn run_logged(&self) {
        match self.sweep_once(Utc::now()).await {
            Ok(report) if report.is_empty() => debug!("No expired bookings"),
            Ok(report) => info!(
                expired = report.expired_bookings,
                released = report.released_seats,
                "Expired pending bookings"
            ),
            Err(e) => error!("Error expiring bookings: {}", e),
        }
    }
}

async fn sweep_in(tx: &mut dyn StoreTx, now: DateTime<Utc>) -> Result<SweepReport, BookingError> {
    let expired = tx.lock_expired_bookings(now).await?;
    if expired.is_empty() {
        return Ok(SweepReport::default());
    }

    debug!("Expiring {} bookings: {:?}", expired.len(), expired);

    let seat_ids = tx.booking_seat_ids(&expired).await?;
    // Only RESERVED seats go back; anything else was moved on by someone else.
    let released_seats = if seat_ids.is_empty() {
        0
    } else {
        tx.transition_seats(&seat_ids, SeatStatus::Reserved, SeatStatus::Available)
            .await?
    };
    tx.set_booking_status(&expired, BookingStatus::Failed).await?;

    Ok(SweepReport {
        expired_bookings: expired.len(),
        released_seats,
    })
}

/// Owns the background sweep task.
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the loop and waits for an in-flight sweep to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!("Expiry sweeper task ended abnormally: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

//! In-memory admission gate and seat reservation engine.
//!
//! [`launch`] wires the admission gate, the reservation book and the seat
//! lock table together behind a [`Frontdesk`] and starts the background
//! sweeper that drives expiry and queue promotion.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::bounded;
use turnstile_core::Config;

mod frontdesk;
mod gate;
mod reservations;
mod seats;
mod sweeper;

pub use frontdesk::Frontdesk;
use gate::AdmissionGate;
use reservations::ReservationBook;
use seats::SeatLockTable;
use sweeper::Sweeper;

/// Construct the engine and start its background sweeper
pub fn launch(config: &Config) -> Frontdesk {
    let gate = Arc::new(AdmissionGate::new(config));
    let reservations = Arc::new(ReservationBook::new(Duration::from_millis(
        config.reservation_ttl_ms,
    )));
    let seats = Arc::new(SeatLockTable::new(
        config.seats,
        Duration::from_millis(config.hold_ttl_ms),
    ));

    let (shutdown_sender, shutdown_receiver) = bounded(1);
    let mut sweeper = Sweeper::new(
        gate.clone(),
        reservations.clone(),
        seats.clone(),
        Duration::from_millis(config.sweep_interval_ms),
        shutdown_receiver,
    );
    let sweeper_thread = thread::spawn(move || sweeper.run());

    Frontdesk::new(gate, reservations, seats, shutdown_sender, sweeper_thread)
}

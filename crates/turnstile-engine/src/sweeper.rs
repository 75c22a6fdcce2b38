//! Background expiry sweep and admission cadence.
//!
//! TTLs are advisory cleanup, not a correctness mechanism: every operation
//! re-validates liveness at call time. The sweep exists to reclaim slots,
//! records and holds that nobody touches again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError};

use crate::gate::AdmissionGate;
use crate::reservations::ReservationBook;
use crate::seats::SeatLockTable;

/// Periodic janitor for the gate, the reservation book and the seat table
pub struct Sweeper {
    gate: Arc<AdmissionGate>,
    reservations: Arc<ReservationBook>,
    seats: Arc<SeatLockTable>,
    interval: Duration,
    shutdown: Receiver<()>,
}

impl Sweeper {
    /// Create a sweeper over the engine's shared state
    pub fn new(
        gate: Arc<AdmissionGate>,
        reservations: Arc<ReservationBook>,
        seats: Arc<SeatLockTable>,
        interval: Duration,
        shutdown: Receiver<()>,
    ) -> Self {
        Self {
            gate,
            reservations,
            seats,
            interval,
            shutdown,
        }
    }

    /// Run until the shutdown signal arrives
    ///
    /// The shutdown channel doubles as the tick clock.
    pub fn run(&mut self) {
        loop {
            match self.shutdown.recv_timeout(self.interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {}
            }
            let now = Instant::now();
            // Expired queue entries free slots before the promotion pass.
            self.gate.sweep(now);
            for reservation in self.reservations.sweep(now) {
                self.seats.release_all(reservation);
            }
            self.seats.sweep(now);
        }
    }
}

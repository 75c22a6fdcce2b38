//! The front desk: composes the gate, the reservation book and the seat
//! table per request.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::Sender;
use turnstile_core::{Rejection, Request, RequestHandler, RequestKind, ReservationState};

use crate::gate::AdmissionGate;
use crate::reservations::ReservationBook;
use crate::seats::SeatLockTable;

/// Entry point for all requests
///
/// Must implement the [`RequestHandler`] trait and is exposed from the
/// crate root; the transport calls [`RequestHandler::handle`] from many
/// threads concurrently.
pub struct Frontdesk {
    gate: Arc<AdmissionGate>,
    reservations: Arc<ReservationBook>,
    seats: Arc<SeatLockTable>,
    sweeper_shutdown: Sender<()>,
    sweeper_thread: JoinHandle<()>,
}

impl Frontdesk {
    pub(crate) fn new(
        gate: Arc<AdmissionGate>,
        reservations: Arc<ReservationBook>,
        seats: Arc<SeatLockTable>,
        sweeper_shutdown: Sender<()>,
        sweeper_thread: JoinHandle<()>,
    ) -> Self {
        Self {
            gate,
            reservations,
            seats,
            sweeper_shutdown,
            sweeper_thread,
        }
    }
}

impl RequestHandler for Frontdesk {
    fn handle(&self, mut rq: Request) {
        match rq.kind() {
            RequestKind::EnterQueue => {
                let entry = self.gate.enter(rq.user());
                rq.respond_with_entry(entry);
            }
            RequestKind::QueueStatus => {
                let Some(token) = rq.queue_token() else {
                    return rq.respond_with_rejection(Rejection::NotFound);
                };
                match self.gate.status(token) {
                    Ok(entry) => rq.respond_with_entry(entry),
                    Err(rejection) => rq.respond_with_rejection(rejection),
                }
            }
            RequestKind::LeaveQueue => {
                let Some(token) = rq.queue_token() else {
                    return rq.respond_with_rejection(Rejection::NotFound);
                };
                match self.gate.leave(token) {
                    Ok(()) => rq.respond_with_ok(),
                    Err(rejection) => rq.respond_with_rejection(rejection),
                }
            }
            RequestKind::CreateReservation => {
                // Admission is enforced here, at the entrance to the
                // ticketing path; later calls authenticate through the
                // reservation they name.
                let Some(token) = rq.queue_token() else {
                    return rq.respond_with_rejection(Rejection::NotAdmitted);
                };
                if let Err(rejection) = self.gate.touch_active(token, rq.user()) {
                    return rq.respond_with_rejection(rejection);
                }
                let reservation = self.reservations.create(rq.user());
                rq.respond_with_reservation(true, reservation);
            }
            RequestKind::TransitionReservation => {
                let Some(id) = rq.reservation() else {
                    return rq.respond_with_rejection(Rejection::NotFound);
                };
                let Some(body) = rq.read_transition() else {
                    return rq.respond_with_err("malformed transition payload");
                };
                // Keep the caller on the admission clock while they move
                // through the purchase flow.
                if let Some(token) = rq.queue_token() {
                    let _ = self.gate.touch_active(token, rq.user());
                }
                // EXPIRED is system-driven; callers may not request it.
                if !matches!(
                    body.state,
                    ReservationState::Paying
                        | ReservationState::Confirmed
                        | ReservationState::Cancelled
                ) {
                    return rq.respond_with_rejection(Rejection::InvalidTransition);
                }
                match self
                    .reservations
                    .transition(id, rq.user(), body.expected_version, body.state)
                {
                    Ok(reservation) => {
                        match body.state {
                            // A payer gets a fresh hold window while they
                            // enter payment details.
                            ReservationState::Paying => self.seats.refresh_all(id),
                            ReservationState::Cancelled => self.seats.release_all(id),
                            _ => {}
                        }
                        rq.respond_with_reservation(false, reservation);
                    }
                    Err(rejection) => rq.respond_with_rejection(rejection),
                }
            }
            RequestKind::HoldSeat => {
                let Some(body) = rq.read_seat() else {
                    return rq.respond_with_err("malformed seat payload");
                };
                if let Some(token) = rq.queue_token() {
                    let _ = self.gate.touch_active(token, rq.user());
                }
                let outcome = self
                    .reservations
                    .state_of(body.reservation_id, rq.user())
                    .and_then(|state| {
                        if !state.allows_seat_holds() {
                            return Err(Rejection::InvalidReservationState);
                        }
                        self.seats.hold(body.seat_id, body.reservation_id)
                    });
                match outcome {
                    Ok(hold) => rq.respond_with_hold(hold),
                    Err(rejection) => rq.respond_with_rejection(rejection),
                }
            }
            RequestKind::ReleaseSeat => {
                let Some(body) = rq.read_seat() else {
                    return rq.respond_with_err("malformed seat payload");
                };
                // Ownership check only; release is legal in any state the
                // reservation can still be observed in.
                let outcome = self
                    .reservations
                    .state_of(body.reservation_id, rq.user())
                    .and_then(|_| self.seats.release(body.seat_id, body.reservation_id));
                match outcome {
                    Ok(()) => rq.respond_with_ok(),
                    Err(rejection) => rq.respond_with_rejection(rejection),
                }
            }
            RequestKind::HeldSeats => {
                rq.respond_with_seat_list(&self.seats.held_seats());
            }
        }
    }

    fn shutdown(self) {
        let _ = self.sweeper_shutdown.send(());
        self.sweeper_thread
            .join()
            .expect("sweeper thread panicked");
    }
}

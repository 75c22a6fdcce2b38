//! Seat lock table: per-seat mutual exclusion with expiring holds.
//!
//! This is the point of maximal contention. Adjudication happens under the
//! seat's shard entry lock, so under N concurrent `hold` calls for one
//! seat exactly one caller wins and the rest observe `SeatConflict`; no
//! seat is ever bound to two live holders, even transiently. Among
//! simultaneous callers, the first to take the entry lock wins.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use turnstile_core::{Rejection, SeatHoldView};
use uuid::Uuid;

/// A live claim on one seat
#[derive(Clone, Copy, Debug)]
struct SeatHold {
    reservation: Uuid,
    acquired_at: Instant,
    deadline: Instant,
}

impl SeatHold {
    fn live(&self, now: Instant) -> bool {
        now < self.deadline
    }
}

/// The seat -> hold table
pub struct SeatLockTable {
    holds: DashMap<u32, SeatHold>,
    /// Valid seat ids are `1..=seat_count`
    seat_count: u32,
    ttl: Duration,
}

impl SeatLockTable {
    /// Create a table for `seat_count` seats with the given hold TTL
    pub fn new(seat_count: u32, ttl: Duration) -> Self {
        Self {
            holds: DashMap::new(),
            seat_count,
            ttl,
        }
    }

    /// Try to claim `seat` for `reservation`
    ///
    /// An expired hold counts as absent: the seat is re-acquirable without
    /// waiting for the sweep.
    pub fn hold(&self, seat: u32, reservation: Uuid) -> Result<SeatHoldView, Rejection> {
        if seat == 0 || seat > self.seat_count {
            return Err(Rejection::NotFound);
        }
        let now = Instant::now();
        let hold = SeatHold {
            reservation,
            acquired_at: now,
            deadline: now + self.ttl,
        };
        match self.holds.entry(seat) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().live(now) {
                    return Err(Rejection::SeatConflict);
                }
                // The previous hold lapsed; the seat is free again.
                occupied.insert(hold);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(hold);
            }
        }
        tracing::debug!(seat, reservation = %reservation, "seat held");
        Ok(SeatHoldView {
            seat_id: seat,
            expires_in_ms: self.ttl.as_millis() as u64,
        })
    }

    /// Release `seat`, provided `reservation` is its current live holder
    pub fn release(&self, seat: u32, reservation: Uuid) -> Result<(), Rejection> {
        if seat == 0 || seat > self.seat_count {
            return Err(Rejection::NotFound);
        }
        let now = Instant::now();
        match self.holds.entry(seat) {
            Entry::Occupied(occupied)
                if occupied.get().live(now) && occupied.get().reservation == reservation =>
            {
                occupied.remove();
                tracing::debug!(seat, reservation = %reservation, "seat released");
                Ok(())
            }
            _ => Err(Rejection::NotHolder),
        }
    }

    /// Give every live hold owned by `reservation` a fresh deadline
    pub fn refresh_all(&self, reservation: Uuid) {
        let now = Instant::now();
        for mut hold in self.holds.iter_mut() {
            if hold.reservation == reservation && hold.live(now) {
                hold.deadline = now + self.ttl;
            }
        }
    }

    /// Drop every hold owned by `reservation`
    pub fn release_all(&self, reservation: Uuid) {
        self.holds.retain(|_, hold| hold.reservation != reservation);
    }

    /// Seats with a live hold right now, ascending
    pub fn held_seats(&self) -> Vec<u32> {
        let now = Instant::now();
        let mut seats: Vec<u32> = self
            .holds
            .iter()
            .filter(|hold| hold.value().live(now))
            .map(|hold| *hold.key())
            .collect();
        seats.sort_unstable();
        seats
    }

    /// Drop lapsed holds
    pub fn sweep(&self, now: Instant) {
        self.holds.retain(|seat, hold| {
            let live = hold.live(now);
            if !live {
                tracing::debug!(
                    seat = *seat,
                    held_ms = now.duration_since(hold.acquired_at).as_millis() as u64,
                    "seat hold lapsed"
                );
            }
            live
        });
    }
}

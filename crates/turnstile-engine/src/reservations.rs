//! Reservation lifecycle with optimistic version checks.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use turnstile_core::{Rejection, ReservationState, ReservationView};
use uuid::Uuid;

/// A reservation record
#[derive(Clone, Copy, Debug)]
struct Reservation {
    user: Uuid,
    state: ReservationState,
    /// Bumped exactly once per accepted transition
    version: u64,
    created_at: Instant,
    /// Inactivity deadline, refreshed on each accepted transition
    deadline: Instant,
}

/// The book of all reservations, keyed by id
///
/// A transition's version check and write happen under the record's shard
/// write lock, so concurrent transitions on one id serialize while
/// distinct ids stay independent. No lock is ever held across a caller's
/// round trip; stale writers get `VersionConflict` instead.
pub struct ReservationBook {
    reservations: DashMap<Uuid, Reservation>,
    ttl: Duration,
}

impl ReservationBook {
    /// Create an empty book with the given inactivity TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            reservations: DashMap::new(),
            ttl,
        }
    }

    /// Create a fresh reservation for `user`
    pub fn create(&self, user: Uuid) -> ReservationView {
        let id = Uuid::new_v4();
        let now = Instant::now();
        let reservation = Reservation {
            user,
            state: ReservationState::Created,
            version: 0,
            created_at: now,
            deadline: now + self.ttl,
        };
        self.reservations.insert(id, reservation);
        tracing::debug!(reservation = %id, "reservation created");
        ReservationView {
            id,
            state: reservation.state,
            version: reservation.version,
        }
    }

    /// Current state of `id` as of this call, for the given owner
    ///
    /// An overdue reservation is expired on the spot; the caller never
    /// observes a stale CREATED/PAYING. Foreign reservations read as
    /// `NotFound`.
    pub fn state_of(&self, id: Uuid, user: Uuid) -> Result<ReservationState, Rejection> {
        let mut entry = self.reservations.get_mut(&id).ok_or(Rejection::NotFound)?;
        if entry.user != user {
            return Err(Rejection::NotFound);
        }
        expire_if_overdue(&mut entry, Instant::now());
        Ok(entry.state)
    }

    /// Attempt a state transition with an optimistic version check
    ///
    /// Succeeds only when `expected_version` matches the stored version
    /// and `target` is a legal successor. A mismatch never mutates; the
    /// caller is expected to re-read and retry or abandon.
    pub fn transition(
        &self,
        id: Uuid,
        user: Uuid,
        expected_version: u64,
        target: ReservationState,
    ) -> Result<ReservationView, Rejection> {
        let mut entry = self.reservations.get_mut(&id).ok_or(Rejection::NotFound)?;
        if entry.user != user {
            return Err(Rejection::NotFound);
        }
        let now = Instant::now();
        expire_if_overdue(&mut entry, now);
        if entry.version != expected_version {
            tracing::debug!(
                reservation = %id,
                expected = expected_version,
                stored = entry.version,
                "reservation version conflict"
            );
            return Err(Rejection::VersionConflict);
        }
        if !entry.state.can_transition_to(target) {
            return Err(Rejection::InvalidTransition);
        }
        entry.state = target;
        entry.version += 1;
        entry.deadline = now + self.ttl;
        tracing::debug!(reservation = %id, state = ?target, version = entry.version, "reservation transitioned");
        Ok(ReservationView {
            id,
            state: entry.state,
            version: entry.version,
        })
    }

    /// Expire overdue reservations and drop records that have lingered in
    /// a terminal state for a full TTL
    ///
    /// Returns the ids whose seat holds must be released. Ids already in
    /// EXPIRED state are reported again until their record is dropped, so
    /// holds of lazily-expired reservations get collected too.
    pub fn sweep(&self, now: Instant) -> Vec<Uuid> {
        let mut release = Vec::new();
        self.reservations.retain(|id, reservation| {
            if expire_if_overdue(reservation, now) {
                tracing::debug!(
                    reservation = %id,
                    age_ms = now.duration_since(reservation.created_at).as_millis() as u64,
                    "reservation expired"
                );
            }
            if reservation.state == ReservationState::Expired {
                release.push(*id);
            }
            // Terminal records linger so late polls still observe the final
            // state, then disappear.
            !(reservation.state.is_terminal() && now > reservation.deadline + self.ttl)
        });
        release
    }
}

/// Apply the system-driven EXPIRED transition when the deadline has passed
fn expire_if_overdue(reservation: &mut Reservation, now: Instant) -> bool {
    if !reservation.state.is_terminal() && now > reservation.deadline {
        reservation.state = ReservationState::Expired;
        reservation.version += 1;
        true
    } else {
        false
    }
}

use thiserror::Error;

/// Outcomes that reject a request without being server faults
///
/// Conflicts are expected, frequent results under load. They are plain
/// values handed back to the caller; the engine never retries on its own.
/// Repeating the same call with the same stale input yields the same
/// rejection until the underlying state changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    /// The caller's queue entry is not ACTIVE (or no queue token was sent)
    #[error("queue admission required")]
    NotAdmitted,
    /// Unknown or expired queue token, reservation or seat
    #[error("not found")]
    NotFound,
    /// The presented `expectedVersion` no longer matches the reservation
    #[error("reservation version conflict")]
    VersionConflict,
    /// The seat already has a live hold
    #[error("seat already held")]
    SeatConflict,
    /// The target state is not a legal successor of the current state
    #[error("illegal state transition")]
    InvalidTransition,
    /// The reservation's state does not allow holding seats
    #[error("reservation state does not allow this operation")]
    InvalidReservationState,
    /// The caller's reservation does not hold this seat
    #[error("seat is held by another reservation")]
    NotHolder,
    /// Missing or invalid bearer credential
    #[error("invalid credentials")]
    Unauthorized,
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a queue entry
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    /// Enqueued, not yet admitted
    Waiting,
    /// Admitted; ticketing calls are allowed
    Active,
    /// Lapsed; later calls with this token see `NotFound`
    Expired,
}

/// Lifecycle state of a reservation
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationState {
    /// Freshly created, no payment started
    Created,
    /// The owner is entering payment details
    Paying,
    /// Payment completed; terminal
    Confirmed,
    /// Lapsed on the inactivity deadline; terminal
    Expired,
    /// Abandoned by the owner; terminal
    Cancelled,
}

impl ReservationState {
    /// Whether no further transition may leave this state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Expired | Self::Cancelled)
    }

    /// Whether `target` is a legal successor of this state
    pub fn can_transition_to(self, target: Self) -> bool {
        match self {
            Self::Created => matches!(target, Self::Paying | Self::Cancelled | Self::Expired),
            Self::Paying => {
                matches!(target, Self::Confirmed | Self::Cancelled | Self::Expired)
            }
            Self::Confirmed | Self::Expired | Self::Cancelled => false,
        }
    }

    /// Whether a reservation in this state may acquire or keep seat holds
    pub fn allows_seat_holds(self) -> bool {
        matches!(self, Self::Created | Self::Paying)
    }
}

/// Queue entry as reported to the caller
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct QueueEntryView {
    /// Opaque queue token identifying the entry
    pub token: Uuid,
    /// Current status
    pub status: QueueStatus,
    /// 1-based place in line for WAITING entries, 0 once ACTIVE
    pub position: u64,
}

/// Reservation as reported to the caller
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ReservationView {
    /// Reservation id
    pub id: Uuid,
    /// Current lifecycle state
    pub state: ReservationState,
    /// Version to present on the next transition
    pub version: u64,
}

/// Seat hold as reported to the caller
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatHoldView {
    /// Seat that was claimed
    pub seat_id: u32,
    /// Milliseconds until the hold lapses
    pub expires_in_ms: u64,
}

/// Payload of a reservation state-change request
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    /// Requested target state
    pub state: ReservationState,
    /// Version the caller last observed
    pub expected_version: u64,
}

/// Payload of a seat hold/release request
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatRequest {
    /// Seat to claim or release
    pub seat_id: u32,
    /// Reservation acting as the holder
    pub reservation_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_no_successors() {
        use ReservationState::*;
        for terminal in [Confirmed, Expired, Cancelled] {
            for target in [Created, Paying, Confirmed, Expired, Cancelled] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn legal_transitions() {
        use ReservationState::*;
        assert!(Created.can_transition_to(Paying));
        assert!(Created.can_transition_to(Cancelled));
        assert!(Paying.can_transition_to(Confirmed));
        assert!(Paying.can_transition_to(Cancelled));
        assert!(!Created.can_transition_to(Confirmed));
        assert!(!Paying.can_transition_to(Created));
        assert!(!Created.can_transition_to(Created));
    }

    #[test]
    fn wire_names_are_screaming_snake_case() {
        let body = r#"{"state":"PAYING","expectedVersion":0}"#;
        let parsed: TransitionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.state, ReservationState::Paying);
        assert_eq!(parsed.expected_version, 0);
        assert_eq!(
            serde_json::to_string(&QueueStatus::Waiting).unwrap(),
            "\"WAITING\""
        );
    }
}

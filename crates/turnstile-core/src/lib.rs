//! Shared infrastructure of the waiting-room ticketing system: request
//! plumbing, domain model and the rejection taxonomy.
#![warn(missing_docs)]

mod error;
mod model;
mod request;

pub use error::Rejection;
pub use model::{
    QueueEntryView, QueueStatus, ReservationState, ReservationView, SeatHoldView, SeatRequest,
    TransitionRequest,
};
pub use request::{RawRequest, Request, RequestHandler, RequestKind, RequestMethod};

/// Configuration of the admission gate and reservation engine
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Number of sellable seats; seat ids are `1..=seats`
    pub seats: u32,
    /// Maximum number of concurrently ACTIVE queue entries
    pub active_capacity: u32,
    /// Milliseconds an ACTIVE entry may stay idle before it expires
    pub active_ttl_ms: u64,
    /// Milliseconds a WAITING entry may wait before it is dropped
    pub waiting_ttl_ms: u64,
    /// Milliseconds of inactivity after which a reservation expires
    pub reservation_ttl_ms: u64,
    /// Milliseconds before a seat hold lapses
    pub hold_ttl_ms: u64,
    /// Milliseconds between expiry/promotion sweeps
    pub sweep_interval_ms: u64,
}

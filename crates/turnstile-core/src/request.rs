use std::io;

use uuid::Uuid;

use crate::error::Rejection;
use crate::model::{
    QueueEntryView, ReservationView, SeatHoldView, SeatRequest, TransitionRequest,
};

/// Kind of the request
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum RequestKind {
    /// Enter the waiting room (idempotent per user)
    EnterQueue,
    /// Poll a queue token for status and position
    QueueStatus,
    /// Give up a queue entry, freeing its slot
    LeaveQueue,
    /// Create a reservation; requires an ACTIVE queue token
    CreateReservation,
    /// Advance a reservation's state with an optimistic version check
    TransitionReservation,
    /// Claim a seat for a reservation
    HoldSeat,
    /// Release a previously claimed seat
    ReleaseSeat,
    /// List seats with a live hold
    HeldSeats,
}

/// HTTP request method
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum RequestMethod {
    /// GET request
    Get,
    /// POST request, may have a payload
    Post,
    /// PUT request, may have a payload
    Put,
}

/// An authenticated request on its way into the engine
///
/// The transport has already resolved the bearer credential to a user id;
/// the engine never sees raw credentials.
pub struct Request {
    kind: RequestKind,
    user: Uuid,
    queue_token: Option<Uuid>,
    reservation: Option<Uuid>,
    raw: Box<dyn RawRequest + Send>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("user", &self.user)
            .field("queue_token", &self.queue_token)
            .field("reservation", &self.reservation)
            .field("raw", &format_args!(".."))
            .finish()
    }
}

/// Interface for handling requests from the transport
///
/// The front desk implements this trait.
pub trait RequestHandler {
    /// Handle a request
    ///
    /// This method may be called concurrently from different threads.
    fn handle(&self, request: Request);

    /// Shut the system down
    ///
    /// Waits for all threads spawned by the engine (e.g. the sweeper) to
    /// have terminated.
    fn shutdown(self);
}

/// A raw request, implemented by the transport
///
/// The typed `respond_with_*` methods keep the engine free of any wire
/// encoding; status codes and serialization live with the implementor.
pub trait RawRequest {
    /// Get the URL
    fn url(&self) -> &str;
    /// Get the request method
    fn method(&self) -> RequestMethod;

    /// Read the request body as bytes
    fn read_bytes(&mut self) -> io::Result<Vec<u8>>;
    /// Read the request body as string
    fn read_string(&mut self) -> io::Result<String>;

    /// Respond with a queue entry snapshot
    fn respond_with_entry(self: Box<Self>, entry: QueueEntryView);
    /// Respond with a reservation snapshot; `created` marks a fresh record
    fn respond_with_reservation(self: Box<Self>, created: bool, reservation: ReservationView);
    /// Respond with a granted seat hold
    fn respond_with_hold(self: Box<Self>, hold: SeatHoldView);
    /// Respond with the list of currently held seats
    fn respond_with_seat_list(self: Box<Self>, seats: &[u32]);
    /// Respond with a bare success
    fn respond_with_ok(self: Box<Self>);
    /// Respond with a rejection from the taxonomy
    fn respond_with_rejection(self: Box<Self>, rejection: Rejection);
    /// Respond with an error message for a malformed request
    fn respond_with_err(self: Box<Self>, err: String);
}

impl Request {
    /// Get the request's kind
    #[inline]
    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    /// Get the authenticated user's id
    #[inline]
    pub fn user(&self) -> Uuid {
        self.user
    }

    /// Get the queue token header, if present
    #[inline]
    pub fn queue_token(&self) -> Option<Uuid> {
        self.queue_token
    }

    /// Get the reservation id addressed by the URL, if present
    #[inline]
    pub fn reservation(&self) -> Option<Uuid> {
        self.reservation
    }

    /// Get the request URL
    #[inline]
    #[allow(unused)]
    pub fn url(&self) -> &str {
        self.raw.url()
    }

    /// Get the request method
    #[inline]
    #[allow(unused)]
    pub fn method(&self) -> RequestMethod {
        self.raw.method()
    }

    /// Parse the payload of a state-change request
    ///
    /// This method has side effects and should be called only once per
    /// request.
    #[inline]
    pub fn read_transition(&mut self) -> Option<TransitionRequest> {
        let body = self.raw.read_string().ok()?;
        serde_json::from_str(&body).ok()
    }

    /// Parse the payload of a seat hold/release request
    ///
    /// This method has side effects and should be called only once per
    /// request.
    #[inline]
    pub fn read_seat(&mut self) -> Option<SeatRequest> {
        let body = self.raw.read_string().ok()?;
        serde_json::from_str(&body).ok()
    }

    /// Respond with a queue entry snapshot
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_entry(self, entry: QueueEntryView) {
        self.raw.respond_with_entry(entry);
    }

    /// Respond with a reservation snapshot
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_reservation(self, created: bool, reservation: ReservationView) {
        self.raw.respond_with_reservation(created, reservation);
    }

    /// Respond with a granted seat hold
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_hold(self, hold: SeatHoldView) {
        self.raw.respond_with_hold(hold);
    }

    /// Respond with the list of currently held seats
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_seat_list(self, seats: &[u32]) {
        self.raw.respond_with_seat_list(seats);
    }

    /// Respond with a bare success
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_ok(self) {
        self.raw.respond_with_ok();
    }

    /// Respond with a rejection from the taxonomy
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_rejection(self, rejection: Rejection) {
        self.raw.respond_with_rejection(rejection);
    }

    /// Respond with an error indicating a malformed request
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_err(self, err: impl Into<String>) {
        self.raw.respond_with_err(err.into());
    }

    /// Create a new request from a [`RawRequest`]
    #[inline]
    pub fn from_raw(
        kind: RequestKind,
        user: Uuid,
        queue_token: Option<Uuid>,
        reservation: Option<Uuid>,
        raw: Box<dyn RawRequest + Send>,
    ) -> Self {
        Self {
            kind,
            user,
            queue_token,
            reservation,
            raw,
        }
    }
}

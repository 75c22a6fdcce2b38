use std::sync::Arc;

use eyre::Result;
use flume::Sender;
use nanorand::Rng;
use tokio::sync::oneshot;
use turnstile_core::{
    QueueEntryView, Rejection, RequestKind, ReservationState, ReservationView, SeatHoldView,
    SeatRequest, TransitionRequest,
};
use uuid::Uuid;

pub mod mock;

/// Outcome of a single API call: a payload or a rejection, exactly as the
/// engine reported it
pub type ApiResult<T> = std::result::Result<T, Rejection>;

#[derive(Debug)]
enum Response {
    Entry(QueueEntryView),
    Reservation {
        #[allow(unused)]
        created: bool,
        view: ReservationView,
    },
    Hold(SeatHoldView),
    Seats(Vec<u32>),
    Ok,
    Rejected(Rejection),
    BadRequest(String),
}

impl Response {
    fn into_entry(self, kind: RequestKind) -> ApiResult<QueueEntryView> {
        match self {
            Response::Entry(view) => Ok(view),
            Response::Rejected(rejection) => Err(rejection),
            resp => panic!("{kind:?} must not be answered by {resp:?}"),
        }
    }

    fn into_reservation(self, kind: RequestKind) -> ApiResult<ReservationView> {
        match self {
            Response::Reservation { view, .. } => Ok(view),
            Response::Rejected(rejection) => Err(rejection),
            resp => panic!("{kind:?} must not be answered by {resp:?}"),
        }
    }

    fn into_hold(self, kind: RequestKind) -> ApiResult<SeatHoldView> {
        match self {
            Response::Hold(hold) => Ok(hold),
            Response::Rejected(rejection) => Err(rejection),
            resp => panic!("{kind:?} must not be answered by {resp:?}"),
        }
    }

    fn into_unit(self, kind: RequestKind) -> ApiResult<()> {
        match self {
            Response::Ok => Ok(()),
            Response::Rejected(rejection) => Err(rejection),
            resp => panic!("{kind:?} must not be answered by {resp:?}"),
        }
    }
}

struct RequestMsg {
    kind: RequestKind,
    user: Uuid,
    queue_token: Option<Uuid>,
    reservation: Option<Uuid>,
    body: Option<String>,
    response_channel: oneshot::Sender<Response>,
}

/// Client side of the in-process transport
pub struct Api {
    /// One channel per handler thread
    channels: Arc<Vec<Sender<RequestMsg>>>,

    my_channel: Sender<RequestMsg>,
    my_index: usize,
}

impl Api {
    fn new(channels: Vec<Sender<RequestMsg>>) -> Self {
        let my_channel = channels[0].clone();
        Self {
            channels: Arc::new(channels),
            my_channel,
            my_index: 0,
        }
    }
}

impl Clone for Api {
    fn clone(&self) -> Self {
        let my_index = (self.my_index + 1) % self.channels.len();
        Self {
            channels: self.channels.clone(),
            my_channel: self.channels[my_index].clone(),
            my_index,
        }
    }
}

impl Api {
    async fn make_request(
        &self,
        kind: RequestKind,
        user: Uuid,
        queue_token: Option<Uuid>,
        reservation: Option<Uuid>,
        body: Option<String>,
    ) -> Result<Response> {
        let (sender, receiver) = oneshot::channel();
        let msg = RequestMsg {
            kind,
            user,
            queue_token,
            reservation,
            body,
            response_channel: sender,
        };
        self.my_channel.send_async(msg).await?;
        Ok(receiver.await?)
    }

    /// Enter the waiting room as `user`
    pub async fn enter_queue(&self, user: Uuid) -> Result<ApiResult<QueueEntryView>> {
        let kind = RequestKind::EnterQueue;
        let response = self.make_request(kind, user, None, None, None).await?;
        Ok(response.into_entry(kind))
    }

    /// Poll a queue token
    pub async fn queue_status(&self, user: Uuid, token: Uuid) -> Result<ApiResult<QueueEntryView>> {
        let kind = RequestKind::QueueStatus;
        let response = self.make_request(kind, user, Some(token), None, None).await?;
        Ok(response.into_entry(kind))
    }

    /// Give a queue entry up
    pub async fn leave_queue(&self, user: Uuid, token: Uuid) -> Result<ApiResult<()>> {
        let kind = RequestKind::LeaveQueue;
        let response = self.make_request(kind, user, Some(token), None, None).await?;
        Ok(response.into_unit(kind))
    }

    /// Create a reservation, presenting `queue_token` for admission
    pub async fn create_reservation(
        &self,
        user: Uuid,
        queue_token: Option<Uuid>,
    ) -> Result<ApiResult<ReservationView>> {
        let kind = RequestKind::CreateReservation;
        let response = self
            .make_request(kind, user, queue_token, None, None)
            .await?;
        Ok(response.into_reservation(kind))
    }

    /// Request a reservation state change with an optimistic version check
    pub async fn transition_reservation(
        &self,
        user: Uuid,
        reservation: Uuid,
        state: ReservationState,
        expected_version: u64,
    ) -> Result<ApiResult<ReservationView>> {
        let kind = RequestKind::TransitionReservation;
        let body = serde_json::to_string(&TransitionRequest {
            state,
            expected_version,
        })?;
        let response = self
            .make_request(kind, user, None, Some(reservation), Some(body))
            .await?;
        Ok(response.into_reservation(kind))
    }

    /// Try to claim a seat for a reservation
    pub async fn hold_seat(
        &self,
        user: Uuid,
        reservation: Uuid,
        seat: u32,
    ) -> Result<ApiResult<SeatHoldView>> {
        let kind = RequestKind::HoldSeat;
        let body = serde_json::to_string(&SeatRequest {
            seat_id: seat,
            reservation_id: reservation,
        })?;
        let response = self.make_request(kind, user, None, None, Some(body)).await?;
        Ok(response.into_hold(kind))
    }

    /// Release a previously claimed seat
    pub async fn release_seat(
        &self,
        user: Uuid,
        reservation: Uuid,
        seat: u32,
    ) -> Result<ApiResult<()>> {
        let kind = RequestKind::ReleaseSeat;
        let body = serde_json::to_string(&SeatRequest {
            seat_id: seat,
            reservation_id: reservation,
        })?;
        let response = self.make_request(kind, user, None, None, Some(body)).await?;
        Ok(response.into_unit(kind))
    }

    /// Seats with a live hold right now
    pub async fn held_seats(&self, user: Uuid) -> Result<Vec<u32>> {
        let kind = RequestKind::HeldSeats;
        match self.make_request(kind, user, None, None, None).await? {
            Response::Seats(seats) => Ok(seats),
            resp => panic!("{kind:?} must not be answered by {resp:?}"),
        }
    }

    /// Create a session for a fresh, randomly generated user
    pub fn create_user_session(&self) -> UserSession {
        let mut bytes = [0u8; 16];
        nanorand::tls_rng().fill(&mut bytes);
        UserSession {
            api: self,
            user: uuid::Builder::from_random_bytes(bytes).into_uuid(),
            queue_token: None,
            reservation: None,
        }
    }
}

/// One user's view of the system: their queue token and latest reservation
pub struct UserSession<'a> {
    pub api: &'a Api,
    pub user: Uuid,
    pub queue_token: Option<Uuid>,
    pub reservation: Option<ReservationView>,
}

impl UserSession<'_> {
    /// Enter the waiting room, remembering the queue token
    pub async fn enter_queue(&mut self) -> Result<QueueEntryView> {
        let entry = self
            .api
            .enter_queue(self.user)
            .await?
            .expect("entering the queue must always succeed");
        self.queue_token = Some(entry.token);
        Ok(entry)
    }

    /// Poll the remembered queue token
    pub async fn queue_status(&self) -> Result<ApiResult<QueueEntryView>> {
        let token = self.queue_token.expect("no queue token; call enter_queue first");
        self.api.queue_status(self.user, token).await
    }

    /// Create a reservation with the remembered queue token
    pub async fn create_reservation(&mut self) -> Result<ApiResult<ReservationView>> {
        let result = self
            .api
            .create_reservation(self.user, self.queue_token)
            .await?;
        if let Ok(view) = &result {
            self.reservation = Some(*view);
        }
        Ok(result)
    }

    /// Transition the remembered reservation using its last observed version
    pub async fn transition(&mut self, state: ReservationState) -> Result<ApiResult<ReservationView>> {
        let current = self.reservation.expect("no reservation; call create_reservation first");
        let result = self
            .api
            .transition_reservation(self.user, current.id, state, current.version)
            .await?;
        if let Ok(view) = &result {
            self.reservation = Some(*view);
        }
        Ok(result)
    }

    /// Try to claim a seat for the remembered reservation
    pub async fn hold_seat(&self, seat: u32) -> Result<ApiResult<SeatHoldView>> {
        let current = self.reservation.expect("no reservation; call create_reservation first");
        self.api.hold_seat(self.user, current.id, seat).await
    }

    /// Release a seat held by the remembered reservation
    pub async fn release_seat(&self, seat: u32) -> Result<ApiResult<()>> {
        let current = self.reservation.expect("no reservation; call create_reservation first");
        self.api.release_seat(self.user, current.id, seat).await
    }
}

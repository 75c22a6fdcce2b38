//! Mock transport driving the `turnstile-engine` crate directly

use std::sync::Arc;

use tokio::task::{self, JoinHandle};
use turnstile_core::{
    QueueEntryView, RawRequest, Rejection, Request, RequestHandler, RequestKind, ReservationView,
    SeatHoldView,
};

use super::{Api, RequestMsg, Response};

pub struct MockFrontdesk {
    frontdesk: Arc<turnstile_engine::Frontdesk>,
    join_handles: Vec<JoinHandle<()>>,
}

struct MockRawRequest {
    kind: RequestKind,
    body: Option<String>,
    response_channel: tokio::sync::oneshot::Sender<Response>,
}

pub async fn start(threads: u16, config: turnstile_core::Config) -> (MockFrontdesk, Api) {
    let frontdesk = Arc::new(
        tokio::task::spawn_blocking(move || turnstile_engine::launch(&config))
            .await
            .unwrap(),
    );

    let it = (0..threads).map(|_| {
        let (sender, receiver) = flume::bounded::<RequestMsg>(65536);
        let frontdesk = frontdesk.clone();
        let handle = task::spawn_blocking(move || {
            let frontdesk = &*frontdesk;
            for msg in receiver.into_iter() {
                let raw = Box::new(MockRawRequest {
                    kind: msg.kind,
                    body: msg.body,
                    response_channel: msg.response_channel,
                });
                frontdesk.handle(Request::from_raw(
                    msg.kind,
                    msg.user,
                    msg.queue_token,
                    msg.reservation,
                    raw,
                ))
            }
        });
        (sender, handle)
    });
    let (senders, join_handles) = it.unzip();

    let mock_frontdesk = MockFrontdesk {
        frontdesk,
        join_handles,
    };
    (mock_frontdesk, Api::new(senders))
}

impl MockFrontdesk {
    pub async fn shutdown(self) {
        for handle in self.join_handles {
            handle.await.unwrap()
        }
        task::spawn_blocking(move || Arc::into_inner(self.frontdesk).unwrap().shutdown())
            .await
            .unwrap();
    }
}

impl RawRequest for MockRawRequest {
    fn url(&self) -> &str {
        use RequestKind::*;
        match self.kind {
            EnterQueue => "/api/queue/enter",
            QueueStatus => "/api/queue/status",
            LeaveQueue => "/api/queue/leave",
            CreateReservation => "/api/ticketing/reservation",
            TransitionReservation => "/api/ticketing/reservation/-/state",
            HoldSeat => "/api/ticketing/seat/hold",
            ReleaseSeat => "/api/ticketing/seat/release",
            HeldSeats => "/api/ticketing/seat/held",
        }
    }

    fn method(&self) -> turnstile_core::RequestMethod {
        use turnstile_core::RequestMethod::*;
        use RequestKind::*;
        match self.kind {
            QueueStatus | HeldSeats => Get,
            TransitionReservation => Put,
            _ => Post,
        }
    }

    fn read_bytes(&mut self) -> std::io::Result<Vec<u8>> {
        Ok(match self.body.take() {
            None => Vec::new(),
            Some(body) => body.into_bytes(),
        })
    }

    fn read_string(&mut self) -> std::io::Result<String> {
        Ok(self.body.take().unwrap_or_default())
    }

    fn respond_with_entry(self: Box<Self>, entry: QueueEntryView) {
        self.response_channel.send(Response::Entry(entry)).unwrap()
    }

    fn respond_with_reservation(self: Box<Self>, created: bool, reservation: ReservationView) {
        self.response_channel
            .send(Response::Reservation {
                created,
                view: reservation,
            })
            .unwrap()
    }

    fn respond_with_hold(self: Box<Self>, hold: SeatHoldView) {
        self.response_channel.send(Response::Hold(hold)).unwrap()
    }

    fn respond_with_seat_list(self: Box<Self>, seats: &[u32]) {
        self.response_channel
            .send(Response::Seats(seats.to_vec()))
            .unwrap()
    }

    fn respond_with_ok(self: Box<Self>) {
        self.response_channel.send(Response::Ok).unwrap()
    }

    fn respond_with_rejection(self: Box<Self>, rejection: Rejection) {
        self.response_channel
            .send(Response::Rejected(rejection))
            .unwrap()
    }

    fn respond_with_err(self: Box<Self>, err: String) {
        self.response_channel
            .send(Response::BadRequest(err))
            .unwrap()
    }
}

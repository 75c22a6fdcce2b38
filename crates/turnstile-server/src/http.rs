//! HTTP request implementation

use std::io;
use std::io::Read;

use tiny_http::{Header, Response};
use turnstile_core::{
    QueueEntryView, RawRequest, Rejection, RequestKind, ReservationView, SeatHoldView,
};
use uuid::Uuid;

use crate::issuer::TokenIssuer;

struct HttpRequest(tiny_http::Request);

/// Status code a rejection maps to on the wire
fn status_of(rejection: Rejection) -> u16 {
    match rejection {
        Rejection::Unauthorized => 401,
        Rejection::NotAdmitted => 403,
        Rejection::NotFound => 404,
        Rejection::VersionConflict | Rejection::SeatConflict => 409,
        Rejection::InvalidTransition
        | Rejection::InvalidReservationState
        | Rejection::NotHolder => 400,
    }
}

impl RawRequest for HttpRequest {
    fn url(&self) -> &str {
        self.0.url()
    }

    fn method(&self) -> turnstile_core::RequestMethod {
        match self.0.method() {
            tiny_http::Method::Get => turnstile_core::RequestMethod::Get,
            tiny_http::Method::Post => turnstile_core::RequestMethod::Post,
            tiny_http::Method::Put => turnstile_core::RequestMethod::Put,
            _ => unreachable!(),
        }
    }

    fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.0.body_length().unwrap_or(0));
        self.0.as_reader().read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn read_string(&mut self) -> io::Result<String> {
        let mut s = String::with_capacity(self.0.body_length().unwrap_or(0));
        self.0.as_reader().read_to_string(&mut s)?;
        Ok(s)
    }

    fn respond_with_entry(self: Box<Self>, entry: QueueEntryView) {
        self.respond_json(200, &entry);
    }

    fn respond_with_reservation(self: Box<Self>, created: bool, reservation: ReservationView) {
        self.respond_json(if created { 201 } else { 200 }, &reservation);
    }

    fn respond_with_hold(self: Box<Self>, hold: SeatHoldView) {
        self.respond_json(200, &hold);
    }

    fn respond_with_seat_list(self: Box<Self>, seats: &[u32]) {
        self.respond_json(200, &serde_json::json!({ "seats": seats }));
    }

    fn respond_with_ok(self: Box<Self>) {
        self.respond_json(200, &serde_json::json!({ "ok": true }));
    }

    fn respond_with_rejection(self: Box<Self>, rejection: Rejection) {
        let status = status_of(rejection);
        self.respond_json(status, &serde_json::json!({ "error": rejection.to_string() }));
    }

    fn respond_with_err(self: Box<Self>, err: String) {
        self.respond_json(400, &serde_json::json!({ "error": err }));
    }
}

impl HttpRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.0
            .headers()
            .iter()
            .find(|header| name.eq_ignore_ascii_case(header.field.as_str().as_str()))
            .map(|header| header.value.as_str())
    }

    /// Serialize `body`, add CORS and content-type headers and send it
    fn respond_json<T: serde::Serialize>(self, status: u16, body: &T) {
        let payload = serde_json::to_string(body).expect("response serialization failed");
        let mut res = Response::from_string(payload).with_status_code(status);
        res.add_header(
            Header::from_bytes(b"Content-Type", b"application/json").unwrap(),
        );
        add_response_cors_headers(&mut res);
        self.0.respond(res).expect("HTTP response failed");
    }
}

/// Parse the given HTTP request into an authenticated [`Request`]
///
/// If [`None`] is returned, the request was already answered with a
/// corresponding error response.
///
/// [`Request`]: turnstile_core::Request
pub fn parse(
    rq: tiny_http::Request,
    issuer: &dyn TokenIssuer,
) -> Option<turnstile_core::Request> {
    use tiny_http::Method::*;

    let url = rq.url().to_owned();
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url.as_str(), None),
    };

    let kind = match (rq.method(), path) {
        (Options, _) => {
            let mut res = Response::empty(204);
            add_response_cors_headers(&mut res);
            rq.respond(res).expect("HTTP response failed");
            return None;
        }
        (Post, "/api/queue/enter") => RequestKind::EnterQueue,
        (Get, "/api/queue/status") => RequestKind::QueueStatus,
        (Post, "/api/queue/leave") => RequestKind::LeaveQueue,
        (Post, "/api/ticketing/reservation") => RequestKind::CreateReservation,
        (Put, path)
            if path.starts_with("/api/ticketing/reservation/") && path.ends_with("/state") =>
        {
            RequestKind::TransitionReservation
        }
        (Post, "/api/ticketing/seat/hold") => RequestKind::HoldSeat,
        (Post, "/api/ticketing/seat/release") => RequestKind::ReleaseSeat,
        (Get, "/api/ticketing/seat/held") => RequestKind::HeldSeats,
        _ => {
            let mut res = Response::from_string(
                "could not find the service you are looking for!

Valid requests are:
  POST /api/queue/enter
  GET  /api/queue/status
  POST /api/queue/leave
  POST /api/ticketing/reservation
  PUT  /api/ticketing/reservation/<id>/state
  POST /api/ticketing/seat/hold
  POST /api/ticketing/seat/release
  GET  /api/ticketing/seat/held",
            )
            .with_status_code(404);
            add_response_cors_headers(&mut res);
            rq.respond(res).expect("HTTP response failed");
            return None;
        }
    };

    let reservation = match kind {
        RequestKind::TransitionReservation => {
            let id = path
                .strip_prefix("/api/ticketing/reservation/")
                .and_then(|rest| rest.strip_suffix("/state"))
                .and_then(|id| Uuid::parse_str(id).ok());
            match id {
                Some(id) => Some(id),
                None => {
                    let raw = HttpRequest(rq);
                    Box::new(raw).respond_with_err("malformed reservation id".into());
                    return None;
                }
            }
        }
        _ => None,
    };

    let raw = HttpRequest(rq);

    // Every endpoint is authenticated; the issuer decides who the caller is.
    let user = raw
        .header("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|bearer| issuer.verify(bearer));
    let Some(user) = user else {
        Box::new(raw).respond_with_rejection(Rejection::Unauthorized);
        return None;
    };

    // The queue token travels in a header, with a query fallback for
    // clients that poll from a plain link.
    let queue_token = raw
        .header("Queue-Token")
        .map(str::to_owned)
        .or_else(|| {
            query.and_then(|query| {
                query
                    .split('&')
                    .find_map(|pair| pair.strip_prefix("token="))
                    .map(str::to_owned)
            })
        })
        .and_then(|token| Uuid::parse_str(token.trim()).ok());

    Some(turnstile_core::Request::from_raw(
        kind,
        user,
        queue_token,
        reservation,
        Box::new(raw),
    ))
}

fn add_response_cors_headers<R: Read>(res: &mut Response<R>) {
    res.add_header(Header::from_bytes(b"Access-Control-Allow-Origin", b"*").unwrap());
    res.add_header(
        Header::from_bytes(b"Access-Control-Allow-Methods", b"GET, POST, PUT, OPTIONS").unwrap(),
    );
    res.add_header(
        Header::from_bytes(b"Access-Control-Allow-Headers", b"Authorization, Queue-Token, Content-Type")
            .unwrap(),
    );
}

//! A response sink backed by hyper.
//!
//! # Responsibilities
//! - Hand the status and headers to hyper once, on commit
//! - Stream body chunks to hyper as they are written
//! - Offer hijack when the request asked for a protocol upgrade
//!
//! # Design Decisions
//! - The body channel holds a single chunk, so `write` blocks while the
//!   client is not reading, the same back-pressure a socket write gives
//! - Dropping the sink without a commit sends `200 OK`, or `500` when the
//!   handler thread is unwinding from a panic
//! - No push: hyper's server does not implement HTTP/2 server push

use std::io;
use std::mem;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Response, StatusCode};
use futures_util::stream;
use hyper::upgrade::OnUpgrade;
use tokio::sync::{mpsc, oneshot};

use crate::http::sink::{Flush, Hijack, HijackError, Hijacked, ResponseSink};

const BODY_CHANNEL_CAPACITY: usize = 1;

type Chunk = Result<Bytes, io::Error>;

/// Status and headers of a committed response.
#[derive(Debug)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Assemble the final response around `body`.
    pub fn into_response(self, body: Body) -> Response<Body> {
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[derive(Debug)]
enum Upgrade {
    /// Request did not ask for an upgrade.
    Unavailable,
    Available(OnUpgrade),
    Taken,
}

/// Sink that feeds a hyper response.
#[derive(Debug)]
pub struct StreamingSink {
    headers: HeaderMap,
    head_tx: Option<oneshot::Sender<ResponseHead>>,
    body_tx: mpsc::Sender<Chunk>,
    upgrade: Upgrade,
}

impl StreamingSink {
    /// Create a sink plus the receiving ends: the head, and the body to return to hyper.
    pub fn new(on_upgrade: Option<OnUpgrade>) -> (Self, oneshot::Receiver<ResponseHead>, Body) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel::<Chunk>(BODY_CHANNEL_CAPACITY);

        let body = Body::from_stream(stream::unfold(body_rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        }));

        let sink = Self {
            headers: HeaderMap::new(),
            head_tx: Some(head_tx),
            body_tx,
            upgrade: match on_upgrade {
                Some(on_upgrade) => Upgrade::Available(on_upgrade),
                None => Upgrade::Unavailable,
            },
        };
        (sink, head_rx, body)
    }

    pub fn is_committed(&self) -> bool {
        self.head_tx.is_none()
    }

    fn commit(&mut self, status: StatusCode) {
        let Some(head_tx) = self.head_tx.take() else {
            tracing::debug!(status = %status, "Status already sent, ignoring");
            return;
        };

        let head = ResponseHead {
            status,
            headers: mem::take(&mut self.headers),
        };
        if head_tx.send(head).is_err() {
            tracing::debug!(status = %status, "Response dropped before head was sent");
        }
    }
}

fn client_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected")
}

impl ResponseSink for StreamingSink {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        self.commit(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.is_committed() {
            self.commit(StatusCode::OK);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        self.body_tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| client_gone())?;
        Ok(buf.len())
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        match self.upgrade {
            Upgrade::Unavailable => None,
            _ => Some(self),
        }
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        Some(self)
    }
}

impl Hijack for StreamingSink {
    fn hijack(&mut self) -> Result<Hijacked, HijackError> {
        match mem::replace(&mut self.upgrade, Upgrade::Taken) {
            Upgrade::Available(on_upgrade) => Ok(Hijacked::from_upgrade(on_upgrade)),
            Upgrade::Taken => Err(HijackError::AlreadyHijacked),
            Upgrade::Unavailable => {
                self.upgrade = Upgrade::Unavailable;
                Err(HijackError::Unsupported {
                    sink: self.sink_name(),
                })
            }
        }
    }
}

impl Flush for StreamingSink {
    /// Chunks go to hyper as they are written; this only reports a vanished client.
    fn flush(&mut self) -> io::Result<()> {
        if self.body_tx.is_closed() {
            return Err(client_gone());
        }
        Ok(())
    }
}

impl Drop for StreamingSink {
    fn drop(&mut self) {
        if self.is_committed() {
            return;
        }
        let status = if std::thread::panicking() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        };
        self.commit(status);
    }
}

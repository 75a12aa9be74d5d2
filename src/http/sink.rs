//! The response-writing contract.
//!
//! A [`ResponseSink`] accepts a status code, a header map and body bytes.
//! Everything beyond that is an optional capability a sink may or may not
//! offer depending on its transport:
//!
//! - [`Hijack`]: take over the raw connection (protocol upgrades)
//! - [`Flush`]: push buffered bytes to the client (streaming, SSE)
//! - [`Push`]: send a secondary resource proactively (HTTP/2 push)
//!
//! Capabilities are discovered at call time through the `hijacker`, `flusher`
//! and `pusher` accessors, which return `None` unless the sink overrides them.

use std::fmt;
use std::future::Future;
use std::io;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

/// The mandatory response-writing interface.
pub trait ResponseSink {
    /// Headers that will be sent when the status is committed.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commit the status line and headers.
    fn set_status(&mut self, status: StatusCode);

    /// Write body bytes, committing `200 OK` first if nothing was committed yet.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        None
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        None
    }

    fn pusher(&mut self) -> Option<&mut dyn Push> {
        None
    }

    /// Name used when reporting a missing capability.
    fn sink_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Connection takeover.
pub trait Hijack {
    fn hijack(&mut self) -> Result<Hijacked, HijackError>;
}

/// Incremental flushing.
pub trait Flush {
    fn flush(&mut self) -> io::Result<()>;
}

/// Server push.
pub trait Push {
    fn push(&mut self, target: &str, opts: &PushOptions) -> Result<(), PushError>;
}

/// A raw bidirectional byte stream.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Connection for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// A taken-over connection.
///
/// Depending on the transport the connection is either available right away
/// or only once the `101 Switching Protocols` head has been written through
/// the sink. [`Hijacked::connection`] covers both.
pub struct Hijacked {
    conn: BoxFuture<'static, io::Result<Box<dyn Connection>>>,
}

impl Hijacked {
    /// A connection that is already usable.
    pub fn ready(conn: impl Connection) -> Self {
        let conn: Box<dyn Connection> = Box::new(conn);
        Self {
            conn: futures_util::future::ready(Ok(conn)).boxed(),
        }
    }

    /// A connection handed over by hyper after the upgrade response is sent.
    ///
    /// Bytes hyper already read past the request head are replayed by the
    /// resulting stream.
    pub fn from_upgrade(on_upgrade: OnUpgrade) -> Self {
        Self::pending(async move {
            let upgraded = on_upgrade.await.map_err(io::Error::other)?;
            Ok::<_, io::Error>(TokioIo::new(upgraded))
        })
    }

    /// A connection produced by a future.
    pub fn pending<F, C>(fut: F) -> Self
    where
        F: Future<Output = io::Result<C>> + Send + 'static,
        C: Connection,
    {
        Self {
            conn: fut.map(|res| res.map(|c| Box::new(c) as Box<dyn Connection>)).boxed(),
        }
    }

    /// Wait for the raw connection.
    pub async fn connection(self) -> io::Result<Box<dyn Connection>> {
        self.conn.await
    }
}

impl fmt::Debug for Hijacked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hijacked").finish_non_exhaustive()
    }
}

/// Errors returned by [`Hijack::hijack`].
#[derive(Debug, Error)]
pub enum HijackError {
    #[error("response sink of type {sink} does not support hijacking")]
    Unsupported { sink: &'static str },

    #[error("connection already hijacked")]
    AlreadyHijacked,

    #[error("hijack failed: {0}")]
    Io(#[from] io::Error),
}

/// Options for [`Push::push`].
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Method of the promised request (GET unless set).
    pub method: Method,

    /// Headers of the promised request.
    pub headers: HeaderMap,
}

/// Errors returned by [`Push::push`].
#[derive(Debug, Error)]
pub enum PushError {
    /// The sink cannot push. Callers usually ignore this.
    #[error("push not supported")]
    NotSupported,

    #[error("push of {target} rejected: {reason}")]
    Rejected { target: String, reason: String },
}

impl PushError {
    pub fn is_not_supported(&self) -> bool {
        matches!(self, PushError::NotSupported)
    }
}

/// Produces a response by writing to a sink.
///
/// Handlers run on a blocking thread, so they may call
/// `tokio::runtime::Handle::current().block_on(..)` and block in `write`.
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, req: Request<Body>, sink: &mut dyn ResponseSink);
}

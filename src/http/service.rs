//! Adapter from sink handlers to `tower::Service`.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use futures_util::future::BoxFuture;
use hyper::upgrade::OnUpgrade;
use tower::Service;

use crate::http::sink::Handler;
use crate::http::streaming::StreamingSink;

/// Runs a [`Handler`] for every request, on a blocking thread.
///
/// The response is returned as soon as the handler commits a status; the body
/// keeps streaming while the handler writes.
pub struct SinkService<H> {
    handler: Arc<H>,
}

impl<H: Handler> SinkService<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl<H> Clone for SinkService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H: Handler> Service<Request<Body>> for SinkService<H> {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let handler = Arc::clone(&self.handler);

        Box::pin(async move {
            let on_upgrade = req.extensions_mut().remove::<OnUpgrade>();
            let (mut sink, head_rx, body) = StreamingSink::new(on_upgrade);

            tokio::task::spawn_blocking(move || {
                handler.serve(req, &mut sink);
            });

            match head_rx.await {
                Ok(head) => Ok(head.into_response(body)),
                Err(_) => {
                    // the handler thread never ran, e.g. the runtime is shutting down
                    tracing::error!("Handler finished without producing a response");
                    Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response())
                }
            }
        })
    }
}

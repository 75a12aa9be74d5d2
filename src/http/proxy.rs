//! Upstream forwarding handler.
//!
//! # Responsibilities
//! - Rewrite the request URI to the configured upstream
//! - Strip hop-by-hop headers in both directions
//! - Copy the upstream response head into the sink and stream the body
//! - Bridge protocol upgrades (WebSocket) by hijacking the client connection once
//!   the upstream has agreed to switch protocols
//! - Bound the wait for the upstream response head
//!
//! # Data Flow
//! ```text
//! Client ──request──▶ ProxyHandler ──request──▶ Upstream
//! Client ◀─head+body── sink ◀──────response──── Upstream
//!
//! Upgrade (upstream answered 101):
//! Client ◀══ raw bytes ══▶ hijacked conn ⇄ upgraded upstream conn ◀══▶ Upstream
//! ```

use std::io;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::uri::{PathAndQuery, Uri};
use axum::http::{Request, Response, StatusCode};
use futures_util::StreamExt;
use hyper::body::Incoming;
use hyper::upgrade::OnUpgrade;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::{TokioExecutor, TokioIo};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::time;

use crate::config::TimeoutConfig;
use crate::http::sink::{Handler, HijackError, Hijacked, ResponseSink};

/// Headers that describe a single hop and are never forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Errors forwarding a request upstream.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("cannot build upstream URI: {0}")]
    Uri(#[from] axum::http::uri::InvalidUriParts),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

impl ProxyError {
    /// Status sent to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Uri(_) | ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Forwards every request to one upstream.
#[derive(Debug, Clone)]
pub struct ProxyHandler {
    client: Client<HttpConnector, Body>,
    upstream: Uri,
    request_timeout: Duration,
}

impl ProxyHandler {
    pub fn new(upstream: Uri, timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            upstream,
            request_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }

    fn upstream_request(&self, req: Request<Body>, upgrade: bool) -> Result<Request<Body>, ProxyError> {
        let (mut parts, body) = req.into_parts();

        let mut uri_parts = self.upstream.clone().into_parts();
        uri_parts.path_and_query = Some(
            parts
                .uri
                .path_and_query()
                .cloned()
                .unwrap_or_else(|| PathAndQuery::from_static("/")),
        );
        parts.uri = Uri::from_parts(uri_parts)?;
        strip_hop_by_hop(&mut parts.headers, upgrade);

        Ok(Request::from_parts(parts, body))
    }

    /// Send upstream and wait for the response head, bounded by the request timeout.
    fn send(&self, rt: &Handle, req: Request<Body>) -> Result<Response<Incoming>, ProxyError> {
        let pending = time::timeout(self.request_timeout, self.client.request(req));
        match rt.block_on(pending) {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProxyError::Timeout(self.request_timeout)),
        }
    }

    /// Hand the client connection over to a bridge with the upgraded upstream.
    fn switch_protocols(&self, rt: &Handle, sink: &mut dyn ResponseSink, mut response: Response<Incoming>, path: &str) {
        let sink_name = sink.sink_name();
        let hijacked = match sink.hijacker() {
            Some(hijacker) => hijacker.hijack(),
            None => Err(HijackError::Unsupported { sink: sink_name }),
        };
        let client = match hijacked {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Cannot take over connection for upgrade");
                return respond_error(sink, StatusCode::NOT_IMPLEMENTED, "Protocol upgrade not supported");
            }
        };

        let upstream = hyper::upgrade::on(&mut response);
        sink.headers_mut().extend(response.headers().clone());
        sink.set_status(response.status());

        tracing::debug!(path = %path, "Bridging upgraded connection");
        rt.spawn(bridge(client, upstream));
    }
}

impl Handler for ProxyHandler {
    fn serve(&self, req: Request<Body>, sink: &mut dyn ResponseSink) {
        let rt = Handle::current();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let upgrade = is_upgrade_request(req.headers());

        let upstream_req = match self.upstream_request(req, upgrade) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Invalid upstream request");
                return respond_error(sink, e.status(), "Upstream request failed");
            }
        };

        tracing::debug!(method = %method, path = %path, upstream = %self.upstream, "Forwarding request");

        let response = match self.send(&rt, upstream_req) {
            Ok(r) => r,
            Err(e @ ProxyError::Timeout(_)) => {
                tracing::warn!(path = %path, error = %e, "Upstream timed out");
                return respond_error(sink, e.status(), "Upstream timed out");
            }
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Upstream error");
                return respond_error(sink, e.status(), "Upstream request failed");
            }
        };

        let status = response.status();
        if upgrade && status == StatusCode::SWITCHING_PROTOCOLS {
            return self.switch_protocols(&rt, sink, response, &path);
        }

        let headers = sink.headers_mut();
        for (name, value) in response.headers() {
            if !is_hop_by_hop(name) {
                headers.append(name.clone(), value.clone());
            }
        }
        sink.set_status(status);

        let mut body = Body::new(response.into_body()).into_data_stream();
        while let Some(chunk) = rt.block_on(body.next()) {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Upstream body error");
                    return;
                }
            };

            let delivered = sink
                .write(&chunk)
                .and_then(|_| match sink.flusher() {
                    Some(flusher) => flusher.flush(),
                    None => Ok(()),
                });
            if let Err(e) = delivered {
                tracing::debug!(path = %path, error = %e, "Client went away");
                return;
            }
        }
    }
}

async fn bridge(client: Hijacked, upstream: OnUpgrade) {
    let result = async {
        let mut client = client.connection().await?;
        let mut upstream = TokioIo::new(upstream.await.map_err(io::Error::other)?);
        tokio::io::copy_bidirectional(&mut client, &mut upstream).await
    }
    .await;

    match result {
        Ok((to_upstream, to_client)) => {
            tracing::debug!(to_upstream, to_client, "Upgraded connection closed")
        }
        Err(e) => tracing::debug!(error = %e, "Upgraded connection failed"),
    }
}

fn respond_error(sink: &mut dyn ResponseSink, status: StatusCode, message: &'static str) {
    sink.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    sink.set_status(status);
    if let Err(e) = sink.write(message.as_bytes()) {
        tracing::debug!(error = %e, "Failed to write error response");
    }
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Remove hop-by-hop headers. Upgrades keep `connection` and `upgrade`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap, upgrade: bool) {
    for name in &HOP_BY_HOP {
        if upgrade && (*name == header::CONNECTION || *name == header::UPGRADE) {
            continue;
        }
        headers.remove(name);
    }
}

/// True if the request asks to switch protocols (`Connection: upgrade` + `Upgrade`).
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    connection_upgrade && headers.contains_key(header::UPGRADE)
}

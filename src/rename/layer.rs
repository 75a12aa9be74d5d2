//! Tower middleware applying a rule set to plain services.
//!
//! For a `tower::Service` the commit point is the moment the inner service
//! yields its `Response`: nothing has reached the wire yet, and the head is
//! written as soon as we hand the response back. The body is left alone.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::rename::rules::RuleSet;

/// Layer that renames response headers of the wrapped service.
#[derive(Debug, Clone)]
pub struct RenameHeadersLayer {
    rules: Arc<RuleSet>,
}

impl RenameHeadersLayer {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }
}

impl<S> Layer<S> for RenameHeadersLayer {
    type Service = RenameHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RenameHeadersService {
            inner,
            rules: Arc::clone(&self.rules),
        }
    }
}

/// Service produced by [`RenameHeadersLayer`].
#[derive(Debug, Clone)]
pub struct RenameHeadersService<S> {
    inner: S,
    rules: Arc<RuleSet>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RenameHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let rules = Arc::clone(&self.rules);
        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.await?;
            let renamed = rules.apply(response.headers_mut());
            tracing::trace!(status = %response.status(), renamed, "Response headers renamed");
            Ok(response)
        })
    }
}

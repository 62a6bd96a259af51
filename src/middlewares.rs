use axum::http::Request;
use std::task::{Context, Poll};
use tower::Service;
use tracing::instrument::Instrumented;
use tracing::Instrument;
use uuid::Uuid;

/// Wraps every request in an `info` span carrying a fresh request id, the
/// method and the path, so handler logs can be correlated.
#[derive(Debug, Clone)]
pub struct RequestLog<S> {
    inner: S,
}

impl<S> RequestLog<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S, B> Service<Request<B>> for RequestLog<S>
where
    S: Service<Request<B>> + Clone,
{
    type Error = S::Error;
    type Future = Instrumented<S::Future>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let span = tracing::info_span!(
            "request",
            id = %Uuid::new_v4(),
            method = %req.method(),
            path = %req.uri().path(),
        );

        span.in_scope(|| tracing::debug!("Request received"));
        self.inner.call(req).instrument(span)
    }
}

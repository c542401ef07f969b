// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Middleware for metrics collection
//!
//! [`instrument`] times every request, reads its size, and labels it with the route
//! template of the handler that served it. The response body is passed through a
//! counting body, and the observation is recorded once that body has been sent or
//! dropped, so the response size is the number of bytes actually produced.
//!
//! Requests to the metrics endpoint itself are not instrumented. A handler of the
//! application mounted at the metrics path is instrumented like any other route.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use crate::exporter::Prometheus;
use crate::metrics::Observation;
use crate::server::MatchedHandler;

/// Middleware to track HTTP request metrics
pub async fn instrument(
    State(prometheus): State<Prometheus>,
    mut request: Request,
    next: Next,
) -> Response {
    if prometheus.is_metrics_request(request.uri().path()) {
        return next.run(request).await;
    }

    let start = Instant::now();

    // Share the slot with any instrumentation further out; only one handler matches.
    let matched = match request.extensions().get::<MatchedHandler>() {
        Some(matched) => matched.clone(),
        None => {
            let matched = MatchedHandler::new();
            request.extensions_mut().insert(matched.clone());
            matched
        }
    };

    let mut pending = PendingObservation {
        prometheus: prometheus.clone(),
        matched,
        start,
        status: None,
        path: None,
        duration: None,
        method: request.method().to_string(),
        host: request_host(&request),
        request_size: request_size(&request),
        response_size: 0,
    };

    // Process the request. If the handler panics, `pending` is dropped while unwinding
    // and still records the request.
    let response = next.run(request).await;

    pending.duration = Some(start.elapsed().as_secs_f64());
    pending.status = Some(response.status());
    pending.path = Some(pending.resolve_path());

    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(CountingBody::new(body, pending)))
}

/// Host the request was addressed to: the `Host` header, else the URI authority
fn request_host(request: &Request) -> String {
    request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().host())
        .unwrap_or_default()
        .to_string()
}

/// Declared request body size, from `Content-Length`; 0 when absent or malformed
fn request_size(request: &Request) -> u64 {
    request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// A request that has started but not been recorded yet. Records itself on drop.
struct PendingObservation {
    prometheus: Prometheus,
    matched: MatchedHandler,
    start: Instant,
    status: Option<StatusCode>,
    path: Option<String>,
    duration: Option<f64>,
    method: String,
    host: String,
    request_size: u64,
    response_size: u64,
}

impl PendingObservation {
    /// Template of the matched handler, or empty if no registered handler was reached
    fn resolve_path(&self) -> String {
        self.matched
            .get()
            .and_then(|identity| self.prometheus.resolve(&identity))
            .unwrap_or_default()
    }

    fn observation(&mut self) -> Observation {
        // No status means no response was produced: the handler panicked or the
        // request was abandoned mid-flight.
        let code = self
            .status
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .as_u16();

        let path = match self.path.take() {
            Some(path) => path,
            None => self.resolve_path(),
        };

        Observation {
            code,
            method: std::mem::take(&mut self.method),
            path,
            host: std::mem::take(&mut self.host),
            duration: self
                .duration
                .unwrap_or_else(|| self.start.elapsed().as_secs_f64()),
            request_size: self.request_size,
            response_size: self.response_size,
        }
    }
}

impl Drop for PendingObservation {
    fn drop(&mut self) {
        let observation = self.observation();
        self.prometheus.metrics().observe(&observation);
    }
}

/// Response body that counts the data bytes passing through it
struct CountingBody {
    inner: Body,
    pending: PendingObservation,
}

impl CountingBody {
    fn new(inner: Body, pending: PendingObservation) -> Self {
        Self { inner, pending }
    }
}

impl HttpBody for CountingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_frame(cx);

        if let Poll::Ready(Some(Ok(frame))) = &poll {
            if let Some(data) = frame.data_ref() {
                this.pending.response_size += data.len() as u64;
            }
        }

        poll
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

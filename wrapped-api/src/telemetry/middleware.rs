//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every request in a server span (continuing any inbound W3C trace),
//! records Prometheus metrics, and logs completion.

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use once_cell::sync::Lazy;
use opentelemetry::{global, Context};
use opentelemetry_http::HeaderExtractor;
use regex::Regex;
use std::time::Instant;
use tracing::{field::Empty, info_span, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::metrics::metrics;

static WALLET_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/v1/wallet/[^/]+").unwrap_or_else(|_| unreachable!("static pattern is valid"))
});

static ACCOUNT_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"G[A-Z2-7]{55}").unwrap_or_else(|_| unreachable!("static pattern is valid"))
});

/// Extract trace context from incoming request headers.
///
/// Looks for W3C traceparent header for distributed tracing.
fn extract_trace_context(headers: &HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

/// Normalize path for metrics/spans.
///
/// Anything in the address position of a wallet route becomes `{address}`,
/// valid or not, so bad input cannot blow up label cardinality.
pub fn normalize_path(path: &str) -> String {
    let result = WALLET_SEGMENT.replace(path, "/v1/wallet/{address}");
    ACCOUNT_KEY.replace_all(&result, "{address}").into_owned()
}

/// Observability middleware for Axum.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let normalized_path = normalize_path(&path);

    let span = info_span!(
        "http_request",
        otel.name = %format!("{} {}", method, normalized_path),
        otel.kind = "server",
        otel.status_code = Empty,
        http.method = %method,
        http.route = %normalized_path,
        http.status_code = Empty,
    );
    let _ = span.set_parent(extract_trace_context(request.headers()));

    let response = next.run(request).instrument(span.clone()).await;

    let duration = start.elapsed();
    let status = response.status();

    if let Some(metrics) = metrics() {
        metrics.record_http_request(
            method.as_str(),
            &normalized_path,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    span.record("http.status_code", status.as_u16());
    if status.is_server_error() {
        span.record("otel.status_code", "ERROR");
    }

    tracing::info!(
        parent: &span,
        method = %method,
        path = %normalized_path,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}

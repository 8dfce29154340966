//! Prometheus Metrics Definitions
//!
//! All wrapped metrics live in one private registry so that test routers and
//! the server never collide on global registration. Exposed at /metrics.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use wrapped_storage::LookupOutcome;

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Warehouse queries are slow; the tail matters more than the head.
const WAREHOUSE_LATENCY_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 15.0, 30.0];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<WrappedMetrics>> = Lazy::new(WrappedMetrics::new);

/// The global metrics, if registration succeeded.
pub fn metrics() -> Option<&'static WrappedMetrics> {
    METRICS.as_ref().ok()
}

fn register_failed(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

/// Container for all wrapped metrics.
#[derive(Clone)]
pub struct WrappedMetrics {
    registry: Registry,

    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Summary lookups by how they resolved - labels: outcome
    pub lookups_total: CounterVec,

    /// BigQuery round-trip time - labels: status
    pub warehouse_query_duration_seconds: HistogramVec,
}

impl WrappedMetrics {
    /// Create all metrics and register them with a fresh registry.
    pub fn new() -> ApiResult<Self> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("wrapped_http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )
        .map_err(|e| register_failed("http_requests_total", e))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "wrapped_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(HTTP_LATENCY_BUCKETS.to_vec()),
            &["method", "path"],
        )
        .map_err(|e| register_failed("http_request_duration_seconds", e))?;

        let lookups_total = CounterVec::new(
            Opts::new("wrapped_lookups_total", "Summary lookups by outcome"),
            &["outcome"],
        )
        .map_err(|e| register_failed("lookups_total", e))?;

        let warehouse_query_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "wrapped_warehouse_query_duration_seconds",
                "Warehouse query duration in seconds",
            )
            .buckets(WAREHOUSE_LATENCY_BUCKETS.to_vec()),
            &["status"],
        )
        .map_err(|e| register_failed("warehouse_query_duration_seconds", e))?;

        registry
            .register(Box::new(http_requests_total.clone()))
            .map_err(|e| register_failed("http_requests_total", e))?;
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .map_err(|e| register_failed("http_request_duration_seconds", e))?;
        registry
            .register(Box::new(lookups_total.clone()))
            .map_err(|e| register_failed("lookups_total", e))?;
        registry
            .register(Box::new(warehouse_query_duration_seconds.clone()))
            .map_err(|e| register_failed("warehouse_query_duration_seconds", e))?;

        #[cfg(target_os = "linux")]
        registry
            .register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))
            .map_err(|e| register_failed("process_collector", e))?;

        // Every outcome shows up at zero before the first lookup.
        for outcome in LookupOutcome::ALL {
            lookups_total.with_label_values(&[outcome.as_str()]);
        }

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            lookups_total,
            warehouse_query_duration_seconds,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record how a summary lookup resolved.
    pub fn record_lookup(&self, outcome: LookupOutcome) {
        self.lookups_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Record one warehouse round trip.
    pub fn record_warehouse_query(&self, status: &str, duration_secs: f64) {
        self.warehouse_query_duration_seconds
            .with_label_values(&[status])
            .observe(duration_secs);
    }

    /// Encode every metric in Prometheus text format.
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    let encoded = match METRICS.as_ref() {
        Ok(metrics) => metrics.encode().map_err(|e| e.to_string()),
        Err(e) => Err(e.message.clone()),
    };

    match encoded {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

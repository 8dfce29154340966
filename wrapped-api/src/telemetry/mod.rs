//! Wrapped Telemetry - Observability Infrastructure
//!
//! Provides OpenTelemetry tracing and Prometheus metrics for the API layer.
//! Works standalone when no OTLP collector is configured.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics, metrics_handler, WrappedMetrics, METRICS};
pub use middleware::{normalize_path, observability_middleware};
pub use tracer::{init_tracer, shutdown_tracer, TelemetryConfig};

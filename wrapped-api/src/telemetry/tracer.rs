//! OpenTelemetry Tracer Initialization
//!
//! Sets up the JSON log subscriber and, when an OTLP endpoint is configured,
//! an HTTP span exporter compatible with any OTLP backend.

use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
    Resource,
};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

const DEFAULT_LOG_FILTER: &str = "wrapped_api=debug,wrapped_storage=debug,tower_http=debug,info";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// OTLP endpoint for traces (e.g., "http://localhost:4318/v1/traces")
    pub otlp_endpoint: Option<String>,
    /// Service name for traces
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (production, staging, development)
    pub environment: String,
    /// Trace sampling ratio (0.0 to 1.0)
    pub trace_sample_rate: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: "wrapped-api".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            trace_sample_rate: 1.0,
        }
    }
}

impl TelemetryConfig {
    /// Environment variables:
    /// - `WRAPPED_OTLP_ENDPOINT` (unset = no export)
    /// - `WRAPPED_SERVICE_NAME` (default: wrapped-api)
    /// - `WRAPPED_SERVICE_VERSION` (default: crate version)
    /// - `WRAPPED_ENVIRONMENT` (default: development)
    /// - `WRAPPED_TRACE_SAMPLE_RATE` (default: 1.0)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            otlp_endpoint: get("WRAPPED_OTLP_ENDPOINT"),
            service_name: get("WRAPPED_SERVICE_NAME").unwrap_or(defaults.service_name),
            service_version: get("WRAPPED_SERVICE_VERSION").unwrap_or(defaults.service_version),
            environment: get("WRAPPED_ENVIRONMENT").unwrap_or(defaults.environment),
            trace_sample_rate: get("WRAPPED_TRACE_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.trace_sample_rate),
        }
    }

    fn sampler(&self) -> Sampler {
        if self.trace_sample_rate >= 1.0 {
            Sampler::AlwaysOn
        } else if self.trace_sample_rate <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.trace_sample_rate)
        }
    }
}

/// Initialize the OpenTelemetry tracer and tracing subscriber.
///
/// Call once at startup, before any tracing occurs. The returned provider must
/// be handed to [`shutdown_tracer`] on exit so pending spans are flushed.
pub fn init_tracer(config: &TelemetryConfig) -> ApiResult<SdkTracerProvider> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attributes([
            KeyValue::new("service.version", config.service_version.clone()),
            KeyValue::new("deployment.environment", config.environment.clone()),
        ])
        .build();

    let builder = SdkTracerProvider::builder()
        .with_sampler(config.sampler())
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource);

    let tracer_provider = match &config.otlp_endpoint {
        Some(endpoint) => {
            let exporter = SpanExporter::builder()
                .with_http()
                .with_endpoint(endpoint)
                .build()
                .map_err(|e| {
                    ApiError::internal_error(format!("Failed to create OTLP exporter: {}", e))
                })?;
            builder.with_batch_exporter(exporter).build()
        }
        // Spans still carry trace ids into the JSON logs.
        None => builder.build(),
    };

    let tracer = tracer_provider.tracer("wrapped-api");
    global::set_tracer_provider(tracer_provider.clone());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(OpenTelemetryLayer::new(tracer))
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        "Telemetry initialized"
    );

    Ok(tracer_provider)
}

/// Flush pending spans and stop the exporter.
pub fn shutdown_tracer(provider: SdkTracerProvider) {
    if let Err(e) = provider.shutdown() {
        tracing::warn!(error = %e, "Tracer shutdown failed");
        return;
    }
    tracing::info!("Tracer shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::from_lookup(|_| None);
        assert_eq!(config.service_name, "wrapped-api");
        assert_eq!(config.environment, "development");
        assert_eq!(config.trace_sample_rate, 1.0);
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_telemetry_config_overrides() {
        let config = TelemetryConfig::from_lookup(|key| match key {
            "WRAPPED_OTLP_ENDPOINT" => Some("http://collector:4318/v1/traces".to_string()),
            "WRAPPED_TRACE_SAMPLE_RATE" => Some("0.25".to_string()),
            "WRAPPED_ENVIRONMENT" => Some("production".to_string()),
            _ => None,
        });
        assert_eq!(
            config.otlp_endpoint.as_deref(),
            Some("http://collector:4318/v1/traces")
        );
        assert_eq!(config.trace_sample_rate, 0.25);
        assert_eq!(config.environment, "production");
    }

    #[test]
    fn test_sampler_selection() {
        let config = TelemetryConfig {
            trace_sample_rate: 2.0,
            ..Default::default()
        };
        assert!(matches!(config.sampler(), Sampler::AlwaysOn));

        let config = TelemetryConfig {
            trace_sample_rate: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.sampler(), Sampler::AlwaysOff));

        let config = TelemetryConfig {
            trace_sample_rate: 0.5,
            ..Default::default()
        };
        assert!(matches!(config.sampler(), Sampler::TraceIdRatioBased(r) if r == 0.5));
    }
}

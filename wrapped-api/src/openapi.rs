//! OpenAPI Specification for the Wallet Summary API
//!
//! Generated by utoipa from the route annotations and schema derives.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{health, wallet};
use crate::routes::health::{HealthDetails, HealthResponse};
use wrapped_core::{AccountId, HealthCheck, HealthStatus, WalletSummary};

/// OpenAPI document for the Wallet Summary API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wallet Summary API",
        version = "0.1.0",
        description = "Per-wallet yearly activity summaries, served from a local store and filled from BigQuery on first request",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Wallet", description = "Activity summary lookups"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        wallet::get_activity_summary,
        health::ping,
        health::liveness,
        health::readiness,
        crate::telemetry::metrics::metrics_handler,
    ),
    components(schemas(
        WalletSummary,
        AccountId,
        ApiError,
        ErrorCode,
        HealthResponse,
        HealthDetails,
        HealthCheck,
        HealthStatus,
    ))
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() -> Result<(), String> {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "Wallet Summary API");

        let tags = openapi
            .tags
            .as_ref()
            .ok_or_else(|| "OpenAPI tags missing".to_string())?;
        assert_eq!(tags.len(), 3);

        let components = openapi
            .components
            .as_ref()
            .ok_or_else(|| "OpenAPI components missing".to_string())?;
        assert!(components.schemas.contains_key("WalletSummary"));
        assert!(components.schemas.contains_key("ApiError"));
        Ok(())
    }

    #[test]
    fn test_openapi_paths_exist() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;
        assert!(paths.contains_key("/v1/wallet/{address}/activity-summary"));
        assert!(paths.contains_key("/health/ready"));
        assert!(paths.contains_key("/metrics"));
    }

    #[test]
    fn test_openapi_json_serialization() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| format!("Failed to serialize OpenAPI: {}", e))?;
        serde_json::from_str::<serde_json::Value>(&json)
            .map_err(|e| format!("Generated JSON invalid: {}", e))?;
        assert!(json.contains("activity-summary"));
        Ok(())
    }
}

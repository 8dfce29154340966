//! API Configuration Module
//!
//! Configuration for the HTTP server, the summary store and the warehouse
//! client. Everything is loaded from environment variables once, in `main`,
//! with defaults suitable for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::SecretString;
use wrapped_core::ConfigError;

/// Read one variable, treating empty values as unset.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP server configuration: bind address and CORS.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind.
    pub bind_host: String,

    /// Port to listen on.
    pub port: u16,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(), // Empty = allow all
            cors_allow_credentials: false,
            cors_max_age_secs: 86400, // 24 hours
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `WRAPPED_API_BIND`: Interface to bind (default: 0.0.0.0)
    /// - `PORT` / `WRAPPED_API_PORT`: Listen port (default: 3000)
    /// - `WRAPPED_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `WRAPPED_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `WRAPPED_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let cors_origins = get("WRAPPED_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = get("WRAPPED_CORS_ALLOW_CREDENTIALS")
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(defaults.cors_allow_credentials);

        let cors_max_age_secs = get("WRAPPED_CORS_MAX_AGE_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let port = get("PORT")
            .or_else(|| get("WRAPPED_API_PORT"))
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        Self {
            bind_host: get("WRAPPED_API_BIND").unwrap_or(defaults.bind_host),
            port,
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
        }
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.bind_host, self.port);
        raw.parse().map_err(|_| ConfigError::InvalidValue {
            field: "WRAPPED_API_BIND".to_string(),
            value: raw,
            reason: "not a valid socket address".to_string(),
        })
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}

// ============================================================================
// STORE CONFIGURATION
// ============================================================================

/// Which summary store backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Lmdb,
    Memory,
}

/// Summary store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Directory holding the LMDB environment.
    pub path: PathBuf,
    /// LMDB map size in megabytes.
    pub max_size_mb: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Lmdb,
            path: PathBuf::from("./data/summaries"),
            max_size_mb: 1024,
        }
    }
}

impl StoreConfig {
    /// Environment variables:
    /// - `WRAPPED_STORE_BACKEND`: `lmdb` or `memory` (default: lmdb)
    /// - `WRAPPED_STORE_PATH`: LMDB directory (default: ./data/summaries)
    /// - `WRAPPED_STORE_MAX_SIZE_MB`: LMDB map size (default: 1024)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let backend = match get("WRAPPED_STORE_BACKEND") {
            None => defaults.backend,
            Some(value) => match value.to_lowercase().as_str() {
                "lmdb" => StoreBackend::Lmdb,
                "memory" => StoreBackend::Memory,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "WRAPPED_STORE_BACKEND".to_string(),
                        value,
                        reason: "expected \"lmdb\" or \"memory\"".to_string(),
                    })
                }
            },
        };

        Ok(Self {
            backend,
            path: get("WRAPPED_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            max_size_mb: get("WRAPPED_STORE_MAX_SIZE_MB")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size_mb),
        })
    }
}

// ============================================================================
// WAREHOUSE CONFIGURATION
// ============================================================================

/// Default table holding one JSON `row_data` per account.
pub const DEFAULT_SUMMARY_TABLE: &str =
    "stellar_wrapped.enriched_user_2024_snapshot_json_partitioned";

/// Default BigQuery REST endpoint.
pub const DEFAULT_BIGQUERY_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

static TABLE_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_\-]+(\.[A-Za-z0-9_\-]+){1,2}$")
        .unwrap_or_else(|_| unreachable!("static pattern is valid"))
});

static PROJECT_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9-]{4,28}[a-z0-9]$")
        .unwrap_or_else(|_| unreachable!("static pattern is valid"))
});

/// BigQuery client configuration.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// GCP project the query job runs in.
    pub project: String,
    /// `dataset.table` or `project.dataset.table`.
    pub table: String,
    /// Job location.
    pub location: String,
    /// Pre-minted OAuth bearer token.
    pub token: SecretString,
    /// REST endpoint base.
    pub endpoint: String,
    /// Time budget for one query.
    pub timeout: Duration,
}

impl WarehouseConfig {
    /// Environment variables:
    /// - `WRAPPED_BIGQUERY_PROJECT` (required)
    /// - `WRAPPED_BIGQUERY_TOKEN` (required)
    /// - `WRAPPED_BIGQUERY_TABLE` (default: stellar_wrapped.enriched_user_2024_snapshot_json_partitioned)
    /// - `WRAPPED_BIGQUERY_LOCATION` (default: US)
    /// - `WRAPPED_BIGQUERY_ENDPOINT` (default: https://bigquery.googleapis.com/bigquery/v2)
    /// - `WRAPPED_BIGQUERY_TIMEOUT_MS` (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |field: &str| {
            get(field).ok_or_else(|| ConfigError::MissingRequired {
                field: field.to_string(),
            })
        };

        let project = required("WRAPPED_BIGQUERY_PROJECT")?;
        validate_project_id(&project)?;
        let token = SecretString::new(required("WRAPPED_BIGQUERY_TOKEN")?.into());
        let table = get("WRAPPED_BIGQUERY_TABLE").unwrap_or_else(|| DEFAULT_SUMMARY_TABLE.to_string());
        validate_table_id(&table)?;

        let timeout_ms = match get("WRAPPED_BIGQUERY_TIMEOUT_MS") {
            None => 10_000,
            Some(raw) => raw.parse::<u64>().ok().filter(|ms| *ms > 0).ok_or_else(|| {
                ConfigError::InvalidValue {
                    field: "WRAPPED_BIGQUERY_TIMEOUT_MS".to_string(),
                    value: raw.clone(),
                    reason: "must be a positive integer".to_string(),
                }
            })?,
        };

        Ok(Self {
            project,
            table,
            location: get("WRAPPED_BIGQUERY_LOCATION").unwrap_or_else(|| "US".to_string()),
            token,
            endpoint: get("WRAPPED_BIGQUERY_ENDPOINT")
                .map(|e| e.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BIGQUERY_ENDPOINT.to_string()),
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Fully qualified table reference for query text.
    pub fn qualified_table(&self) -> String {
        if self.table.matches('.').count() == 2 {
            self.table.clone()
        } else {
            format!("{}.{}", self.project, self.table)
        }
    }
}

/// Table identifiers are the only part of the query text not bound as a parameter.
pub fn validate_table_id(table: &str) -> Result<(), ConfigError> {
    if TABLE_ID_PATTERN.is_match(table) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: "WRAPPED_BIGQUERY_TABLE".to_string(),
            value: table.to_string(),
            reason: "expected dataset.table or project.dataset.table".to_string(),
        })
    }
}

/// The project lands in the request URL and, for two-part tables, in the query text.
pub fn validate_project_id(project: &str) -> Result<(), ConfigError> {
    if PROJECT_ID_PATTERN.is_match(project) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: "WRAPPED_BIGQUERY_PROJECT".to_string(),
            value: project.to_string(),
            reason: "expected a GCP project id (6-30 chars of a-z, 0-9 and -)".to_string(),
        })
    }
}

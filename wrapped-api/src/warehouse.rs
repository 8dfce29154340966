//! BigQuery summary source
//!
//! Runs one synchronous `jobs.query` call per cold lookup. The account is
//! always bound as a named STRING parameter; only the validated table
//! identifier is interpolated into the query text.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wrapped_core::{AccountId, RawSummaryRow, WarehouseError};
use wrapped_storage::SummarySource;

use crate::config::WarehouseConfig;
use crate::telemetry::metrics;

/// Extra client-side slack on top of the server-side query budget.
const CLIENT_TIMEOUT_SLACK: Duration = Duration::from_secs(2);

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    parameter_mode: &'static str,
    query_parameters: Vec<QueryParameter<'a>>,
    timeout_ms: u64,
    location: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryParameter<'a> {
    name: &'static str,
    parameter_type: ParameterType,
    parameter_value: ParameterValue<'a>,
}

#[derive(Debug, Serialize)]
struct ParameterType {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ParameterValue<'a> {
    value: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    rows: Vec<TableRow>,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ============================================================================
// CLIENT
// ============================================================================

/// BigQuery REST client implementing [`SummarySource`].
pub struct BigQueryClient {
    http: Client,
    config: WarehouseConfig,
    query: String,
}

impl BigQueryClient {
    pub fn new(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        let http = Client::builder()
            .timeout(config.timeout + CLIENT_TIMEOUT_SLACK)
            .build()
            .map_err(|e| WarehouseError::QueryFailed {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        let query = summary_query(&config.qualified_table());
        Ok(Self {
            http,
            config,
            query,
        })
    }

    /// The SQL text sent with every lookup.
    pub fn query_text(&self) -> &str {
        &self.query
    }

    fn request_body<'a>(&'a self, account: &'a AccountId) -> QueryRequest<'a> {
        QueryRequest {
            query: &self.query,
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: vec![QueryParameter {
                name: "account",
                parameter_type: ParameterType { kind: "STRING" },
                parameter_value: ParameterValue {
                    value: account.as_str(),
                },
            }],
            timeout_ms: self.config.timeout.as_millis() as u64,
            location: &self.config.location,
        }
    }

    async fn run_query(&self, account: &AccountId) -> Result<RawSummaryRow, WarehouseError> {
        let url = format!(
            "{}/projects/{}/queries",
            self.config.endpoint, self.config.project
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.config.token.expose_secret())
            .json(&self.request_body(account))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            return Err(match status {
                StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                    WarehouseError::Timeout { reason: message }
                }
                _ => WarehouseError::QueryFailed {
                    reason: format!("HTTP {}: {}", status.as_u16(), message),
                },
            });
        }

        let body: QueryResponse = response.json().await.map_err(request_error)?;
        extract_row(body, account)
    }
}

#[async_trait]
impl SummarySource for BigQueryClient {
    async fn fetch_summary(&self, account: &AccountId) -> Result<RawSummaryRow, WarehouseError> {
        let started = Instant::now();
        let result = self.run_query(account).await;

        let status = match &result {
            Ok(_) => "ok",
            Err(WarehouseError::NotFound { .. }) => "not_found",
            Err(WarehouseError::Timeout { .. }) => "timeout",
            Err(_) => "error",
        };
        let elapsed = started.elapsed();
        if let Some(metrics) = metrics() {
            metrics.record_warehouse_query(status, elapsed.as_secs_f64());
        }
        tracing::debug!(
            account = %account,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "warehouse query finished"
        );

        result
    }
}

impl std::fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("endpoint", &self.config.endpoint)
            .field("project", &self.config.project)
            .field("table", &self.config.table)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Point lookup against the account-partitioned summary table.
pub fn summary_query(table: &str) -> String {
    format!(
        "WITH user_row AS (\
         SELECT row_data FROM `{}` \
         WHERE ABS(MOD(FARM_FINGERPRINT(@account), 10)) = hashed_account \
         AND account = @account LIMIT 1) \
         SELECT row_data FROM user_row",
        table
    )
}

fn request_error(e: reqwest::Error) -> WarehouseError {
    if e.is_timeout() {
        WarehouseError::Timeout {
            reason: "Query timed out".to_string(),
        }
    } else {
        WarehouseError::QueryFailed {
            reason: e.to_string(),
        }
    }
}

fn extract_row(body: QueryResponse, account: &AccountId) -> Result<RawSummaryRow, WarehouseError> {
    if !body.job_complete {
        return Err(WarehouseError::Timeout {
            reason: "Query timed out".to_string(),
        });
    }

    let Some(row) = body.rows.into_iter().next() else {
        return Err(WarehouseError::NotFound {
            account: account.to_string(),
        });
    };

    match row.f.into_iter().next().map(|cell| cell.v) {
        // JSON columns arrive as their text encoding.
        Some(Value::String(text)) => RawSummaryRow::from_json_str(&text),
        Some(value @ Value::Object(_)) => RawSummaryRow::try_from(value),
        Some(other) => Err(WarehouseError::InvalidRow {
            reason: format!("row_data is not a JSON object: {}", other),
        }),
        None => Err(WarehouseError::InvalidRow {
            reason: "row has no columns".to_string(),
        }),
    }
}

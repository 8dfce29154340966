//! Wallet Activity Summary Routes
//!
//! The single lookup endpoint. Everything interesting happens in the
//! resolver; this layer validates the address, records the outcome and maps
//! errors to statuses.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use wrapped_core::WalletSummary;
use wrapped_storage::SummaryResolver;

use crate::error::ApiResult;
use crate::extractors::AccountPath;
use crate::state::AppState;
use crate::telemetry::metrics;

/// GET /v1/wallet/{address}/activity-summary
#[utoipa::path(
    get,
    path = "/v1/wallet/{address}/activity-summary",
    tag = "Wallet",
    params(
        ("address" = String, Path, description = "Stellar account address (56 characters, starts with G)")
    ),
    responses(
        (status = 200, description = "Activity summary for the wallet", body = WalletSummary),
        (status = 400, description = "Malformed account address", body = crate::error::ApiError),
        (status = 404, description = "No activity recorded for this wallet", body = crate::error::ApiError),
        (status = 408, description = "Warehouse query timed out", body = crate::error::ApiError),
        (status = 500, description = "Warehouse or store failure", body = crate::error::ApiError),
    ),
)]
pub async fn get_activity_summary(
    State(resolver): State<Arc<SummaryResolver>>,
    AccountPath(account): AccountPath,
) -> ApiResult<Json<WalletSummary>> {
    let resolution = resolver.resolve(&account).await;
    if let Some(metrics) = metrics() {
        metrics.record_lookup(resolution.outcome);
    }
    Ok(Json(resolution.result?))
}

/// Create the wallet router, mounted under `/v1/wallet`.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/:address/activity-summary", get(get_activity_summary))
}

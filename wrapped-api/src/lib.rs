//! Wrapped API - Wallet Activity Summary Service
//!
//! HTTP front end for per-wallet activity summaries. A lookup is answered
//! from the local summary store when possible and otherwise filled from
//! BigQuery, with confirmed absences cached as negative markers.
//!
//! # Routes
//!
//! - `GET /v1/wallet/{address}/activity-summary`
//! - `GET /health/{ping,live,ready}`
//! - `GET /metrics`, `GET /openapi.json`

pub mod config;
pub mod error;
pub mod extractors;
pub mod macros;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod warehouse;

pub use config::{ApiConfig, StoreBackend, StoreConfig, WarehouseConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::{open_store, AppState};
pub use warehouse::BigQueryClient;

//! Wrapped API Server Entry Point
//!
//! Loads configuration, opens the summary store, connects the warehouse
//! client and serves until SIGINT/SIGTERM. On the way out the store is
//! flushed and pending spans are exported.

use std::sync::Arc;

use wrapped_api::telemetry::{init_tracer, shutdown_tracer, TelemetryConfig};
use wrapped_api::{
    create_api_router, open_store, ApiConfig, ApiError, ApiResult, AppState, BigQueryClient,
    StoreConfig, WarehouseConfig,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    let tracer_provider = init_tracer(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    let store_config = StoreConfig::from_env()?;
    let warehouse_config = WarehouseConfig::from_env()?;

    let store = open_store(&store_config)?;
    let source = BigQueryClient::new(warehouse_config).map_err(|e| {
        ApiError::internal_error(format!("Failed to initialize warehouse client: {}", e))
    })?;
    tracing::info!(warehouse = ?source, "Warehouse client ready");

    let state = AppState::new(Arc::clone(&store), Arc::new(source));
    let app = create_api_router(state, &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting wrapped API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    if let Err(e) = store.flush().await {
        tracing::error!(error = %e, "Failed to flush summary store");
    }
    shutdown_tracer(tracer_provider);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

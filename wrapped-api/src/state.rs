//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use wrapped_core::StorageError;
use wrapped_storage::{
    InMemorySummaryStore, LmdbSummaryStore, SummaryResolver, SummarySource, SummaryStore,
};

use crate::config::{StoreBackend, StoreConfig};

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Cache-fill resolver answering summary lookups.
    pub resolver: Arc<SummaryResolver>,
    /// The resolver's store, probed by readiness checks.
    pub store: Arc<dyn SummaryStore>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn SummaryStore>, source: Arc<dyn SummarySource>) -> Self {
        let resolver = Arc::new(SummaryResolver::new(Arc::clone(&store), source));
        Self {
            resolver,
            store,
            start_time: Instant::now(),
        }
    }
}

/// Open the configured summary store backend.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn SummaryStore>, StorageError> {
    match config.backend {
        StoreBackend::Lmdb => {
            let store = LmdbSummaryStore::open(&config.path, config.max_size_mb)?;
            tracing::info!(path = %config.path.display(), "Opened LMDB summary store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory summary store; records are lost on restart");
            Ok(Arc::new(InMemorySummaryStore::new()))
        }
    }
}

crate::impl_from_ref!(Arc<SummaryResolver>, resolver);
crate::impl_from_ref!(Arc<dyn SummaryStore>, store);
crate::impl_from_ref!(Instant, start_time);

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_store() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            ..StoreConfig::default()
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_open_lmdb_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::Lmdb,
            path: dir.path().join("summaries"),
            max_size_mb: 16,
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend_name(), "lmdb");
        assert!(store.health_check().await.is_ok());
    }
}

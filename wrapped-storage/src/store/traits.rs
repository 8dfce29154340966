//! Summary store trait.
//!
//! A store is a keyed document collection with a uniqueness constraint on the
//! account. The resolver only ever needs `find_one` and `create`; records are
//! never updated in place.

use async_trait::async_trait;
use wrapped_core::{AccountId, StorageError, WalletSummary};

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StorageError>;

/// Document store for wallet summaries, keyed by account.
///
/// Implementations must be safe for concurrent use and must reject a second
/// `create` for the same account with [`StorageError::AlreadyExists`].
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Look up the record for an account.
    async fn find_one(&self, account: &AccountId) -> StoreResult<Option<WalletSummary>>;

    /// Insert a new record, stamping `created_at`/`updated_at`.
    ///
    /// Returns the record as stored.
    async fn create(&self, summary: WalletSummary) -> StoreResult<WalletSummary>;

    /// Verify the backend is usable.
    async fn health_check(&self) -> StoreResult<()>;

    /// Persist any buffered writes. Called once during shutdown.
    async fn flush(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Usage counters.
    async fn stats(&self) -> StoreResult<CacheStats>;

    /// Short backend label for logs and health output.
    fn backend_name(&self) -> &'static str;
}

/// Statistics about store usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found a record (populated or negative).
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Records currently stored.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}

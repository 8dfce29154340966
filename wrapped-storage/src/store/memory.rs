//! In-memory summary store for tests and local development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use wrapped_core::{AccountId, StorageError, WalletSummary};

use super::traits::{CacheStats, StoreResult, SummaryStore};

/// In-memory store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemorySummaryStore {
    records: RwLock<HashMap<String, WalletSummary>>,
    stats: RwLock<CacheStats>,
}

impl InMemorySummaryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a record without stamping or duplicate checks. Test seeding only.
    pub fn seed(&self, summary: WalletSummary) -> StoreResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        records.insert(summary.account.as_str().to_string(), summary);
        Ok(())
    }

    fn record_lookup(&self, hit: bool) {
        if let Ok(mut stats) = self.stats.write() {
            if hit {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        }
    }
}

#[async_trait]
impl SummaryStore for InMemorySummaryStore {
    async fn find_one(&self, account: &AccountId) -> StoreResult<Option<WalletSummary>> {
        let found = {
            let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
            records.get(account.as_str()).cloned()
        };
        self.record_lookup(found.is_some());
        Ok(found)
    }

    async fn create(&self, mut summary: WalletSummary) -> StoreResult<WalletSummary> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        if records.contains_key(summary.account.as_str()) {
            return Err(StorageError::AlreadyExists {
                account: summary.account.to_string(),
            });
        }
        summary.stamp(Utc::now());
        records.insert(summary.account.as_str().to_string(), summary.clone());
        Ok(summary)
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.records
            .read()
            .map(|_| ())
            .map_err(|_| StorageError::LockPoisoned)
    }

    async fn stats(&self) -> StoreResult<CacheStats> {
        let entry_count = self
            .records
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .len() as u64;
        let stats = self.stats.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(CacheStats {
            entry_count,
            ..stats.clone()
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

//! LMDB-backed summary store.
//!
//! Uses the heed crate (Rust bindings for LMDB) as the production document
//! cache. Each record is stored under its account bytes as JSON.
//!
//! # Uniqueness
//!
//! `create` checks for an existing key and writes inside the same write
//! transaction. LMDB allows a single writer at a time, so two creates for the
//! same account can never both succeed.

use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use wrapped_core::{AccountId, StorageError, WalletSummary};

use super::traits::{CacheStats, StoreResult, SummaryStore};

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for StorageError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::Serialization(reason) | LmdbStoreError::Deserialization(reason) => {
                StorageError::Serialization { reason }
            }
            other => StorageError::Backend {
                reason: other.to_string(),
            },
        }
    }
}

fn txn_err(e: heed::Error) -> LmdbStoreError {
    LmdbStoreError::Transaction(e.to_string())
}

/// LMDB-backed summary store.
///
/// # Example
///
/// ```ignore
/// let store = LmdbSummaryStore::open("./data/summaries", 1024)?;
/// let created = store.create(WalletSummary::missing(account.clone())).await?;
/// assert!(store.find_one(&account).await?.is_some());
/// ```
pub struct LmdbSummaryStore {
    env: Env,
    db: Database<Bytes, Bytes>,
    stats: RwLock<CacheStats>,
}

impl LmdbSummaryStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment directory is owned by this process and is
        // not opened a second time while this handle is alive.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Self {
            env,
            db,
            stats: RwLock::new(CacheStats::default()),
        })
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

    fn read(&self, account: &AccountId) -> Result<Option<WalletSummary>, LmdbStoreError> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        match self.db.get(&rtxn, account.as_bytes()).map_err(txn_err)? {
            Some(bytes) => serde_json::from_slice(bytes)
                .map(Some)
                .map_err(|e| LmdbStoreError::Deserialization(e.to_string())),
            None => Ok(None),
        }
    }

    fn insert_new(&self, summary: &WalletSummary) -> Result<bool, LmdbStoreError> {
        let value = serde_json::to_vec(summary)
            .map_err(|e| LmdbStoreError::Serialization(e.to_string()))?;
        let key = summary.account.as_bytes();

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        if self.db.get(&wtxn, key).map_err(txn_err)?.is_some() {
            wtxn.abort();
            return Ok(false);
        }
        self.db.put(&mut wtxn, key, &value).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(true)
    }

    fn count(&self) -> Result<u64, LmdbStoreError> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        self.db.len(&rtxn).map_err(txn_err)
    }
}

#[async_trait]
impl SummaryStore for LmdbSummaryStore {
    async fn find_one(&self, account: &AccountId) -> StoreResult<Option<WalletSummary>> {
        let found = self.read(account)?;
        self.record_lookup(found.is_some());
        Ok(found)
    }

    async fn create(&self, mut summary: WalletSummary) -> StoreResult<WalletSummary> {
        summary.stamp(Utc::now());
        if !self.insert_new(&summary)? {
            return Err(StorageError::AlreadyExists {
                account: summary.account.to_string(),
            });
        }
        Ok(summary)
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.count()?;
        Ok(())
    }

    async fn flush(&self) -> StoreResult<()> {
        self.env
            .force_sync()
            .map_err(|e| StorageError::Backend {
                reason: format!("LMDB sync failed: {}", e),
            })
    }

    async fn stats(&self) -> StoreResult<CacheStats> {
        let entry_count = self.count()?;
        let stats = self.stats.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(CacheStats {
            entry_count,
            ..stats.clone()
        })
    }

    fn backend_name(&self) -> &'static str {
        "lmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn account() -> AccountId {
        AccountId::parse("GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7").unwrap()
    }

    fn create_test_store() -> (LmdbSummaryStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store =
            LmdbSummaryStore::open(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_find_missing_account() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.find_one(&account()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (store, _temp_dir) = create_test_store();
        let mut summary = WalletSummary::empty(account());
        summary.total_transactions = 100;
        summary.top_largest_xlm = r#"[{"xlm_amount":123}]"#.to_string();

        let created = store.create(summary).await.expect("create should succeed");
        assert!(created.created_at.is_some());

        let found = store
            .find_one(&account())
            .await
            .expect("find should succeed")
            .expect("record should exist");
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_duplicate_create_keeps_first_record() {
        let (store, _temp_dir) = create_test_store();
        store
            .create(WalletSummary::missing(account()))
            .await
            .expect("first create should succeed");

        let err = store
            .create(WalletSummary::empty(account()))
            .await
            .expect_err("second create should be rejected");
        assert!(matches!(err, StorageError::AlreadyExists { .. }));

        let kept = store.find_one(&account()).await.unwrap().unwrap();
        assert!(kept.is_missing);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = LmdbSummaryStore::open(temp_dir.path(), 10).unwrap();
            store.create(WalletSummary::missing(account())).await.unwrap();
            store.flush().await.unwrap();
        }
        let reopened = LmdbSummaryStore::open(temp_dir.path(), 10).unwrap();
        let found = reopened.find_one(&account()).await.unwrap().unwrap();
        assert!(found.is_missing);
    }

    #[tokio::test]
    async fn test_stats_and_health() {
        let (store, _temp_dir) = create_test_store();
        store.health_check().await.expect("healthy");
        store.find_one(&account()).await.unwrap();
        store.create(WalletSummary::empty(account())).await.unwrap();
        store.find_one(&account()).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(store.backend_name(), "lmdb");
    }
}

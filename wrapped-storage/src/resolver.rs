//! Cache-fill resolver with negative caching.
//!
//! A lookup resolves to exactly one of three states:
//!
//! - **hit**: the store already has a record. A populated record is returned
//!   as-is; a negative marker means the account is known to be absent.
//! - **cold miss**: the store has nothing, so the warehouse is queried, the row
//!   is normalized and persisted, and the new record is returned.
//! - **confirmed absent**: the warehouse has no row, so a negative marker is
//!   persisted and every later lookup short-circuits to not-found.
//!
//! Each lookup performs at most one store read, one warehouse query and one
//! store write, in that order, while holding the per-account in-flight guard.
//! Upstream failures never write to the store.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use wrapped_core::{
    AccountId, LookupError, Normalizer, StorageError, WalletSummary, WarehouseError,
};

use crate::inflight::InFlightKeys;
use crate::source::SummarySource;
use crate::store::SummaryStore;

/// How a lookup was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupOutcome {
    /// Populated record found in the store.
    Hit,
    /// Negative marker found in the store.
    NegativeHit,
    /// Warehouse row normalized and stored.
    Filled,
    /// Warehouse reported no row; marker stored (or the write was attempted).
    NegativeStored,
    Timeout,
    UpstreamError,
    StorageError,
}

impl LookupOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupOutcome::Hit => "hit",
            LookupOutcome::NegativeHit => "negative_hit",
            LookupOutcome::Filled => "filled",
            LookupOutcome::NegativeStored => "negative_stored",
            LookupOutcome::Timeout => "timeout",
            LookupOutcome::UpstreamError => "upstream_error",
            LookupOutcome::StorageError => "storage_error",
        }
    }

    /// All outcomes, for pre-registering metric label values.
    pub const ALL: [LookupOutcome; 7] = [
        LookupOutcome::Hit,
        LookupOutcome::NegativeHit,
        LookupOutcome::Filled,
        LookupOutcome::NegativeStored,
        LookupOutcome::Timeout,
        LookupOutcome::UpstreamError,
        LookupOutcome::StorageError,
    ];
}

/// Result of one lookup together with how it was reached.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub outcome: LookupOutcome,
    pub result: Result<WalletSummary, LookupError>,
}

impl Resolution {
    fn found(outcome: LookupOutcome, summary: WalletSummary) -> Self {
        Self {
            outcome,
            result: Ok(summary),
        }
    }

    fn failed(outcome: LookupOutcome, error: LookupError) -> Self {
        Self {
            outcome,
            result: Err(error),
        }
    }

    fn not_found(outcome: LookupOutcome, account: &AccountId) -> Self {
        Self::failed(
            outcome,
            LookupError::NotFound {
                account: account.to_string(),
            },
        )
    }

    /// Resolution for a record that is already in the store.
    fn existing(record: WalletSummary) -> Self {
        if record.is_missing {
            Self::not_found(LookupOutcome::NegativeHit, &record.account)
        } else {
            Self::found(LookupOutcome::Hit, record)
        }
    }

    fn storage(error: StorageError) -> Self {
        Self::failed(LookupOutcome::StorageError, LookupError::Storage(error))
    }
}

/// Answers summary lookups from the store, filling it from the warehouse.
pub struct SummaryResolver {
    store: Arc<dyn SummaryStore>,
    source: Arc<dyn SummarySource>,
    normalizer: Normalizer,
    in_flight: InFlightKeys,
}

impl SummaryResolver {
    pub fn new(store: Arc<dyn SummaryStore>, source: Arc<dyn SummarySource>) -> Self {
        Self {
            store,
            source,
            normalizer: Normalizer::new(),
            in_flight: InFlightKeys::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn SummaryStore> {
        &self.store
    }

    /// Resolve a summary, discarding the outcome label.
    pub async fn lookup(&self, account: &AccountId) -> Result<WalletSummary, LookupError> {
        self.resolve(account).await.result
    }

    /// Resolve a summary and report how it was reached.
    pub async fn resolve(&self, account: &AccountId) -> Resolution {
        let started = Instant::now();
        let _guard = self.in_flight.acquire(account.as_str()).await;
        let resolution = self.resolve_held(account).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &resolution.result {
            Ok(_) => debug!(
                account = %account,
                outcome = resolution.outcome.as_str(),
                elapsed_ms,
                "summary lookup resolved"
            ),
            Err(LookupError::NotFound { .. }) => debug!(
                account = %account,
                outcome = resolution.outcome.as_str(),
                elapsed_ms,
                "summary lookup: account absent"
            ),
            Err(e) => warn!(
                account = %account,
                outcome = resolution.outcome.as_str(),
                elapsed_ms,
                error = %e,
                "summary lookup failed"
            ),
        }
        resolution
    }

    async fn resolve_held(&self, account: &AccountId) -> Resolution {
        match self.store.find_one(account).await {
            Ok(Some(record)) => return Resolution::existing(record),
            Ok(None) => {}
            Err(e) => return Resolution::storage(e),
        }

        match self.source.fetch_summary(account).await {
            Ok(row) => {
                let shaped = self.normalizer.shape(account, &row);
                self.store_populated(account, shaped).await
            }
            Err(WarehouseError::NotFound { .. }) => self.store_negative(account).await,
            Err(WarehouseError::Timeout { reason }) => Resolution::failed(
                LookupOutcome::Timeout,
                LookupError::UpstreamTimeout { reason },
            ),
            Err(other) => Resolution::failed(
                LookupOutcome::UpstreamError,
                LookupError::UpstreamError {
                    reason: other.to_string(),
                },
            ),
        }
    }

    async fn store_populated(&self, account: &AccountId, shaped: WalletSummary) -> Resolution {
        match self.store.create(shaped).await {
            Ok(created) => {
                info!(account = %account, "cached new activity summary");
                Resolution::found(LookupOutcome::Filled, created)
            }
            Err(StorageError::AlreadyExists { .. }) => self.adopt_existing(account).await,
            Err(e) => Resolution::storage(e),
        }
    }

    async fn store_negative(&self, account: &AccountId) -> Resolution {
        match self.store.create(WalletSummary::missing(account.clone())).await {
            Ok(_) => info!(account = %account, "cached negative marker"),
            Err(StorageError::AlreadyExists { .. }) => return self.adopt_existing(account).await,
            // Absence is confirmed by the warehouse even when the marker write fails.
            Err(e) => error!(
                account = %account,
                error = %e,
                "failed to persist negative marker"
            ),
        }
        Resolution::not_found(LookupOutcome::NegativeStored, account)
    }

    /// Another writer created the record first; answer with theirs.
    async fn adopt_existing(&self, account: &AccountId) -> Resolution {
        debug!(account = %account, "lost create race, re-reading record");
        match self.store.find_one(account).await {
            Ok(Some(record)) => Resolution::existing(record),
            Ok(None) => Resolution::storage(StorageError::Backend {
                reason: format!("record for {} rejected as duplicate but not found", account),
            }),
            Err(e) => Resolution::storage(e),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CacheStats, InMemorySummaryStore, StoreResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use wrapped_core::RawSummaryRow;

    const ACCOUNT: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

    fn account() -> AccountId {
        AccountId::parse(ACCOUNT).unwrap()
    }

    // Mock source returning a fixed answer and counting calls
    struct MockSource {
        answer: Result<RawSummaryRow, WarehouseError>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl MockSource {
        fn new(answer: Result<RawSummaryRow, WarehouseError>) -> Self {
            Self {
                answer,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn row(value: serde_json::Value) -> Self {
            Self::new(Ok(RawSummaryRow::try_from(value).unwrap()))
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SummarySource for MockSource {
        async fn fetch_summary(
            &self,
            _account: &AccountId,
        ) -> Result<RawSummaryRow, WarehouseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answer.clone()
        }
    }

    // Mock store whose reads and writes can be made to fail
    #[derive(Default)]
    struct FaultyStore {
        inner: InMemorySummaryStore,
        fail_reads: bool,
        fail_writes: bool,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl SummaryStore for FaultyStore {
        async fn find_one(&self, account: &AccountId) -> StoreResult<Option<WalletSummary>> {
            if self.fail_reads {
                return Err(StorageError::Backend {
                    reason: "read refused".into(),
                });
            }
            self.inner.find_one(account).await
        }

        async fn create(&self, summary: WalletSummary) -> StoreResult<WalletSummary> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(StorageError::Backend {
                    reason: "write refused".into(),
                });
            }
            self.inner.create(summary).await
        }

        async fn health_check(&self) -> StoreResult<()> {
            Ok(())
        }

        async fn stats(&self) -> StoreResult<CacheStats> {
            self.inner.stats().await
        }

        fn backend_name(&self) -> &'static str {
            "faulty"
        }
    }

    // Mock store where another process wins the create race
    struct RacingStore {
        winner: WalletSummary,
        stored: Mutex<Option<WalletSummary>>,
    }

    #[async_trait]
    impl SummaryStore for RacingStore {
        async fn find_one(&self, _account: &AccountId) -> StoreResult<Option<WalletSummary>> {
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn create(&self, summary: WalletSummary) -> StoreResult<WalletSummary> {
            *self.stored.lock().unwrap() = Some(self.winner.clone());
            Err(StorageError::AlreadyExists {
                account: summary.account.to_string(),
            })
        }

        async fn health_check(&self) -> StoreResult<()> {
            Ok(())
        }

        async fn stats(&self) -> StoreResult<CacheStats> {
            Ok(CacheStats::default())
        }

        fn backend_name(&self) -> &'static str {
            "racing"
        }
    }

    fn resolver(store: Arc<dyn SummaryStore>, source: Arc<MockSource>) -> SummaryResolver {
        SummaryResolver::new(store, source)
    }

    #[tokio::test]
    async fn test_cold_miss_populates_store() {
        let store = Arc::new(InMemorySummaryStore::new());
        let source = Arc::new(MockSource::row(json!({
            "total_transactions": 100,
            "most_active_day": "2023-10-01"
        })));
        let resolver = resolver(store.clone(), source.clone());

        let resolution = resolver.resolve(&account()).await;
        assert_eq!(resolution.outcome, LookupOutcome::Filled);
        let summary = resolution.result.unwrap();
        assert_eq!(summary.total_transactions, 100);
        assert!(!summary.is_missing);
        assert!(summary.most_active_day.is_some());

        let stored = store.find_one(&account()).await.unwrap().unwrap();
        assert_eq!(stored, summary);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_hit_is_idempotent() {
        let store = Arc::new(InMemorySummaryStore::new());
        let source = Arc::new(MockSource::row(json!({ "total_transactions": 5 })));
        let resolver = resolver(store, source.clone());

        let first = resolver.lookup(&account()).await.unwrap();
        let second = resolver.resolve(&account()).await;
        assert_eq!(second.outcome, LookupOutcome::Hit);
        assert_eq!(second.result.unwrap(), first);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_existing_record_returned_unchanged() {
        let store = Arc::new(InMemorySummaryStore::new());
        let mut existing = WalletSummary::empty(account());
        existing.total_transactions = 42;
        store.seed(existing.clone()).unwrap();
        let source = Arc::new(MockSource::row(json!({ "total_transactions": 1 })));
        let resolver = resolver(store, source.clone());

        let summary = resolver.lookup(&account()).await.unwrap();
        assert_eq!(summary, existing);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_absent_account_is_negatively_cached() {
        let store = Arc::new(InMemorySummaryStore::new());
        let source = Arc::new(MockSource::new(Err(WarehouseError::NotFound {
            account: ACCOUNT.into(),
        })));
        let resolver = resolver(store.clone(), source.clone());

        let first = resolver.resolve(&account()).await;
        assert_eq!(first.outcome, LookupOutcome::NegativeStored);
        assert!(matches!(first.result, Err(LookupError::NotFound { .. })));

        let marker = store.find_one(&account()).await.unwrap().unwrap();
        assert_eq!(
            WalletSummary {
                created_at: None,
                updated_at: None,
                ..marker
            },
            WalletSummary::missing(account())
        );

        let second = resolver.resolve(&account()).await;
        assert_eq!(second.outcome, LookupOutcome::NegativeHit);
        assert!(matches!(second.result, Err(LookupError::NotFound { .. })));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_writes_nothing() {
        let store = Arc::new(InMemorySummaryStore::new());
        let source = Arc::new(MockSource::new(Err(WarehouseError::Timeout {
            reason: "Query timed out".into(),
        })));
        let resolver = resolver(store.clone(), source);

        let resolution = resolver.resolve(&account()).await;
        assert_eq!(resolution.outcome, LookupOutcome::Timeout);
        assert!(matches!(
            resolution.result,
            Err(LookupError::UpstreamTimeout { .. })
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_writes_nothing() {
        let store = Arc::new(InMemorySummaryStore::new());
        let source = Arc::new(MockSource::new(Err(WarehouseError::QueryFailed {
            reason: "access denied".into(),
        })));
        let resolver = resolver(store.clone(), source);

        let err = resolver.lookup(&account()).await.unwrap_err();
        match err {
            LookupError::UpstreamError { reason } => assert!(reason.contains("access denied")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_store_read_failure_skips_source() {
        let store = Arc::new(FaultyStore {
            fail_reads: true,
            ..Default::default()
        });
        let source = Arc::new(MockSource::row(json!({})));
        let resolver = resolver(store, source.clone());

        let resolution = resolver.resolve(&account()).await;
        assert_eq!(resolution.outcome, LookupOutcome::StorageError);
        assert!(matches!(resolution.result, Err(LookupError::Storage(_))));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_populated_write_failure_is_storage_error() {
        let store = Arc::new(FaultyStore {
            fail_writes: true,
            ..Default::default()
        });
        let source = Arc::new(MockSource::row(json!({ "total_transactions": 3 })));
        let resolver = resolver(store, source);

        let err = resolver.lookup(&account()).await.unwrap_err();
        assert!(matches!(err, LookupError::Storage(StorageError::Backend { .. })));
    }

    #[tokio::test]
    async fn test_negative_write_failure_still_not_found() {
        let store = Arc::new(FaultyStore {
            fail_writes: true,
            ..Default::default()
        });
        let source = Arc::new(MockSource::new(Err(WarehouseError::NotFound {
            account: ACCOUNT.into(),
        })));
        let resolver = resolver(store.clone(), source);

        let err = resolver.lookup(&account()).await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound { .. }));
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lost_race_returns_winner() {
        let mut winner = WalletSummary::empty(account());
        winner.total_transactions = 77;
        let store = Arc::new(RacingStore {
            winner: winner.clone(),
            stored: Mutex::new(None),
        });
        let source = Arc::new(MockSource::row(json!({ "total_transactions": 1 })));
        let resolver = resolver(store, source);

        let resolution = resolver.resolve(&account()).await;
        assert_eq!(resolution.outcome, LookupOutcome::Hit);
        assert_eq!(resolution.result.unwrap(), winner);
    }

    #[tokio::test]
    async fn test_lost_race_to_marker_is_not_found() {
        let store = Arc::new(RacingStore {
            winner: WalletSummary::missing(account()),
            stored: Mutex::new(None),
        });
        let source = Arc::new(MockSource::row(json!({ "total_transactions": 1 })));
        let resolver = resolver(store, source);

        let resolution = resolver.resolve(&account()).await;
        assert_eq!(resolution.outcome, LookupOutcome::NegativeHit);
        assert!(matches!(resolution.result, Err(LookupError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_cold_lookups_query_source_once() {
        let store = Arc::new(InMemorySummaryStore::new());
        let source = Arc::new(
            MockSource::row(json!({ "total_transactions": 10 }))
                .with_delay(Duration::from_millis(20)),
        );
        let resolver = Arc::new(resolver(store, source.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = Arc::clone(&resolver);
            handles.push(tokio::spawn(async move {
                resolver.lookup(&account()).await
            }));
        }
        for handle in handles {
            let summary = handle.await.unwrap().unwrap();
            assert_eq!(summary.total_transactions, 10);
        }
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_outcome_labels_are_unique() {
        let labels: std::collections::HashSet<_> =
            LookupOutcome::ALL.iter().map(|o| o.as_str()).collect();
        assert_eq!(labels.len(), LookupOutcome::ALL.len());
    }
}

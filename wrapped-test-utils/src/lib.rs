//! Wrapped Test Utilities
//!
//! Centralized test infrastructure for the wrapped workspace:
//! - A scripted, call-counting warehouse source
//! - Proptest generators for account ids, amounts and rows
//! - Test fixtures for common scenarios
//! - Custom assertions for lookup results

// Re-export core types for convenience
pub use wrapped_core::{
    AccountId, LookupError, RawSummaryRow, StorageError, Timestamp, WalletSummary,
    WarehouseError,
};
pub use wrapped_storage::{InMemorySummaryStore, SummarySource, SummaryStore};

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// SCRIPTED SOURCE
// ============================================================================

/// Warehouse stand-in with per-account scripted answers.
///
/// Unscripted accounts answer `NotFound`. Every call is counted, globally and
/// per account, so tests can assert how often the warehouse was consulted.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    answers: Mutex<HashMap<String, Result<RawSummaryRow, WarehouseError>>>,
    calls: AtomicUsize,
    calls_by_account: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `account` with `row`.
    pub fn with_row(self, account: &AccountId, row: RawSummaryRow) -> Self {
        self.script(account, Ok(row));
        self
    }

    /// Answer `account` with `error`.
    pub fn with_error(self, account: &AccountId, error: WarehouseError) -> Self {
        self.script(account, Err(error));
        self
    }

    /// Sleep before answering, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the scripted answer for `account`.
    pub fn script(&self, account: &AccountId, answer: Result<RawSummaryRow, WarehouseError>) {
        if let Ok(mut answers) = self.answers.lock() {
            answers.insert(account.to_string(), answer);
        }
    }

    /// Total number of fetches.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of fetches for one account.
    pub fn calls_for(&self, account: &AccountId) -> usize {
        self.calls_by_account
            .lock()
            .map(|calls| calls.get(account.as_str()).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl SummarySource for ScriptedSource {
    async fn fetch_summary(&self, account: &AccountId) -> Result<RawSummaryRow, WarehouseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls_by_account.lock() {
            *calls.entry(account.to_string()).or_insert(0) += 1;
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let answer = self
            .answers
            .lock()
            .ok()
            .and_then(|answers| answers.get(account.as_str()).cloned());
        answer.unwrap_or_else(|| {
            Err(WarehouseError::NotFound {
                account: account.to_string(),
            })
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for wallet summary inputs.

    use super::*;
    use proptest::prelude::*;

    /// Generate a well-formed account id.
    pub fn arb_account_id() -> impl Strategy<Value = AccountId> {
        "G[A-Z2-7]{55}".prop_map(|s| {
            AccountId::parse(s).unwrap_or_else(|e| unreachable!("generator produced {}", e))
        })
    }

    /// Generate a string that is not a valid account id.
    pub fn arb_invalid_address() -> impl Strategy<Value = String> {
        prop_oneof![
            // wrong length
            "G[A-Z2-7]{0,54}",
            "G[A-Z2-7]{56,70}",
            // wrong prefix
            "[A-FH-Z][A-Z2-7]{55}",
            // lowercase or out-of-alphabet character somewhere
            "G[A-Z2-7]{10}[a-z0189][A-Z2-7]{44}",
        ]
    }

    /// Generate a finite currency amount.
    pub fn arb_amount() -> impl Strategy<Value = f64> {
        prop_oneof![
            -1.0e9..1.0e9f64,
            (-1_000_000i64..1_000_000i64).prop_map(|n| n as f64),
        ]
    }

    /// Generate a raw row with the scalar fields populated.
    pub fn arb_raw_row() -> impl Strategy<Value = RawSummaryRow> {
        (0i64..1_000_000, arb_amount(), arb_amount(), 0i64..3650).prop_map(
            |(transactions, sent, received, days)| {
                let mut row = RawSummaryRow::default();
                row.insert("total_transactions", json!(transactions));
                row.insert("total_sent_xlm", json!(sent));
                row.insert("total_received_xlm", json!(received));
                row.insert("time_on_chain_days", json!(days));
                row
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// A valid account address.
    pub const SAMPLE_ACCOUNT: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

    /// A second valid account address.
    pub const OTHER_ACCOUNT: &str = "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2H";

    pub fn sample_account() -> AccountId {
        AccountId::parse(SAMPLE_ACCOUNT).unwrap_or_else(|e| unreachable!("{}", e))
    }

    pub fn other_account() -> AccountId {
        AccountId::parse(OTHER_ACCOUNT).unwrap_or_else(|e| unreachable!("{}", e))
    }

    fn row_from(value: Value) -> RawSummaryRow {
        RawSummaryRow::try_from(value).unwrap_or_else(|e| unreachable!("{}", e))
    }

    /// The minimal row: 100 transactions, most active on 2023-10-01.
    pub fn minimal_row() -> RawSummaryRow {
        row_from(json!({
            "total_transactions": 100,
            "most_active_day": "2023-10-01",
        }))
    }

    /// A row exercising every normalization path.
    pub fn sample_row() -> RawSummaryRow {
        row_from(json!({
            "total_transactions": 100,
            "total_sent_xlm": 1234.5678,
            "total_received_xlm": "99.999",
            "total_selling_xlm": 0,
            "total_buying_xlm": 12.345,
            "net_pnl_xlm": -3.14159,
            "time_on_chain_days": 412,
            "first_txn_time": "2022-11-03 08:15:00 UTC",
            "last_txn_time": "2024-12-30T23:59:59Z",
            "last_transaction_id": "219902325555200001",
            "last_transaction_type_int": 1,
            "last_transaction_type_str": "payment",
            "last_transaction_timestamp": "2024-12-30 23:59:59.123 UTC",
            "last_transaction_asset_code": "USDC",
            "last_transaction_amount": 10.456,
            "last_xlm_transaction_id": "",
            "last_xlm_transaction_amount": 0,
            "top_1_largest_xlm": "[{\"xlm_amount\": 123.456, \"tx\": \"abc\"}]",
            "top_1_nonxlm_sent": [{"asset_code": "USDC", "total_sent": 99.5}],
            "unique_wallet_interactions": 17,
            "top_interaction_wallet": "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2H",
            "top_interaction_count": 9,
            "most_active_day": "2023-10-01",
            "most_active_day_count": 12,
            "most_active_month": "2023-10-01",
            "most_active_month_count": 40,
            "top_5_transactions_by_category": [{"category": "payment", "count": 80}],
            "token_balance": 1000.005,
            "starting_balance": 500,
            "balance_diff": "500.005",
        }))
    }

    /// A stored populated record with 42 transactions.
    pub fn stored_summary(account: &AccountId) -> WalletSummary {
        WalletSummary {
            total_transactions: 42,
            ..WalletSummary::empty(account.clone())
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on lookup results and normalized values.

    use super::*;
    use wrapped_core::round_to;

    /// Assert that a lookup confirmed absence.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &Result<T, LookupError>) {
        match result {
            Err(LookupError::NotFound { .. }) => {}
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    /// Assert that a lookup timed out upstream.
    #[track_caller]
    pub fn assert_upstream_timeout<T: std::fmt::Debug>(result: &Result<T, LookupError>) {
        match result {
            Err(LookupError::UpstreamTimeout { .. }) => {}
            other => panic!("Expected UpstreamTimeout, got: {:?}", other),
        }
    }

    /// Assert that a lookup failed on the store.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &Result<T, LookupError>) {
        match result {
            Err(LookupError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that `value` carries at most `decimals` decimal places.
    #[track_caller]
    pub fn assert_rounded_to(value: f64, decimals: u32) {
        assert_eq!(
            round_to(value, decimals),
            value,
            "{} has more than {} decimal places",
            value,
            decimals
        );
    }
}

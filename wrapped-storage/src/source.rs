//! Source-of-truth trait for summary rows.

use async_trait::async_trait;
use wrapped_core::{AccountId, RawSummaryRow, WarehouseError};

/// A queryable warehouse returning at most one summary row per account.
///
/// Implementations bind the account as a query parameter and never splice it
/// into query text. They apply their own time budget and report running out
/// of it as [`WarehouseError::Timeout`]. "No row for this account" must be
/// reported as [`WarehouseError::NotFound`], never as an empty success.
#[async_trait]
pub trait SummarySource: Send + Sync {
    async fn fetch_summary(&self, account: &AccountId) -> Result<RawSummaryRow, WarehouseError>;
}

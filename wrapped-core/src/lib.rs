//! Wrapped Core - Wallet Summary Types
//!
//! Pure data structures and row normalization. All other crates depend on this.
//! Nothing in this crate performs I/O.

// ============================================================================
// MODULES
// ============================================================================

pub mod error;
pub mod health;
pub mod identity;
pub mod normalize;
pub mod summary;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use error::{ConfigError, LookupError, StorageError, ValidationError, WarehouseError};
pub use health::{HealthCheck, HealthStatus};
pub use identity::{AccountId, Timestamp, ACCOUNT_ID_LEN};
pub use normalize::{
    parse_datetime, round_json, round_to, FieldKind, Normalizer, CURRENCY_DECIMALS,
    TOP_N_DECIMALS,
};
pub use summary::{RawSummaryRow, WalletSummary, EMPTY_ARRAY_TEXT, EMPTY_OBJECT_TEXT};

//! Error types for wallet summary operations

use thiserror::Error;

/// Document store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Summary already exists for account {account}")]
    AlreadyExists { account: String },

    #[error("Store backend failure: {reason}")]
    Backend { reason: String },

    #[error("Summary serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Data warehouse errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WarehouseError {
    /// The warehouse answered and affirmatively has no row for the account.
    #[error("No warehouse row for account {account}")]
    NotFound { account: String },

    #[error("Warehouse query timed out: {reason}")]
    Timeout { reason: String },

    #[error("Warehouse query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Warehouse returned an unreadable row: {reason}")]
    InvalidRow { reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid account address {value:?}: {reason}")]
    InvalidAccount { value: String, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Outcome of a failed summary lookup.
///
/// Every variant propagates to the caller unchanged; nothing is retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// Confirmed absence: a negative marker exists, or the warehouse had no row.
    #[error("No activity summary for account {account}")]
    NotFound { account: String },

    #[error("Upstream timed out: {reason}")]
    UpstreamTimeout { reason: String },

    #[error("Upstream failure: {reason}")]
    UpstreamError { reason: String },

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl LookupError {
    /// Short label used for logs and the lookup outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            LookupError::NotFound { .. } => "not_found",
            LookupError::UpstreamTimeout { .. } => "timeout",
            LookupError::UpstreamError { .. } => "upstream_error",
            LookupError::Storage(_) => "storage_error",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! The cached wallet summary record and the raw warehouse row it is shaped from

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::WarehouseError;
use crate::identity::{AccountId, Timestamp};

/// Default text for a "last transaction" breakdown.
pub const EMPTY_OBJECT_TEXT: &str = "{}";
/// Default text for a "top-N" list.
pub const EMPTY_ARRAY_TEXT: &str = "[]";

fn empty_object_text() -> String {
    EMPTY_OBJECT_TEXT.to_string()
}

fn empty_array_text() -> String {
    EMPTY_ARRAY_TEXT.to_string()
}

// ============================================================================
// WALLET SUMMARY
// ============================================================================

/// Precomputed activity summary for one account.
///
/// A record is either fully populated (`is_missing == false`) or a negative
/// marker (`is_missing == true` with every other field at its default). Nested
/// breakdowns are stored as JSON text so the stored shape does not move when
/// the warehouse adds nested columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WalletSummary {
    pub account: AccountId,
    #[serde(rename = "isMissing", default)]
    pub is_missing: bool,

    #[serde(default)]
    pub total_transactions: i64,
    #[serde(default)]
    pub total_sent_xlm: f64,
    #[serde(default)]
    pub total_received_xlm: f64,
    #[serde(default)]
    pub total_selling_xlm: f64,
    #[serde(default)]
    pub total_buying_xlm: f64,
    #[serde(default)]
    pub net_pnl_xlm: f64,
    #[serde(default)]
    pub time_on_chain_days: i64,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub first_txn_time: Option<Timestamp>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub last_txn_time: Option<Timestamp>,

    /// JSON object text: `id`, `op_type_int`, `op_type_str`, `timestamp`, `asset_code`, `amount`
    #[serde(default = "empty_object_text")]
    pub last_transaction_details: String,
    #[serde(default = "empty_object_text")]
    pub last_nonxlm_transaction_details: String,
    #[serde(default = "empty_object_text")]
    pub last_xlm_transaction_details: String,

    /// JSON array text
    #[serde(default = "empty_array_text")]
    pub top_largest_nonxlm: String,
    #[serde(default = "empty_array_text")]
    pub top_largest_xlm: String,
    #[serde(default = "empty_array_text")]
    pub top_nonxlm_sent: String,
    #[serde(default = "empty_array_text")]
    pub top_nonxlm_received: String,
    #[serde(default = "empty_array_text")]
    pub top_nonxlm_selling: String,
    #[serde(default = "empty_array_text")]
    pub top_nonxlm_buying: String,

    #[serde(default)]
    pub unique_wallet_interactions: i64,
    #[serde(default)]
    pub top_interaction_wallet: Option<String>,
    #[serde(default)]
    pub top_interaction_count: i64,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub most_active_day: Option<Timestamp>,
    #[serde(default)]
    pub most_active_day_count: i64,
    /// `YYYY-MM`, or empty
    #[serde(default)]
    pub most_active_month: String,
    #[serde(default)]
    pub most_active_month_count: i64,
    #[serde(default)]
    pub top_5_transactions_by_category: String,

    #[serde(default)]
    pub token_balance: f64,
    #[serde(default)]
    pub starting_balance: f64,
    #[serde(default)]
    pub balance_diff: f64,

    /// Set by the store on create.
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub created_at: Option<Timestamp>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub updated_at: Option<Timestamp>,
}

impl WalletSummary {
    /// An all-defaults record for `account` with `is_missing == false`.
    ///
    /// The normalizer starts from this and fills in what the row provides.
    pub fn empty(account: AccountId) -> Self {
        Self {
            account,
            is_missing: false,
            total_transactions: 0,
            total_sent_xlm: 0.0,
            total_received_xlm: 0.0,
            total_selling_xlm: 0.0,
            total_buying_xlm: 0.0,
            net_pnl_xlm: 0.0,
            time_on_chain_days: 0,
            first_txn_time: None,
            last_txn_time: None,
            last_transaction_details: empty_object_text(),
            last_nonxlm_transaction_details: empty_object_text(),
            last_xlm_transaction_details: empty_object_text(),
            top_largest_nonxlm: empty_array_text(),
            top_largest_xlm: empty_array_text(),
            top_nonxlm_sent: empty_array_text(),
            top_nonxlm_received: empty_array_text(),
            top_nonxlm_selling: empty_array_text(),
            top_nonxlm_buying: empty_array_text(),
            unique_wallet_interactions: 0,
            top_interaction_wallet: None,
            top_interaction_count: 0,
            most_active_day: None,
            most_active_day_count: 0,
            most_active_month: String::new(),
            most_active_month_count: 0,
            top_5_transactions_by_category: String::new(),
            token_balance: 0.0,
            starting_balance: 0.0,
            balance_diff: 0.0,
            created_at: None,
            updated_at: None,
        }
    }

    /// Negative-cache marker: the warehouse confirmed it has no row for `account`.
    pub fn missing(account: AccountId) -> Self {
        Self {
            is_missing: true,
            ..Self::empty(account)
        }
    }

    pub fn is_negative_marker(&self) -> bool {
        self.is_missing
    }

    /// Stamp store-managed timestamps. `created_at` is only set once.
    pub fn stamp(&mut self, now: Timestamp) {
        if self.created_at.is_none() {
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);
    }
}

// ============================================================================
// RAW WAREHOUSE ROW
// ============================================================================

/// One warehouse row, as the flat JSON object stored in the `row_data` column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSummaryRow(Map<String, Value>);

impl RawSummaryRow {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Parse a row from JSON text. Anything but a JSON object is rejected.
    pub fn from_json_str(text: &str) -> Result<Self, WarehouseError> {
        let value: Value = serde_json::from_str(text).map_err(|e| WarehouseError::InvalidRow {
            reason: format!("row_data is not valid JSON: {}", e),
        })?;
        Self::try_from(value)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Value> for RawSummaryRow {
    type Error = WarehouseError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(WarehouseError::InvalidRow {
                reason: format!("expected a JSON object, got {}", json_type_name(&other)),
            }),
        }
    }
}

impl From<Map<String, Value>> for RawSummaryRow {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//! Row normalization
//!
//! Reshapes a raw warehouse row into a [`WalletSummary`]. Everything here is
//! pure: no I/O, no clock, no randomness.
//!
//! Date handling is driven by a field-kind table. Only fields declared in the
//! table are ever parsed as dates, and only when they parse cleanly; nothing is
//! guessed from the shape of a value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::identity::{AccountId, Timestamp};
use crate::summary::{RawSummaryRow, WalletSummary, EMPTY_ARRAY_TEXT};

/// Decimal places kept on currency amounts.
pub const CURRENCY_DECIMALS: u32 = 2;

/// Decimal places kept on the amount inside "top-N" entries.
pub const TOP_N_DECIMALS: u32 = 0;

// Largest magnitude at which every integer is exactly representable as f64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

// ============================================================================
// FIELD KINDS
// ============================================================================

/// How a declared source field is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Instant in time, kept at full precision.
    Timestamp,
    /// Calendar day, stored as midnight UTC.
    Date,
    /// Calendar month, rendered `YYYY-MM`.
    Month,
}

const DEFAULT_FIELD_KINDS: &[(&str, FieldKind)] = &[
    ("first_txn_time", FieldKind::Timestamp),
    ("last_txn_time", FieldKind::Timestamp),
    ("last_transaction_timestamp", FieldKind::Timestamp),
    ("last_nonxlm_transaction_timestamp", FieldKind::Timestamp),
    ("last_xlm_transaction_timestamp", FieldKind::Timestamp),
    ("most_active_day", FieldKind::Date),
    ("most_active_month", FieldKind::Month),
];

/// Source prefixes of the "last transaction" breakdowns.
const LAST_TRANSACTION_PREFIXES: [&str; 3] = [
    "last_transaction",
    "last_nonxlm_transaction",
    "last_xlm_transaction",
];

/// A "top-N" list: source field and the amount field rounded inside each entry.
struct TopList {
    source: &'static str,
    amount_field: &'static str,
}

const TOP_LISTS: [TopList; 6] = [
    TopList {
        source: "top_1_largest_nonxlm",
        amount_field: "nonxlm_amount",
    },
    TopList {
        source: "top_1_largest_xlm",
        amount_field: "xlm_amount",
    },
    TopList {
        source: "top_1_nonxlm_sent",
        amount_field: "total_sent",
    },
    TopList {
        source: "top_1_nonxlm_received",
        amount_field: "total_received",
    },
    TopList {
        source: "top_1_nonxlm_selling",
        amount_field: "total_selling",
    },
    TopList {
        source: "top_1_nonxlm_buying",
        amount_field: "total_buying",
    },
];

// ============================================================================
// NORMALIZER
// ============================================================================

/// Shapes warehouse rows into cacheable summaries.
#[derive(Debug, Clone)]
pub struct Normalizer {
    field_kinds: HashMap<String, FieldKind>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Normalizer with the standard field-kind table.
    pub fn new() -> Self {
        Self {
            field_kinds: DEFAULT_FIELD_KINDS
                .iter()
                .map(|(field, kind)| (field.to_string(), *kind))
                .collect(),
        }
    }

    /// Declare (or redeclare) the kind of a source field.
    pub fn with_field_kind(mut self, field: impl Into<String>, kind: FieldKind) -> Self {
        self.field_kinds.insert(field.into(), kind);
        self
    }

    pub fn kind_of(&self, field: &str) -> Option<FieldKind> {
        self.field_kinds.get(field).copied()
    }

    /// Build the canonical record for `account` from a raw row.
    pub fn shape(&self, account: &AccountId, row: &RawSummaryRow) -> WalletSummary {
        let [last_tx, last_nonxlm_tx, last_xlm_tx] =
            LAST_TRANSACTION_PREFIXES.map(|prefix| self.last_transaction(row, prefix));
        let [largest_nonxlm, largest_xlm, nonxlm_sent, nonxlm_received, nonxlm_selling, nonxlm_buying] =
            TOP_LISTS.each_ref().map(|list| top_list_text(row.get(list.source), list.amount_field));

        WalletSummary {
            total_transactions: count(row.get("total_transactions")),
            total_sent_xlm: currency(row.get("total_sent_xlm")),
            total_received_xlm: currency(row.get("total_received_xlm")),
            total_selling_xlm: currency(row.get("total_selling_xlm")),
            total_buying_xlm: currency(row.get("total_buying_xlm")),
            net_pnl_xlm: currency(row.get("net_pnl_xlm")),
            time_on_chain_days: count(row.get("time_on_chain_days")),
            first_txn_time: self.timestamp(row, "first_txn_time"),
            last_txn_time: self.timestamp(row, "last_txn_time"),
            last_transaction_details: last_tx,
            last_nonxlm_transaction_details: last_nonxlm_tx,
            last_xlm_transaction_details: last_xlm_tx,
            top_largest_nonxlm: largest_nonxlm,
            top_largest_xlm: largest_xlm,
            top_nonxlm_sent: nonxlm_sent,
            top_nonxlm_received: nonxlm_received,
            top_nonxlm_selling: nonxlm_selling,
            top_nonxlm_buying: nonxlm_buying,
            unique_wallet_interactions: count(row.get("unique_wallet_interactions")),
            top_interaction_wallet: optional_text(row.get("top_interaction_wallet")),
            top_interaction_count: count(row.get("top_interaction_count")),
            most_active_day: self.timestamp(row, "most_active_day"),
            most_active_day_count: count(row.get("most_active_day_count")),
            most_active_month: self.month(row, "most_active_month"),
            most_active_month_count: count(row.get("most_active_month_count")),
            top_5_transactions_by_category: text(row.get("top_5_transactions_by_category")),
            token_balance: currency(row.get("token_balance")),
            starting_balance: currency(row.get("starting_balance")),
            balance_diff: currency(row.get("balance_diff")),
            ..WalletSummary::empty(account.clone())
        }
    }

    /// Typed timestamp for a declared field; `None` when undeclared, absent or unparseable.
    fn timestamp(&self, row: &RawSummaryRow, field: &str) -> Option<Timestamp> {
        let kind = self.kind_of(field)?;
        let parsed = row.get(field).and_then(value_as_datetime)?;
        match kind {
            FieldKind::Timestamp => Some(parsed),
            FieldKind::Date => parsed
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc()),
            FieldKind::Month => None,
        }
    }

    fn month(&self, row: &RawSummaryRow, field: &str) -> String {
        let value = match row.get(field) {
            Some(value) if !is_falsy(value) => value,
            _ => return String::new(),
        };
        match (self.kind_of(field), value) {
            (Some(FieldKind::Month), Value::String(s)) if is_year_month(s) => s.clone(),
            (Some(FieldKind::Month), Value::String(s)) => parse_datetime(s)
                .map(|dt| dt.format("%Y-%m").to_string())
                .unwrap_or_else(|| s.clone()),
            (_, Value::String(s)) => s.clone(),
            (_, other) => other.to_string(),
        }
    }

    /// Assemble one "last transaction" breakdown from its prefixed flat fields.
    fn last_transaction(&self, row: &RawSummaryRow, prefix: &str) -> String {
        let source = |suffix: &str| row.get(&format!("{}_{}", prefix, suffix)).and_then(truthy);
        let timestamp_field = format!("{}_timestamp", prefix);

        let mut details = Map::new();
        details.insert("id".into(), source("id").unwrap_or(Value::Null));
        details.insert("op_type_int".into(), source("type_int").unwrap_or(Value::Null));
        details.insert("op_type_str".into(), source("type_str").unwrap_or(Value::Null));
        details.insert(
            "timestamp".into(),
            source("timestamp")
                .map(|value| self.nested_timestamp(&timestamp_field, value))
                .unwrap_or(Value::Null),
        );
        details.insert("asset_code".into(), source("asset_code").unwrap_or(Value::Null));
        details.insert(
            "amount".into(),
            source("amount")
                .map(|value| round_json(&value, CURRENCY_DECIMALS))
                .unwrap_or(Value::Null),
        );
        Value::Object(details).to_string()
    }

    /// Canonical `YYYY-MM-DDTHH:MM:SS.mmmZ` text for a declared timestamp; other values untouched.
    fn nested_timestamp(&self, field: &str, value: Value) -> Value {
        match self.kind_of(field) {
            Some(FieldKind::Timestamp | FieldKind::Date) => match value_as_datetime(&value) {
                Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => value,
            },
            _ => value,
        }
    }
}

// ============================================================================
// ROUNDING
// ============================================================================

/// Round half away from zero to `decimals` places. Non-finite values pass through.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    if !scaled.is_finite() || scaled.abs() >= MAX_EXACT_INTEGER {
        return value;
    }
    let rounded = scaled.round() / factor;
    // Small negatives collapse to -0.0; store them as plain zero.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Round a JSON number; every other JSON value is returned unchanged.
pub fn round_json(value: &Value, decimals: u32) -> Value {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => value.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) => number_value(round_to(f, decimals)),
            None => value.clone(),
        },
        other => other.clone(),
    }
}

/// JSON number for `f`, written without a fractional part when it has none.
fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

// ============================================================================
// VALUE COERCION
// ============================================================================

/// Parse a calendar date-time.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff][ UTC]` (also with a `T`
/// separator) and bare `YYYY-MM-DD`. Zone-less values are taken as UTC.
pub fn parse_datetime(text: &str) -> Option<Timestamp> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = text.strip_suffix(" UTC").unwrap_or(text);
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(ndt.and_utc());
        }
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

fn value_as_datetime(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(s) => parse_datetime(s),
        _ => None,
    }
}

fn is_year_month(text: &str) -> bool {
    text.len() == 7 && NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d").is_ok()
}

/// JavaScript-style falsiness: null, false, zero, empty string.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn truthy(value: &Value) -> Option<Value> {
    (!is_falsy(value)).then(|| value.clone())
}

fn real(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

fn currency(value: Option<&Value>) -> f64 {
    round_to(real(value), CURRENCY_DECIMALS)
}

/// Integer count from a JSON number or a numeric string (INT64 arrives as text).
fn count(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| real(value).trunc() as i64),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .unwrap_or_else(|_| real(value).trunc() as i64),
        _ => 0,
    }
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    match value.and_then(truthy)? {
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn text(value: Option<&Value>) -> String {
    optional_text(value).unwrap_or_default()
}

/// Serialize a "top-N" list, rounding `amount_field` in every entry.
fn top_list_text(value: Option<&Value>, amount_field: &str) -> String {
    let list = match value {
        None => return EMPTY_ARRAY_TEXT.to_string(),
        Some(v) if is_falsy(v) => return EMPTY_ARRAY_TEXT.to_string(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(parsed) => parsed,
            Err(_) => return text.clone(),
        },
        Some(v) => v.clone(),
    };
    match list {
        Value::Array(entries) => Value::Array(
            entries
                .into_iter()
                .map(|entry| round_entry(entry, amount_field))
                .collect(),
        )
        .to_string(),
        Value::Null => EMPTY_ARRAY_TEXT.to_string(),
        other => other.to_string(),
    }
}

fn round_entry(entry: Value, amount_field: &str) -> Value {
    match entry {
        Value::Object(mut fields) => {
            if let Some(amount) = fields.get_mut(amount_field) {
                *amount = round_json(amount, TOP_N_DECIMALS);
            }
            Value::Object(fields)
        }
        other => other,
    }
}

// =============================================================================
// TESTS
// =============================================================================

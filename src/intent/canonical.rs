//! Canonical encoding and hashing of order intents
//!
//! The canonical form is compact JSON over a fixed field set with keys in sorted
//! order. Decimals are normalized and timestamps are fixed-precision RFC 3339 so the
//! bytes are identical across processes and storage round-trips.

use super::OrderIntent;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Fields covered by the canonical hash
pub const CANONICAL_FIELDS: [&str; 14] = [
    "confidence",
    "created_at",
    "expires_at",
    "features_ref",
    "intent_id",
    "mode",
    "order_type",
    "price",
    "rationale",
    "side",
    "size",
    "strategy",
    "symbol",
    "time_in_force",
];

pub(crate) fn decimal_str(value: Decimal) -> String {
    value.normalize().to_string()
}

pub(crate) fn timestamp_str(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serialize the immutable fields of an intent
pub fn canonicalize(intent: &OrderIntent) -> Vec<u8> {
    let mut fields: BTreeMap<&'static str, Value> = BTreeMap::new();
    fields.insert("confidence", Value::String(decimal_str(intent.confidence)));
    fields.insert("created_at", Value::String(timestamp_str(intent.created_at)));
    fields.insert("expires_at", Value::String(timestamp_str(intent.expires_at)));
    fields.insert(
        "features_ref",
        intent
            .features_ref
            .as_ref()
            .map(|r| Value::String(r.clone()))
            .unwrap_or(Value::Null),
    );
    fields.insert("intent_id", Value::String(intent.intent_id.clone()));
    fields.insert("mode", Value::String(intent.mode.as_str().to_string()));
    fields.insert(
        "order_type",
        Value::String(intent.order_type.as_str().to_string()),
    );
    fields.insert("price", Value::String(decimal_str(intent.price)));
    fields.insert("rationale", Value::String(intent.rationale.clone()));
    fields.insert("side", Value::String(intent.side.as_str().to_string()));
    fields.insert("size", Value::String(decimal_str(intent.size)));
    fields.insert("strategy", Value::String(intent.strategy_name.clone()));
    fields.insert("symbol", Value::String(intent.symbol.clone()));
    fields.insert(
        "time_in_force",
        Value::String(intent.time_in_force.as_str().to_string()),
    );

    let body = fields
        .into_iter()
        .map(|(key, value)| format!("{}:{}", Value::from(key), value))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{}}}", body).into_bytes()
}

/// SHA-256 over the canonical bytes, lowercase hex
pub fn hash(intent: &OrderIntent) -> String {
    let digest = Sha256::digest(canonicalize(intent));
    hex::encode(digest)
}

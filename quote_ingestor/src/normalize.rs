//! Source normalization: heterogeneous upstream payloads → [`RawQuote`]s.
//!
//! Upstream responses are tree-shaped JSON with one list of item-records
//! buried somewhere inside, under vendor- and casing-inconsistent keys. This
//! module performs duck-typed field lookup over ordered candidate key lists
//! rather than committing to any single schema.
//!
//! The magnitude heuristic ([`UnitHeuristic`]) is a best-effort correction
//! for endpoints that report VND prices in truncated units; it is lossy and
//! approximate, not an authoritative unit contract, and therefore stays
//! configurable.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::RawQuote;
use crate::timeparse::parse_datetime_value;

/// Keys tried, in order, when extracting an item's timestamp.
const TIMESTAMP_KEYS: &[&str] = &[
    "createdAt",
    "lastUpdated",
    "Date",
    "CreatedAt",
    "Time",
    "timestamp",
];

/// Keys tried, in order, when resolving the series label.
const LABEL_KEYS: &[&str] = &["name", "gold_type", "brand"];

/// Keys tried, in order, for the buy-side price.
const BUY_KEYS: &[&str] = &["buyPrice", "BuyPrice", "GiaMua", "Buy", "mua"];

/// Keys tried, in order, for the sell-side price.
const SELL_KEYS: &[&str] = &["sellPrice", "SellPrice", "GiaBan", "Sell", "ban"];

/// Key under which CafeF wraps its history list.
const HISTORY_KEY: &str = "goldPriceWorldHistories";

/// Magnitude-normalization rule for one series label.
///
/// When an item's label equals `label` and its resolved buy price is below
/// `threshold`, both prices are multiplied by `factor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitHeuristic {
    /// Series label the rule applies to (exact match on the upstream label).
    pub label: String,
    /// Values strictly below this trigger the correction.
    pub threshold: f64,
    /// Multiplier applied on trigger.
    pub factor: f64,
}

impl UnitHeuristic {
    /// The original SJC rule: quotes below 200k VND are in millions.
    pub fn sjc_default() -> Self {
        Self {
            label: "SJC".to_string(),
            threshold: 200_000.0,
            factor: 1_000_000.0,
        }
    }
}

/// Options controlling normalization.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Magnitude rules, tried in order; first label match wins.
    pub heuristics: Vec<UnitHeuristic>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            heuristics: vec![UnitHeuristic::sjc_default()],
        }
    }
}

/// Normalize a batch of upstream API responses into flat quote records.
///
/// Items whose numeric fields are *all* absent are dropped; remaining absent
/// numerics default to 0.0. Unparseable or missing timestamps fall back to
/// "now" (naive UTC) at normalization time.
pub fn normalize_payloads(payloads: &[Value], opts: &NormalizeOptions) -> Vec<RawQuote> {
    let mut out = Vec::new();

    for payload in payloads {
        let Some(items) = item_list(payload) else {
            continue;
        };
        tracing::debug!(count = items.len(), "found item list in response");

        for item in items {
            let Value::Object(_) = item else { continue };

            let ts = TIMESTAMP_KEYS
                .iter()
                .filter_map(|k| item.get(*k))
                .find_map(parse_datetime_value)
                .unwrap_or_else(|| Utc::now().naive_utc());

            let label = resolve_label(item);
            let mut buy = resolve_number(item, BUY_KEYS);
            let mut sell = resolve_number(item, SELL_KEYS);

            // No numeric signal at all: drop rather than store zeros.
            if buy.is_none() && sell.is_none() {
                continue;
            }

            if let Some(rule) = opts.heuristics.iter().find(|h| h.label == label) {
                if let Some(b) = buy {
                    if b < rule.threshold {
                        buy = Some(b * rule.factor);
                        sell = sell.map(|s| s * rule.factor);
                    }
                }
            }

            out.push(RawQuote {
                date: ts.format("%Y-%m-%d").to_string(),
                time: ts.format("%H:%M:%S").to_string(),
                timestamp: ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
                gold_type: label,
                buy_price: buy.unwrap_or(0.0),
                sell_price: sell.unwrap_or(0.0),
            });
        }
    }

    out
}

/// Locate the list of item-records inside one response tree.
///
/// Priority: `Data.goldPriceWorldHistories`, then a top-level
/// `goldPriceWorldHistories`, then the first field whose value is a
/// non-empty array of objects.
fn item_list(payload: &Value) -> Option<&Vec<Value>> {
    let obj = payload.as_object()?;

    if let Some(Value::Object(data)) = obj.get("Data") {
        if let Some(Value::Array(items)) = data.get(HISTORY_KEY) {
            if !items.is_empty() {
                return Some(items);
            }
        }
    }
    if let Some(Value::Array(items)) = obj.get(HISTORY_KEY) {
        if !items.is_empty() {
            return Some(items);
        }
    }
    obj.values().find_map(|v| match v {
        Value::Array(items) if items.first().is_some_and(Value::is_object) => Some(items),
        _ => None,
    })
}

fn resolve_label(item: &Value) -> String {
    LABEL_KEYS
        .iter()
        .filter_map(|k| item.get(*k))
        .find_map(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

/// Resolve a numeric field by trying candidate keys in order.
///
/// Accepts JSON numbers and numeric strings; unparseable values are treated
/// as absent, never coerced to zero.
fn resolve_number(item: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|k| item.get(*k)).find_map(|v| {
        let n = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        n.filter(|x| x.is_finite())
    })
}

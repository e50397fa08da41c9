//! Insertable/Queryable row structs shared by the importer, the gap filler,
//! and the retention pruner.
//!
//! All three derive `Serialize` so the pruner can archive evicted rows to
//! CSV with the column names as the header, in column order.

use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{usd_vnd, vn_gold, world_gold};

/// One `world_gold` row (daily OHLCV).
#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Serialize)]
#[diesel(table_name = world_gold)]
pub struct WorldGoldRow {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Opening price.
    pub open: Option<f64>,
    /// Daily high.
    pub high: Option<f64>,
    /// Daily low.
    pub low: Option<f64>,
    /// Closing price.
    pub close: Option<f64>,
    /// Traded volume.
    pub volume: Option<f64>,
    /// Provenance label; `+ffill` suffix marks synthetic rows.
    pub source: Option<String>,
}

/// One `usd_vnd` row (daily FX rate).
#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Serialize)]
#[diesel(table_name = usd_vnd)]
pub struct UsdVndRow {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// VND per USD.
    pub rate: Option<f64>,
    /// Provenance label; `+ffill` suffix marks synthetic rows.
    pub source: Option<String>,
}

/// One `vn_gold` row (local quote observation).
#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Serialize)]
#[diesel(table_name = vn_gold)]
pub struct VnGoldRow {
    /// Event timestamp, ISO without offset; unique per brand.
    pub ts: String,
    /// Calendar date, `YYYY-MM-DD`, derived from `ts`.
    pub date: String,
    /// Normalized brand code (SJC, PNJ, ...).
    pub brand: String,
    /// Buy-side price.
    pub buy_price: Option<f64>,
    /// Sell-side price.
    pub sell_price: Option<f64>,
    /// Provenance label; `+ffill` suffix marks synthetic rows.
    pub source: Option<String>,
}

//! Upsert importer: canonical quote records → SQLite, plus the coarse
//! calendar-cutoff trim path.
//!
//! Canonicalization rules:
//! - `brand` is normalized from the free-text `gold_type` label;
//! - `ts` prefers the ISO `timestamp` (offset stripped, stable
//!   `%Y-%m-%dT%H:%M:%S` form for the primary key), falling back to
//!   `date`T`time`, then to "now";
//! - numeric fields coerce number-or-numeric-string to f64, with
//!   absent/empty/garbage becoming NULL, never zero.
//!
//! Re-ingesting the same `(brand, ts)` overwrites prices and provenance
//! only; the key itself is never rewritten.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use quote_ingestor::models::DailyBar;
use quote_ingestor::timeparse::parse_iso_naive;

use crate::models::VnGoldRow;
use crate::schema::{usd_vnd, vn_gold, world_gold};

/// Errors raised while locating or parsing an importer input file.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The expected intermediate file does not exist.
    #[error("missing input file: {0}")]
    MissingInput(PathBuf),

    /// The file exists but could not be read.
    #[error("failed to read {path}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a JSON list of quote records.
    #[error("malformed quote JSON in {path}")]
    Json {
        /// Offending path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// One loosely-typed incoming quote record (wire JSON shape).
///
/// Every field is optional and prices accept numbers or numeric strings;
/// unknown extra fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteIn {
    /// Calendar day, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    /// Time of day, `HH:MM:SS`.
    #[serde(default)]
    pub time: Option<String>,
    /// Full ISO-8601 timestamp.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Free-text series label.
    #[serde(default)]
    pub gold_type: Option<String>,
    /// Buy-side price, number or numeric string.
    #[serde(default)]
    pub buy_price: Option<Value>,
    /// Sell-side price, number or numeric string.
    #[serde(default)]
    pub sell_price: Option<Value>,
}

/// Load a wire-shape JSON file (root must be a list of records).
pub fn load_quotes_json(path: &Path) -> Result<Vec<QuoteIn>, ImportError> {
    if !path.exists() {
        return Err(ImportError::MissingInput(path.to_path_buf()));
    }
    let body = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|source| ImportError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Normalize a free-text series label to a stable brand code.
///
/// Known brands match by substring; the Vietnamese "nhẫn" (ring gold)
/// variants collapse to NHAN; anything else is upper-cased and capped at 24
/// chars to keep odd upstream strings out of the key space.
pub fn norm_brand(gold_type: Option<&str>) -> String {
    let Some(raw) = gold_type else {
        return "UNKNOWN".to_string();
    };
    let s = raw.trim().to_uppercase();
    if s.is_empty() {
        return "UNKNOWN".to_string();
    }
    if s.contains("SJC") {
        return "SJC".to_string();
    }
    if s.contains("PNJ") {
        return "PNJ".to_string();
    }
    if s.contains("DOJI") {
        return "DOJI".to_string();
    }
    if s.contains("NHẪN") || s.contains("NHAN") {
        return "NHAN".to_string();
    }
    s.chars().take(24).collect()
}

/// Derive the primary-key timestamp for one record.
pub fn coalesce_ts(item: &QuoteIn) -> String {
    if let Some(ts) = item.timestamp.as_deref() {
        if let Some(dt) = parse_iso_naive(ts) {
            return dt.format("%Y-%m-%dT%H:%M:%S").to_string();
        }
    }
    let date = item.date.as_deref().map(str::trim).unwrap_or("");
    if !date.is_empty() {
        let time = match item.time.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => "00:00:00",
        };
        return format!("{date}T{time}");
    }
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Derive the calendar date for one record, consistent with its timestamp.
pub fn coalesce_date(item: &QuoteIn) -> String {
    if let Some(d) = item.date.as_deref().map(str::trim) {
        if !d.is_empty() {
            return d.to_string();
        }
    }
    if let Some(ts) = item.timestamp.as_deref() {
        if let Some(dt) = parse_iso_naive(ts) {
            return dt.format("%Y-%m-%d").to_string();
        }
    }
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Coerce a JSON value to f64: numbers and numeric strings pass,
/// absent/empty/garbage become `None`, never zero.
pub fn to_float(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    }
}

/// Upsert a batch of quote records under one provenance label.
///
/// Conflict-free on `(brand, ts)`: insert on absence, overwrite date,
/// prices and source on conflict. The whole batch runs in one immediate
/// transaction. Returns the number of rows affected.
pub fn upsert_quotes(
    conn: &mut SqliteConnection,
    items: &[QuoteIn],
    source_label: &str,
) -> anyhow::Result<usize> {
    let rows: Vec<VnGoldRow> = items
        .iter()
        .map(|it| VnGoldRow {
            ts: coalesce_ts(it),
            date: coalesce_date(it),
            brand: norm_brand(it.gold_type.as_deref()),
            buy_price: to_float(it.buy_price.as_ref()),
            sell_price: to_float(it.sell_price.as_ref()),
            source: Some(source_label.to_string()),
        })
        .collect();

    conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let mut affected = 0;
        for row in &rows {
            affected += diesel::insert_into(vn_gold::table)
                .values(row)
                .on_conflict((vn_gold::brand, vn_gold::ts))
                .do_update()
                .set((
                    vn_gold::date.eq(excluded(vn_gold::date)),
                    vn_gold::buy_price.eq(excluded(vn_gold::buy_price)),
                    vn_gold::sell_price.eq(excluded(vn_gold::sell_price)),
                    vn_gold::source.eq(excluded(vn_gold::source)),
                ))
                .execute(conn)?;
        }
        Ok(affected)
    })
}

/// Upsert daily world-gold OHLCV bars (conflict on `date`).
pub fn upsert_world(
    conn: &mut SqliteConnection,
    bars: &[DailyBar],
    source_label: &str,
) -> anyhow::Result<usize> {
    conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let mut affected = 0;
        for bar in bars {
            affected += diesel::insert_into(world_gold::table)
                .values((
                    world_gold::date.eq(bar.date.format("%Y-%m-%d").to_string()),
                    world_gold::open.eq(bar.open),
                    world_gold::high.eq(bar.high),
                    world_gold::low.eq(bar.low),
                    world_gold::close.eq(bar.close),
                    world_gold::volume.eq(bar.volume),
                    world_gold::source.eq(Some(source_label.to_string())),
                ))
                .on_conflict(world_gold::date)
                .do_update()
                .set((
                    world_gold::open.eq(excluded(world_gold::open)),
                    world_gold::high.eq(excluded(world_gold::high)),
                    world_gold::low.eq(excluded(world_gold::low)),
                    world_gold::close.eq(excluded(world_gold::close)),
                    world_gold::volume.eq(excluded(world_gold::volume)),
                    world_gold::source.eq(excluded(world_gold::source)),
                ))
                .execute(conn)?;
        }
        Ok(affected)
    })
}

/// Upsert daily FX rates; the bar's close becomes the rate (conflict on `date`).
pub fn upsert_fx(
    conn: &mut SqliteConnection,
    bars: &[DailyBar],
    source_label: &str,
) -> anyhow::Result<usize> {
    conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let mut affected = 0;
        for bar in bars {
            affected += diesel::insert_into(usd_vnd::table)
                .values((
                    usd_vnd::date.eq(bar.date.format("%Y-%m-%d").to_string()),
                    usd_vnd::rate.eq(bar.close),
                    usd_vnd::source.eq(Some(source_label.to_string())),
                ))
                .on_conflict(usd_vnd::date)
                .do_update()
                .set((
                    usd_vnd::rate.eq(excluded(usd_vnd::rate)),
                    usd_vnd::source.eq(excluded(usd_vnd::source)),
                ))
                .execute(conn)?;
        }
        Ok(affected)
    })
}

/// Coarse trim: delete all quote rows with `date < cutoff`.
///
/// This is the fixed-calendar-cutoff eviction path; it neither archives nor
/// counts distinct dates. The keep-last-K path lives in
/// [`crate::retention`]. Returns rows deleted.
pub fn trim_quotes_before(conn: &mut SqliteConnection, cutoff: NaiveDate) -> anyhow::Result<usize> {
    let cutoff = cutoff.format("%Y-%m-%d").to_string();
    let n = diesel::delete(vn_gold::table.filter(vn_gold::date.lt(cutoff))).execute(conn)?;
    Ok(n)
}

/// Coarse trim for `world_gold`; see [`trim_quotes_before`].
pub fn trim_world_before(conn: &mut SqliteConnection, cutoff: NaiveDate) -> anyhow::Result<usize> {
    let cutoff = cutoff.format("%Y-%m-%d").to_string();
    let n = diesel::delete(world_gold::table.filter(world_gold::date.lt(cutoff))).execute(conn)?;
    Ok(n)
}

/// Coarse trim for `usd_vnd`; see [`trim_quotes_before`].
pub fn trim_fx_before(conn: &mut SqliteConnection, cutoff: NaiveDate) -> anyhow::Result<usize> {
    let cutoff = cutoff.format("%Y-%m-%d").to_string();
    let n = diesel::delete(usd_vnd::table.filter(usd_vnd::date.lt(cutoff))).execute(conn)?;
    Ok(n)
}

//! Canonical in-memory representations of upstream observations.
//!
//! [`RawQuote`] is the standard output of the normalizer and the wire (JSON)
//! shape consumed by the store's importer, regardless of which upstream
//! endpoint produced it. [`DailyBar`] is the daily OHLCV analogue for the
//! chart-style sources.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::timeparse::parse_iso_naive;

/// A single normalized quote observation.
///
/// Field names double as the wire JSON keys; extra upstream fields are
/// dropped during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuote {
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    /// Time of day, `HH:MM:SS`.
    pub time: String,
    /// Full event timestamp, ISO-8601 without offset (naive UTC).
    pub timestamp: String,
    /// Series label as reported upstream (e.g. "SJC", "PNJ").
    pub gold_type: String,
    /// Buy-side price. Absent upstream values become 0.0 at this stage.
    pub buy_price: f64,
    /// Sell-side price. Absent upstream values become 0.0 at this stage.
    pub sell_price: f64,
}

impl RawQuote {
    /// Parse the record's ISO timestamp back into a naive UTC instant.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_iso_naive(&self.timestamp)
    }
}

/// One daily OHLCV observation from a chart-style source.
///
/// Missing fields stay `None`; coercing absent values to zero would poison
/// the store's carry-forward fill.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    /// Calendar day (UTC).
    pub date: NaiveDate,
    /// Opening price.
    pub open: Option<f64>,
    /// Highest price of the day.
    pub high: Option<f64>,
    /// Lowest price of the day.
    pub low: Option<f64>,
    /// Closing price.
    pub close: Option<f64>,
    /// Traded volume.
    pub volume: Option<f64>,
}

impl DailyBar {
    /// True when every numeric field is absent; such bars carry no signal.
    pub fn is_empty(&self) -> bool {
        self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.close.is_none()
            && self.volume.is_none()
    }
}

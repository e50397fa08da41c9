//! Daily OHLCV bars from the Yahoo Finance v8 chart endpoint.
//!
//! Replaces the original yfinance pull for the world-gold (GC=F) and
//! USD/VND (VND=X) series. One request per symbol, `interval=1d`, lookback
//! window supplied by the caller.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, header};
use serde::Deserialize;

use crate::models::DailyBar;
use crate::providers::{ProviderError, Source};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize, Debug)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Deserialize, Debug, Default)]
struct QuoteBlock {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

/// Chart source for one symbol over a trailing lookback window.
pub struct YahooChart {
    client: Client,
    symbol: String,
    lookback_days: u32,
}

impl YahooChart {
    /// Build a chart source for `symbol` (e.g. "GC=F", "VND=X").
    pub fn new(symbol: impl Into<String>, lookback_days: u32) -> Result<Self, ProviderError> {
        let mut headers = header::HeaderMap::new();
        // Yahoo rejects the default reqwest UA.
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101"),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            symbol: symbol.into(),
            lookback_days,
        })
    }

    fn bars_from(result: ChartResult) -> Vec<DailyBar> {
        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

        let pick = |col: &Option<Vec<Option<f64>>>, i: usize| -> Option<f64> {
            col.as_ref()
                .and_then(|v| v.get(i).copied().flatten())
                .filter(|x| x.is_finite())
        };

        timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                let date = DateTime::<Utc>::from_timestamp(*ts, 0)?.date_naive();
                let bar = DailyBar {
                    date,
                    open: pick(&quote.open, i),
                    high: pick(&quote.high, i),
                    low: pick(&quote.low, i),
                    close: pick(&quote.close, i),
                    volume: pick(&quote.volume, i),
                };
                (!bar.is_empty()).then_some(bar)
            })
            .collect()
    }
}

#[async_trait]
impl Source for YahooChart {
    type Output = Vec<DailyBar>;

    async fn fetch(&self) -> Result<Self::Output, ProviderError> {
        let now = Utc::now();
        let period1 = (now - Duration::days(i64::from(self.lookback_days))).timestamp();
        // End is exclusive upstream; pad one day to include today.
        let period2 = (now + Duration::days(1)).timestamp();

        let url = format!("{BASE_URL}/{}", self.symbol);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Payload(format!(
                "{url}: HTTP {status}: {body}"
            )));
        }

        let envelope = resp.json::<ChartEnvelope>().await?;
        if let Some(err) = envelope.chart.error {
            if !err.is_null() {
                return Err(ProviderError::Payload(format!("{}: {err}", self.symbol)));
            }
        }
        let result = envelope
            .chart
            .result
            .and_then(|mut r| (!r.is_empty()).then(|| r.remove(0)))
            .ok_or_else(|| ProviderError::Empty(self.symbol.clone()))?;

        let bars = Self::bars_from(result);
        tracing::info!(symbol = %self.symbol, bars = bars.len(), "chart fetch finished");
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn bars_skip_all_null_rows_and_nonfinite_values() {
        let result: ChartResult = serde_json::from_value(serde_json::json!({
            "timestamp": [1710028800, 1710115200, 1710201600],
            "indicators": { "quote": [{
                "open":   [2150.0, null, null],
                "high":   [2160.0, null, null],
                "low":    [2140.0, null, null],
                "close":  [2155.5, null, 2158.0],
                "volume": [1000.0, null, null]
            }]}
        }))
        .unwrap();

        let bars = YahooChart::bars_from(result);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(bars[0].close, Some(2155.5));
        // Row with only a close survives with the rest absent.
        assert_eq!(bars[1].open, None);
        assert_eq!(bars[1].close, Some(2158.0));
    }

    #[test]
    fn missing_quote_block_yields_no_bars() {
        let result: ChartResult = serde_json::from_value(serde_json::json!({
            "timestamp": [1710028800],
            "indicators": { "quote": [] }
        }))
        .unwrap();
        assert!(YahooChart::bars_from(result).is_empty());
    }
}

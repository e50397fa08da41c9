//! CafeF gold-price Ajax endpoints.
//!
//! These endpoints are inconsistent: some answer clean JSON (array or
//! object), some wrap JSON inside HTML/JS. Each endpoint is tried in turn;
//! failures are logged and skipped so one bad endpoint never sinks the
//! crawl. The raw values are handed to the normalizer untouched.

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, header};
use serde_json::Value;

use crate::providers::{ProviderError, Source};

const HISTORY_URL: &str = "https://cafef.vn/du-lieu/Ajax/ajaxgoldpricehistory.ashx";
const RING_URL: &str = "https://cafef.vn/du-lieu/Ajax/AjaxGoldPriceRing.ashx";
const SPOT_URL: &str = "https://cafef.vn/du-lieu/Ajax/ajaxgoldprice.ashx";

/// JSON-blob patterns tried, in order, against non-JSON bodies.
const BLOB_PATTERNS: &[&str] = &[
    r"(?s)data\s*[:=]\s*(\[.*?\])",
    r"(?s)result\s*[:=]\s*(\[.*?\])",
    r"(?s)(\[.*?\])",
    r"(?s)(\{.*?\})",
];

fn default_endpoints() -> Vec<String> {
    let mut urls = Vec::new();
    for window in ["1m", "3m", "6m", "1y", "2y"] {
        urls.push(format!("{HISTORY_URL}?index={window}"));
    }
    for window in ["1m", "3m", "6m", "1y", "2y"] {
        urls.push(format!("{RING_URL}?time={window}&zone=11"));
    }
    for index in ["11", "12"] {
        urls.push(format!("{SPOT_URL}?index={index}"));
    }
    urls
}

fn default_headers() -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_static(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        ),
    );
    headers.insert(
        header::REFERER,
        header::HeaderValue::from_static(
            "https://cafef.vn/du-lieu/gia-vang-hom-nay/trong-nuoc.chn",
        ),
    );
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static("vi-VN,vi;q=0.9,en;q=0.8"),
    );
    headers.insert(
        "X-Requested-With",
        header::HeaderValue::from_static("XMLHttpRequest"),
    );
    headers
}

/// Crawler over the known CafeF gold-price endpoints.
pub struct CafefSource {
    client: Client,
    endpoints: Vec<String>,
}

impl CafefSource {
    /// Build a source over the default endpoint list.
    pub fn new() -> Result<Self, ProviderError> {
        let client = Client::builder()
            .default_headers(default_headers())
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            endpoints: default_endpoints(),
        })
    }

    /// Build a source over an explicit endpoint list (tests, config override).
    pub fn with_endpoints(endpoints: Vec<String>) -> Result<Self, ProviderError> {
        let mut src = Self::new()?;
        src.endpoints = endpoints;
        Ok(src)
    }

    async fn fetch_endpoint(&self, url: &str, all: &mut Vec<Value>) -> bool {
        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(%url, error = %e, "request failed");
                return false;
            }
        };
        if !resp.status().is_success() {
            tracing::warn!(%url, status = %resp.status(), "non-success response");
            return false;
        }
        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(%url, error = %e, "failed to read body");
                return false;
            }
        };

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(items)) if !items.is_empty() => {
                tracing::info!(%url, count = items.len(), "endpoint returned a JSON list");
                all.extend(items);
                true
            }
            Ok(v @ Value::Object(_)) => {
                tracing::info!(%url, "endpoint returned a JSON object");
                all.push(v);
                true
            }
            Ok(_) => {
                tracing::warn!(%url, "empty or unusable JSON");
                false
            }
            Err(_) => match extract_embedded_json(&body) {
                Some(Value::Array(items)) => {
                    tracing::info!(%url, count = items.len(), "extracted embedded JSON list");
                    all.extend(items);
                    true
                }
                Some(v) => {
                    tracing::info!(%url, "extracted embedded JSON object");
                    all.push(v);
                    true
                }
                None => {
                    tracing::warn!(%url, "could not extract JSON from body");
                    false
                }
            },
        }
    }
}

#[async_trait]
impl Source for CafefSource {
    type Output = Vec<Value>;

    /// Fetch every endpoint sequentially, accumulating whatever parses.
    ///
    /// Per-endpoint failures are logged and skipped; the result may be empty,
    /// which the orchestrator treats as a failed crawl.
    async fn fetch(&self) -> Result<Self::Output, ProviderError> {
        let mut all = Vec::new();
        let mut ok = 0usize;
        for url in &self.endpoints {
            if self.fetch_endpoint(url, &mut all).await {
                ok += 1;
            }
        }
        tracing::info!(
            succeeded = ok,
            total = self.endpoints.len(),
            records = all.len(),
            "cafef crawl finished"
        );
        Ok(all)
    }
}

/// Pull the first parseable JSON blob out of an HTML/JS body.
fn extract_embedded_json(content: &str) -> Option<Value> {
    if content.len() < 50 {
        return None;
    }
    for pattern in BLOB_PATTERNS {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        for caps in re.captures_iter(content) {
            let Some(m) = caps.get(1) else { continue };
            match serde_json::from_str::<Value>(m.as_str()) {
                Ok(Value::Array(items)) if !items.is_empty() => {
                    return Some(Value::Array(items));
                }
                Ok(v @ Value::Object(_)) if v.as_object().is_some_and(|o| !o.is_empty()) => {
                    return Some(v);
                }
                _ => continue,
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_assigned_array_blob() {
        let body = format!(
            "<script>var data = [{}];</script>{}",
            r#"{"name":"SJC","buyPrice":180.5}"#,
            " ".repeat(50)
        );
        let got = extract_embedded_json(&body).unwrap();
        assert_eq!(got.as_array().unwrap().len(), 1);
    }

    #[test]
    fn tiny_or_jsonless_bodies_yield_nothing() {
        assert!(extract_embedded_json("ok").is_none());
        let html = format!("<html><body>no json here at all</body></html>{}", " ".repeat(50));
        assert!(extract_embedded_json(&html).is_none());
    }

    #[test]
    fn default_endpoint_list_covers_all_windows() {
        let urls = default_endpoints();
        assert_eq!(urls.len(), 12);
        assert!(urls.iter().all(|u| u.starts_with("https://cafef.vn/")));
    }

    #[tokio::test]
    async fn unreachable_endpoints_yield_an_empty_crawl() {
        // Port 1 refuses immediately; every endpoint is skipped, the
        // crawl itself still succeeds with nothing collected.
        let source = CafefSource::with_endpoints(vec![
            "http://127.0.0.1:1/a".to_string(),
            "http://127.0.0.1:1/b".to_string(),
        ])
        .unwrap();

        let out = source.fetch().await.unwrap();
        assert!(out.is_empty());
    }
}

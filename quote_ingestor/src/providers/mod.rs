//! Provider abstraction for upstream quote sources.
//!
//! [`Source`] is the unified interface for pulling one upstream's payload.
//! The associated `Output` keeps the trait flexible: the CafeF source yields
//! raw JSON values for the normalizer, while the chart source yields typed
//! daily bars ready for the store.
//!
//! Sources are fetched sequentially by the orchestrator; a slow or failing
//! source delays but never aborts the others.

pub mod cafef;
pub mod yahoo;

use async_trait::async_trait;
use thiserror::Error;

pub use cafef::CafefSource;
pub use yahoo::YahooChart;

/// Errors that can occur within a [`Source`] implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream returned a response we could not make sense of.
    #[error("malformed payload: {0}")]
    Payload(String),

    /// The upstream answered but carried no usable data.
    #[error("empty payload from {0}")]
    Empty(String),
}

/// One upstream data source.
#[async_trait]
pub trait Source {
    /// What a successful fetch yields (raw JSON values, typed bars, ...).
    type Output;

    /// Fetch this source's payload, blocking until done or failed.
    async fn fetch(&self) -> Result<Self::Output, ProviderError>;
}

use thiserror::Error;

use crate::providers::ProviderError;

/// The unified error type for the `quote_ingestor` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// An error originating from an upstream data provider.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A generic I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failure.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failure.
    #[error("CSV error")]
    Csv(#[from] csv::Error),
}

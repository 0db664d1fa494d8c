use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum StockDataError {
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Data processing error: {0}")]
    DataProcessing(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StockDataError {
    /// Transient errors are worth retrying; everything else is surfaced as-is.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StockDataError::RateLimit(_) | StockDataError::Network(_) | StockDataError::Timeout(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StockDataError::RateLimit(_) => "rate_limit",
            StockDataError::Network(_) => "network",
            StockDataError::Timeout(_) => "timeout",
            StockDataError::InvalidSymbol(_) => "invalid_symbol",
            StockDataError::DataProcessing(_) => "data_processing",
            StockDataError::Export(_) => "export",
            StockDataError::UnknownProvider(_) => "unknown_provider",
            StockDataError::Config(_) => "config",
        }
    }
}

//! Core error types for the Huskly portfolio engine.

use huskly_market_data::MarketDataError;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the portfolio engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    /// A position carried an asset type outside the supported closed set.
    ///
    /// This is deliberately fatal: silently valuing an unknown position
    /// type at zero would corrupt portfolio totals undetectably.
    #[error("Unsupported position type: {0}")]
    UnsupportedPositionType(String),

    #[error("Input validation failed: {0}")]
    Validation(String),

    #[error("Store operation failed: {0}")]
    Store(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Whether the underlying cause is an auth rejection from upstream.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::MarketData(e) if e.is_unauthorized())
    }
}

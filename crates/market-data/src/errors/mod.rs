//! Error types for the market data crate.

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Every provider maps its transport and status failures into this enum so
/// callers can react uniformly. The only variant with special handling
/// upstream is [`Unauthorized`](Self::Unauthorized): the core layer evicts
/// its cached auth token when it sees one, so the next call re-acquires a
/// token.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider rejected the bearer token (HTTP 401).
    #[error("Unauthorized: {provider}")]
    Unauthorized {
        /// The provider that rejected the request
        provider: String,
    },

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The provider returned a non-success status or an in-band error.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message or status description
        message: String,
    },

    /// The provider responded 2xx but the payload failed schema validation.
    ///
    /// Treated by callers as a transient upstream failure, never as a
    /// crash deep inside the aggregation logic.
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        /// The provider whose response could not be parsed
        provider: String,
        /// Description of the validation failure
        message: String,
    },

    /// The requested symbol was not known to the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Whether this error is an auth rejection that should trigger token
    /// eviction.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

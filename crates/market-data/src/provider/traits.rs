//! Provider trait definitions.
//!
//! These traits are the seams between the domain layer and the upstream
//! APIs: the core services hold `Arc<dyn Trait>` collaborators and the
//! tests substitute mocks.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::MarketDataError;
use crate::models::{Asset, PricePoint, StockQuote};

use super::schwab::models::{AccountNumber, FrequencyType, SchwabAccount, SymbolQuote, Transaction};

/// Crypto market data source (CoinCap).
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    /// Fetch the full normalized asset list.
    ///
    /// The upstream endpoint is unparameterized; callers filter the result
    /// to the symbols they hold.
    async fn list_assets(&self) -> Result<Vec<Asset>, MarketDataError>;

    /// Fetch the price history for one asset id (e.g. "bitcoin"),
    /// covering the last `days` days, sorted ascending by timestamp.
    async fn price_history(
        &self,
        asset_id: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError>;
}

/// Brokerage trader + marketdata API (Schwab).
///
/// Every call except [`fetch_token`](Self::fetch_token) requires a bearer
/// token. A rejected token surfaces as
/// [`MarketDataError::Unauthorized`]; the caller owns token eviction.
#[async_trait]
pub trait BrokerageApi: Send + Sync {
    /// Acquire a bearer token from the external OAuth collaborator.
    async fn fetch_token(&self) -> Result<String, MarketDataError>;

    /// Fetch all accounts with their positions.
    async fn accounts(&self, token: &str) -> Result<Vec<SchwabAccount>, MarketDataError>;

    /// Fetch the plain account number to hash-value mapping.
    async fn account_numbers(&self, token: &str) -> Result<Vec<AccountNumber>, MarketDataError>;

    /// Fetch quotes for a set of symbols as one batched request.
    async fn quotes(
        &self,
        token: &str,
        symbols: &[String],
    ) -> Result<HashMap<String, SymbolQuote>, MarketDataError>;

    /// Fetch the candle history for one symbol, sorted ascending and
    /// de-duplicated by timestamp.
    async fn price_history(
        &self,
        token: &str,
        symbol: &str,
        days: u32,
        frequency: u32,
        frequency_type: FrequencyType,
    ) -> Result<Vec<PricePoint>, MarketDataError>;

    /// Fetch the transaction history for one account hash.
    async fn transactions(
        &self,
        token: &str,
        account_hash: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, MarketDataError>;
}

/// Best-effort secondary quote source, consulted for symbols the primary
/// batch did not cover (in practice: mutual funds).
#[async_trait]
pub trait FallbackQuoteProvider: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<StockQuote, MarketDataError>;
}

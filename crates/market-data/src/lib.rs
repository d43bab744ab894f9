//! Huskly Market Data Crate
//!
//! This crate provides the upstream-facing data layer for the Huskly
//! portfolio dashboard.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Crypto quotes and price history via the CoinCap REST API
//! - Equity/option quotes, accounts and price history via the Schwab
//!   trader and marketdata REST APIs (Bearer token auth)
//! - A best-effort Yahoo chart fallback (proxied) for mutual funds
//!
//! # Core Types
//!
//! - [`Asset`] - Normalized quote record (crypto or stock) with
//!   decimal-string numeric semantics
//! - [`StockQuote`] - Per-symbol last price / day change / display name
//! - [`PricePoint`] - One point of an ascending price history series
//! - [`MarketDataError`] - Error taxonomy shared by all providers
//!
//! Providers are consumed through the traits in [`provider`], so the
//! domain layer can be tested against mocks without touching the network.

pub mod errors;
pub mod models;
pub mod provider;

// Re-export all public types from models
pub use models::{Asset, AssetKind, PricePoint, StockQuote};

// Re-export provider types
pub use provider::coincap::{crypto_id, is_crypto_symbol, CoinCapProvider};
pub use provider::schwab::SchwabClient;
pub use provider::yahoo::YahooChartProvider;
pub use provider::{BrokerageApi, CryptoProvider, FallbackQuoteProvider};

// Re-export error type
pub use errors::MarketDataError;

//! Huskly Core - Portfolio aggregation and caching engine.
//!
//! This crate contains the domain logic of the Huskly dashboard:
//! the expiring cache over an injected key-value substrate, brokerage
//! account normalization, quote aggregation across crypto and stock
//! sources, uploaded portfolio handling, and persisted view preferences.
//! Upstream APIs are consumed through the provider traits defined in
//! `huskly-market-data`.

pub mod accounts;
pub mod auth;
pub mod cache;
pub mod constants;
pub mod errors;
pub mod holdings;
pub mod portfolios;
pub mod quotes;
pub mod settings;

// Re-export common types
pub use accounts::{AccountsService, ParsedPortfolio, ParsedPosition, PositionKind};
pub use cache::{ExpiringCache, KeyValueStore, MemoryStore};
pub use holdings::{
    Holding, HoldingRow, HoldingSource, HoldingsService, MergePolicy, SortDirection, SortField,
};
pub use portfolios::{PortfolioStore, UploadedPortfolio};
pub use quotes::QuoteService;
pub use settings::{PreferencesService, PreferencesServiceTrait, ViewPreferences};

// Re-export error types
pub use errors::Error;
pub use errors::Result;

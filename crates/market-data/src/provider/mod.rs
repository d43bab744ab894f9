//! Market data providers.
//!
//! Each submodule wraps one upstream REST API. The domain layer consumes
//! providers through the traits in [`traits`], never the concrete clients
//! directly.

pub mod coincap;
pub mod schwab;
pub mod traits;
pub mod yahoo;

pub use traits::{BrokerageApi, CryptoProvider, FallbackQuoteProvider};

//! Uploaded portfolio parsing, conversion and persistence.

use std::str::FromStr;
use std::sync::Arc;

use log::warn;
use rust_decimal::Decimal;

use crate::cache::KeyValueStore;
use crate::constants::PORTFOLIOS_STORE_KEY;
use crate::errors::{Error, Result};
use crate::holdings::{classify_symbol, Holding, HoldingSource};

use super::portfolios_model::UploadedPortfolio;

/// Parse one portfolio file.
///
/// Shape errors come from serde; an empty `Name` is rejected here because
/// the name is the portfolio's identity in the persisted list.
pub fn parse_portfolio(text: &str) -> Result<UploadedPortfolio> {
    let portfolio: UploadedPortfolio = serde_json::from_str(text)
        .map_err(|e| Error::Validation(format!("invalid portfolio format: {}", e)))?;
    if portfolio.name.trim().is_empty() {
        return Err(Error::Validation("portfolio has no name".to_string()));
    }
    Ok(portfolio)
}

/// Parse a batch of `(file_name, content)` pairs.
///
/// Each file stands alone: a bad file is logged and dropped, the rest of
/// the batch still loads.
pub fn parse_portfolio_batch(files: &[(String, String)]) -> Vec<UploadedPortfolio> {
    files
        .iter()
        .filter_map(|(file_name, content)| match parse_portfolio(content) {
            Ok(portfolio) => Some(portfolio),
            Err(e) => {
                warn!("error loading portfolio from {}: {}", file_name, e);
                None
            }
        })
        .collect()
}

/// Convert an uploaded portfolio to canonical holdings.
///
/// Entries with an empty symbol, a non-positive or unparseable share
/// count, or an unclassifiable symbol are skipped with a warning.
pub fn holdings_from_portfolio(portfolio: &UploadedPortfolio) -> Vec<Holding> {
    portfolio
        .holdings
        .values()
        .filter_map(|entry| {
            if entry.asset.symbol.is_empty() {
                return None;
            }
            let amount = match Decimal::from_str(entry.total_shares.trim()) {
                Ok(amount) if amount > Decimal::ZERO => amount,
                Ok(_) => return None,
                Err(_) => {
                    warn!(
                        "unparseable share count {:?} for {} in {}",
                        entry.total_shares, entry.asset.symbol, portfolio.name
                    );
                    return None;
                }
            };
            let (symbol, kind) = classify_symbol(&entry.asset.symbol)?;
            Some(Holding::new(
                &symbol,
                &entry.asset.name,
                amount,
                kind,
                HoldingSource::Upload {
                    portfolio_name: portfolio.name.clone(),
                },
            ))
        })
        .collect()
}

/// Persisted uploaded-portfolio list.
///
/// Reads degrade like cache reads: a missing or malformed stored value is
/// an empty list. Writes are user actions and fail loudly.
pub struct PortfolioStore {
    store: Arc<dyn KeyValueStore>,
}

impl PortfolioStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Vec<UploadedPortfolio> {
        let raw = match self.store.get(PORTFOLIOS_STORE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("portfolio store read failed: {}", e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(portfolios) => portfolios,
            Err(e) => {
                warn!("stored portfolio list is malformed, dropping it: {}", e);
                Vec::new()
            }
        }
    }

    /// Add a portfolio, replacing any existing one with the same name.
    pub fn add(&self, portfolio: UploadedPortfolio) -> Result<()> {
        let mut portfolios = self.list();
        match portfolios.iter_mut().find(|p| p.name == portfolio.name) {
            Some(existing) => *existing = portfolio,
            None => portfolios.push(portfolio),
        }
        self.persist(&portfolios)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let mut portfolios = self.list();
        portfolios.retain(|p| p.name != name);
        self.persist(&portfolios)
    }

    fn persist(&self, portfolios: &[UploadedPortfolio]) -> Result<()> {
        let raw = serde_json::to_string(portfolios)
            .map_err(|e| Error::Unexpected(format!("portfolio list serialization: {}", e)))?;
        self.store
            .set(PORTFOLIOS_STORE_KEY, &raw)
            .map_err(|e| Error::Store(e.to_string()))
    }
}

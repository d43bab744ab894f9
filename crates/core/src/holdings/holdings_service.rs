//! Merged holdings view.
//!
//! Joins canonical holdings from every source against live quotes: unique
//! symbols are split by kind, each kind is fetched once, and the quotes
//! are joined back onto the holdings under the chosen merge policy. The
//! rollup, filter and sort helpers are pure functions over the resulting
//! rows.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use huskly_market_data::{is_crypto_symbol, Asset};
use log::warn;
use rust_decimal::Decimal;

use crate::accounts::{position_value, PositionKind};
use crate::errors::Result;
use crate::quotes::QuoteService;
use crate::settings::ViewPreferences;

use super::holdings_model::{Holding, HoldingRow, MergePolicy, SortDirection, SortField};

/// Delimiter of uploaded crypto symbols (`"BTC : USD"`).
const CRYPTO_PAIR_DELIMITER: &str = " : ";

/// Classify a raw uploaded symbol string.
///
/// `"BTC : USD"` is a crypto pair (the left part is the ticker);
/// `"NYSE:VTI"` is an exchange-qualified stock (the right part is the
/// ticker); a bare string is accepted only when it is a known crypto
/// ticker. Anything else is skipped with a warning.
pub fn classify_symbol(raw: &str) -> Option<(String, PositionKind)> {
    if raw.is_empty() {
        warn!("invalid symbol: empty");
        return None;
    }
    if let Some((ticker, quote_currency)) = raw.split_once(CRYPTO_PAIR_DELIMITER) {
        if quote_currency == "USD" {
            return Some((ticker.to_string(), PositionKind::Crypto));
        }
    }
    if let Some((_, ticker)) = raw.split_once(':') {
        return Some((ticker.trim().to_string(), PositionKind::Stock));
    }
    if is_crypto_symbol(raw) {
        return Some((raw.to_string(), PositionKind::Crypto));
    }
    warn!("invalid symbol: {}", raw);
    None
}

pub struct HoldingsService {
    quotes: Arc<QuoteService>,
}

impl HoldingsService {
    pub fn new(quotes: Arc<QuoteService>) -> Self {
        Self { quotes }
    }

    /// Build the quoted view rows for a set of holdings.
    ///
    /// Quotes are fetched once per unique symbol: one crypto asset-list
    /// fetch and one batched stock fetch, regardless of how many sources
    /// hold the symbol. A holding whose symbol has no quote still gets a
    /// row, zero-valued. Row order follows first appearance in `holdings`.
    pub async fn holdings_view(
        &self,
        holdings: &[Holding],
        policy: MergePolicy,
    ) -> Result<Vec<HoldingRow>> {
        let mut crypto_symbols = HashSet::new();
        let mut stock_symbols = Vec::new();
        for holding in holdings {
            match holding.kind {
                PositionKind::Crypto => {
                    crypto_symbols.insert(holding.symbol.clone());
                }
                PositionKind::Stock | PositionKind::Option => {
                    if !stock_symbols.contains(&holding.symbol) {
                        stock_symbols.push(holding.symbol.clone());
                    }
                }
            }
        }

        let crypto_assets = self.quotes.crypto_assets(&crypto_symbols).await?;
        let stock_assets = self.quotes.stock_assets(&stock_symbols).await?;

        let mut assets: HashMap<String, Asset> = HashMap::new();
        for asset in crypto_assets.into_iter().chain(stock_assets) {
            assets.entry(asset.symbol.clone()).or_insert(asset);
        }

        let mut rows: Vec<HoldingRow> = Vec::new();
        match policy {
            MergePolicy::CombineAmounts => {
                let mut index: HashMap<String, usize> = HashMap::new();
                for holding in holdings {
                    match index.get(&holding.symbol) {
                        Some(&i) => {
                            rows[i].amount += holding.amount;
                            if !rows[i].sources.contains(&holding.source) {
                                rows[i].sources.push(holding.source.clone());
                            }
                        }
                        None => {
                            index.insert(holding.symbol.clone(), rows.len());
                            rows.push(base_row(holding, assets.get(&holding.symbol)));
                        }
                    }
                }
            }
            MergePolicy::PerSource => {
                let mut index: HashMap<(String, usize), usize> = HashMap::new();
                let mut source_ids: HashMap<_, usize> = HashMap::new();
                for holding in holdings {
                    let next_id = source_ids.len();
                    let source_id = *source_ids.entry(holding.source.clone()).or_insert(next_id);
                    let key = (holding.symbol.clone(), source_id);
                    match index.get(&key) {
                        Some(&i) => rows[i].amount += holding.amount,
                        None => {
                            index.insert(key, rows.len());
                            rows.push(base_row(holding, assets.get(&holding.symbol)));
                        }
                    }
                }
            }
        }

        for row in &mut rows {
            row.value = position_value(row.kind, row.price_usd, row.amount);
        }
        Ok(rows)
    }
}

fn base_row(holding: &Holding, asset: Option<&Asset>) -> HoldingRow {
    let (name, price_usd, change) = match asset {
        Some(asset) => {
            let name = if asset.name.is_empty() {
                holding.name.clone()
            } else {
                asset.name.clone()
            };
            (name, asset.price_usd, asset.change_percent_24_hr)
        }
        None => (holding.name.clone(), Decimal::ZERO, Decimal::ZERO),
    };
    HoldingRow {
        symbol: holding.symbol.clone(),
        name,
        amount: holding.amount,
        price_usd,
        value: Decimal::ZERO,
        change_percent_24_hr: change,
        kind: holding.kind,
        sources: vec![holding.source.clone()],
    }
}

/// Sum of row values.
pub fn total_value(rows: &[HoldingRow]) -> Decimal {
    rows.iter().map(|row| row.value).sum()
}

/// Value-weighted 24h change across the rows.
///
/// `None` when the total value is zero - an all-zero view has no
/// meaningful aggregate change.
pub fn weighted_change_percent(rows: &[HoldingRow]) -> Option<Decimal> {
    let total = total_value(rows);
    if total.is_zero() {
        return None;
    }
    let weighted: Decimal = rows
        .iter()
        .map(|row| row.value * row.change_percent_24_hr / Decimal::ONE_HUNDRED)
        .sum();
    Some(weighted / total * Decimal::ONE_HUNDRED)
}

/// Case-insensitive substring filter on the symbol column.
pub fn filter_rows(rows: &[HoldingRow], query: &str) -> Vec<HoldingRow> {
    let query = query.to_lowercase();
    rows.iter()
        .filter(|row| row.symbol.to_lowercase().contains(&query))
        .cloned()
        .collect()
}

/// Stable sort on the chosen column; equal keys keep their current order.
pub fn sort_rows(rows: &mut [HoldingRow], field: SortField, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let ord = match field {
            SortField::Symbol => a.symbol.cmp(&b.symbol),
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Price => a.price_usd.cmp(&b.price_usd),
            SortField::Amount => a.amount.cmp(&b.amount),
            SortField::Value => a.value.cmp(&b.value),
            SortField::ChangePercent => a.change_percent_24_hr.cmp(&b.change_percent_24_hr),
        };
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

/// Apply persisted view preferences to a row set.
pub fn sorted_view(mut rows: Vec<HoldingRow>, preferences: &ViewPreferences) -> Vec<HoldingRow> {
    sort_rows(&mut rows, preferences.sort_field, preferences.sort_direction);
    rows
}

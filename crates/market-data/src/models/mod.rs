//! Normalized market data models.
//!
//! All numeric quote fields are [`rust_decimal::Decimal`] and serialize as
//! decimal strings, so values survive a storage round-trip without
//! floating-point drift.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Classification of a normalized asset record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Crypto,
    Stock,
}

/// Normalized quote record for one symbol.
///
/// Crypto records carry the full CoinCap field set; stock records fill the
/// supply/volume fields with zero. Identity is `symbol` within a fetch
/// batch - `id` is not globally unique across the crypto and stock
/// namespaces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price_usd: Decimal,
    pub rank: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub supply: Decimal,
    pub max_supply: Option<Decimal>,
    pub market_cap_usd: Decimal,
    pub volume_usd_24_hr: Decimal,
    pub change_percent_24_hr: Decimal,
    pub vwap_24_hr: Decimal,
}

impl Asset {
    /// Build a stock-shaped asset from a quote, zero-filling the fields
    /// that only exist for crypto.
    pub fn stock(symbol: &str, name: &str, price_usd: Decimal, change_percent_24_hr: Decimal) -> Self {
        Self {
            id: symbol.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            price_usd,
            rank: "0".to_string(),
            kind: AssetKind::Stock,
            supply: Decimal::ZERO,
            max_supply: None,
            market_cap_usd: Decimal::ZERO,
            volume_usd_24_hr: Decimal::ZERO,
            change_percent_24_hr,
            vwap_24_hr: Decimal::ZERO,
        }
    }
}

/// Normalized stock quote: last price, day change percent, display name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    pub last_price: Decimal,
    pub change_percent: Decimal,
    pub name: String,
}

/// One point of a price history series.
///
/// `timestamp` is Unix milliseconds; series are returned sorted ascending.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: i64,
    pub price: Decimal,
}

//! Canonical holding models and the merged view row.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::accounts::PositionKind;

/// Where a holding came from. Every holding carries exactly one source;
/// merged view rows keep the full list so a combined row stays traceable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HoldingSource {
    #[serde(rename_all = "camelCase")]
    Brokerage { account_number: String },
    #[serde(rename_all = "camelCase")]
    Upload { portfolio_name: String },
    Sample,
}

/// One canonical holding: a quantity of one instrument from one source.
///
/// Amounts are non-negative; zero-amount entries are filtered out at the
/// boundary that produced them, never here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub amount: Decimal,
    pub kind: PositionKind,
    pub source: HoldingSource,
}

impl Holding {
    pub fn new(
        symbol: &str,
        name: &str,
        amount: Decimal,
        kind: PositionKind,
        source: HoldingSource,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            amount,
            kind,
            source,
        }
    }
}

/// One row of the merged, quoted holdings view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingRow {
    pub symbol: String,
    pub name: String,
    pub amount: Decimal,
    pub price_usd: Decimal,
    pub value: Decimal,
    pub change_percent_24_hr: Decimal,
    pub kind: PositionKind,
    pub sources: Vec<HoldingSource>,
}

/// Sortable columns of the holdings view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Symbol,
    Name,
    Price,
    Amount,
    Value,
    ChangePercent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// How holdings of the same symbol from different sources are merged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergePolicy {
    /// One row per symbol, amounts summed across sources.
    CombineAmounts,
    /// One row per (symbol, source) pair.
    PerSource,
}

/// Built-in demo holdings shown before any account is linked or any
/// portfolio uploaded.
pub fn sample_holdings() -> Vec<Holding> {
    vec![
        Holding::new(
            "BTC",
            "Bitcoin",
            dec!(0.25),
            PositionKind::Crypto,
            HoldingSource::Sample,
        ),
        Holding::new(
            "ETH",
            "Ethereum",
            dec!(2.5),
            PositionKind::Crypto,
            HoldingSource::Sample,
        ),
        Holding::new(
            "AAPL",
            "Apple Inc",
            dec!(10),
            PositionKind::Stock,
            HoldingSource::Sample,
        ),
        Holding::new(
            "VTI",
            "Vanguard Total Stock Market ETF",
            dec!(15),
            PositionKind::Stock,
            HoldingSource::Sample,
        ),
    ]
}

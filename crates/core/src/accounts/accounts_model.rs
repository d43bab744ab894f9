//! Normalized brokerage account models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Position classification. A closed set: valuing anything outside it is
/// a classification error, never a silent zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    Stock,
    Crypto,
    Option,
}

impl PositionKind {
    /// Classify a brokerage `assetType` string.
    ///
    /// Equity-like instrument types collapse to `Stock`; `OPTION` stays
    /// distinct because of its contract multiplier. Anything else fails
    /// loudly. Crypto holdings never come from the brokerage, so `Crypto`
    /// is only ever assigned by the uploaded-symbol classifier.
    pub fn from_asset_type(asset_type: &str) -> Result<Self> {
        match asset_type {
            "EQUITY" | "MUTUAL_FUND" | "ETF" | "CASH_EQUIVALENT" => Ok(Self::Stock),
            "OPTION" => Ok(Self::Option),
            other => Err(Error::UnsupportedPositionType(other.to_string())),
        }
    }
}

/// One normalized brokerage position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedPosition {
    /// Underlying ticker. For options the contract suffix is stripped.
    pub symbol: String,
    pub name: String,
    pub amount: Decimal,
    /// Average trade price, as reported by the brokerage.
    pub average_trade_price_usd: Decimal,
    /// Market value of the whole position.
    pub value: Decimal,
    /// Mark price per share (per contract unit for options).
    pub mark: Decimal,
    pub change_percent_24_hr: Decimal,
    /// Instrument identifier (CUSIP).
    pub id: String,
    pub kind: PositionKind,
}

/// One brokerage account's aggregate. Rebuilt in full on every fetch and
/// treated as immutable once constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedPortfolio {
    pub account_number: String,
    pub positions: Vec<ParsedPosition>,
    pub liquidation_value: Decimal,
    pub available_funds: Decimal,
    pub buying_power: Decimal,
    pub cash_balance: Decimal,
}

/// Market value of a position from its mark price and amount.
///
/// Options carry the standard 100-share contract multiplier. Total over
/// [`PositionKind`] - unknown types cannot reach this function, they fail
/// at classification.
pub fn position_value(kind: PositionKind, mark: Decimal, amount: Decimal) -> Decimal {
    match kind {
        PositionKind::Stock | PositionKind::Crypto => mark * amount,
        PositionKind::Option => mark * amount * Decimal::ONE_HUNDRED,
    }
}

//! Raw wire models for the Schwab trader and marketdata APIs.
//!
//! Shapes mirror the upstream JSON; the domain layer converts them into
//! canonical records at the boundary. Monetary fields deserialize into
//! [`Decimal`] directly (the API sends plain JSON numbers).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One account envelope from `/trader/v1/accounts?fields=positions`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchwabAccount {
    pub securities_account: SecuritiesAccount,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritiesAccount {
    pub account_number: String,
    #[serde(default)]
    pub positions: Vec<SchwabPosition>,
    pub current_balances: CurrentBalances,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchwabPosition {
    pub short_quantity: Decimal,
    pub long_quantity: Decimal,
    #[serde(default)]
    pub average_price: Decimal,
    #[serde(default)]
    pub current_day_profit_loss: Option<Decimal>,
    /// Running day P/L percentage; used verbatim when present.
    #[serde(default)]
    pub current_day_profit_loss_percentage: Option<Decimal>,
    pub instrument: SchwabInstrument,
    pub market_value: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchwabInstrument {
    pub asset_type: String,
    #[serde(default)]
    pub cusip: String,
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    /// Absolute price change since the previous close. Not always present.
    #[serde(default)]
    pub net_change: Option<Decimal>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBalances {
    #[serde(default)]
    pub equity: Decimal,
    #[serde(default)]
    pub available_funds: Decimal,
    #[serde(default)]
    pub buying_power: Decimal,
    #[serde(default)]
    pub cash_balance: Decimal,
    #[serde(default)]
    pub liquidation_value: Decimal,
}

/// One entry of the batched `/marketdata/v1/quotes` response, keyed by
/// symbol at the top level.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolQuote {
    pub quote: QuoteData,
    #[serde(default)]
    pub reference: QuoteReference,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteData {
    pub last_price: Decimal,
    #[serde(default)]
    pub net_percent_change: Option<Decimal>,
    #[serde(default)]
    pub mark_percent_change: Option<Decimal>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteReference {
    #[serde(default)]
    pub description: String,
}

/// Entry from `/trader/v1/accounts/accountNumbers`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountNumber {
    pub account_number: String,
    pub hash_value: String,
}

/// Candle frequency unit for price history requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyType {
    Minute,
    Daily,
    Weekly,
    Monthly,
}

impl FrequencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Candle {
    pub datetime: i64,
    pub close: Decimal,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PriceHistoryResponse {
    #[serde(default)]
    pub candles: Vec<Candle>,
    #[serde(default)]
    pub empty: bool,
}

/// One transaction from the account transaction history.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub activity_id: i64,
    pub time: String,
    pub account_number: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub sub_account: String,
    #[serde(default)]
    pub trade_date: String,
    #[serde(default)]
    pub position_id: Option<i64>,
    #[serde(default)]
    pub order_id: Option<i64>,
    #[serde(default)]
    pub net_amount: Decimal,
    #[serde(default)]
    pub transfer_items: Vec<TransferItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferItem {
    pub instrument: TransactionInstrument,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub position_effect: Option<String>,
    #[serde(default)]
    pub fee_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInstrument {
    pub asset_type: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub closing_price: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_account_parsing() {
        let json = r#"{
            "securitiesAccount": {
                "accountNumber": "12345678",
                "positions": [{
                    "shortQuantity": 0,
                    "longQuantity": 10,
                    "averagePrice": 95.5,
                    "currentDayProfitLossPercentage": 1.25,
                    "instrument": {
                        "assetType": "EQUITY",
                        "cusip": "037833100",
                        "symbol": "AAPL",
                        "description": "APPLE INC",
                        "netChange": 1.1
                    },
                    "marketValue": 1000.0
                }],
                "currentBalances": {
                    "availableFunds": 500.25,
                    "buyingPower": 1000.5,
                    "cashBalance": 500.25,
                    "liquidationValue": 1500.75
                }
            }
        }"#;
        let account: SchwabAccount = serde_json::from_str(json).unwrap();
        let sa = &account.securities_account;
        assert_eq!(sa.account_number, "12345678");
        assert_eq!(sa.positions[0].long_quantity, dec!(10));
        assert_eq!(sa.positions[0].instrument.net_change, Some(dec!(1.1)));
        assert_eq!(sa.current_balances.liquidation_value, dec!(1500.75));
    }

    #[test]
    fn test_account_without_positions() {
        let json = r#"{
            "securitiesAccount": {
                "accountNumber": "999",
                "currentBalances": {}
            }
        }"#;
        let account: SchwabAccount = serde_json::from_str(json).unwrap();
        assert!(account.securities_account.positions.is_empty());
    }

    #[test]
    fn test_quote_entry_parsing() {
        let json = r#"{
            "quote": {"lastPrice": 187.44, "netPercentChange": -0.35},
            "reference": {"description": "APPLE INC"}
        }"#;
        let entry: SymbolQuote = serde_json::from_str(json).unwrap();
        assert_eq!(entry.quote.last_price, dec!(187.44));
        assert_eq!(entry.quote.mark_percent_change, None);
        assert_eq!(entry.reference.description, "APPLE INC");
    }

    #[test]
    fn test_frequency_type_as_str() {
        assert_eq!(FrequencyType::Minute.as_str(), "minute");
        assert_eq!(FrequencyType::Monthly.as_str(), "monthly");
    }
}

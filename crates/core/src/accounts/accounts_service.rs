//! Brokerage account fetching and normalization.
//!
//! The raw accounts response is cached briefly and re-parsed on every
//! call; parsed portfolios are rebuilt whole, never patched.

use std::sync::Arc;

use futures::future::join_all;
use huskly_market_data::provider::schwab::models::{AccountNumber, SchwabAccount, Transaction};
use huskly_market_data::BrokerageApi;
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::auth::AuthService;
use crate::cache::ExpiringCache;
use crate::constants::{
    ACCOUNTS_CACHE_KEY, ACCOUNTS_CACHE_TTL_SECS, ACCOUNT_NUMBERS_CACHE_KEY,
    ACCOUNT_NUMBERS_CACHE_TTL_SECS,
};
use crate::errors::{Error, Result};

use super::accounts_model::{position_value, ParsedPortfolio, ParsedPosition, PositionKind};

/// Transaction history for one account.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTransactions {
    pub account_number: String,
    pub transactions: Vec<Transaction>,
}

/// Day-change percent for one position.
///
/// A broker-provided running day P/L percentage wins. Otherwise the
/// percent is derived from the instrument's net change: the previous
/// close is reconstructed first and the change computed against it, in
/// that order, because the previous close feeds other derivations. A zero
/// previous close yields 0 rather than an undefined value.
fn day_change_percent(
    mark: Decimal,
    net_change: Option<Decimal>,
    reported_percent: Option<Decimal>,
    symbol: &str,
) -> Decimal {
    if let Some(pct) = reported_percent {
        return pct;
    }
    let net_change = net_change.unwrap_or_default();
    let previous_close = mark - net_change;
    if previous_close.is_zero() {
        warn!("zero previous close for {}, reporting zero day change", symbol);
        return Decimal::ZERO;
    }
    (mark - previous_close) / previous_close * Decimal::ONE_HUNDRED
}

/// Normalize raw brokerage accounts into parsed portfolios.
///
/// Zero-quantity positions are dropped before normalization; an unknown
/// asset type aborts the parse with a classification error.
pub fn parse_accounts(data: &[SchwabAccount]) -> Result<Vec<ParsedPortfolio>> {
    data.iter()
        .map(|account| {
            let sa = &account.securities_account;
            let positions = sa
                .positions
                .iter()
                .filter(|pos| {
                    pos.long_quantity > Decimal::ZERO || pos.short_quantity > Decimal::ZERO
                })
                .filter_map(|pos| {
                    let quantity = pos.long_quantity - pos.short_quantity;
                    if quantity.is_zero() {
                        // Fully boxed position, nothing to value.
                        warn!(
                            "skipping net-zero position {}",
                            pos.instrument.symbol
                        );
                        return None;
                    }
                    Some(parse_position(pos, quantity))
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(ParsedPortfolio {
                account_number: sa.account_number.clone(),
                positions,
                liquidation_value: sa.current_balances.liquidation_value,
                available_funds: sa.current_balances.available_funds,
                buying_power: sa.current_balances.buying_power,
                cash_balance: sa.current_balances.cash_balance,
            })
        })
        .collect()
}

fn parse_position(
    pos: &huskly_market_data::provider::schwab::models::SchwabPosition,
    quantity: Decimal,
) -> Result<ParsedPosition> {
    let kind = PositionKind::from_asset_type(&pos.instrument.asset_type)?;

    // Option marks are only known through the position's total market
    // value, so back-derive them through the contract multiplier.
    let mark = match kind {
        PositionKind::Option => pos.market_value / Decimal::ONE_HUNDRED / quantity,
        _ => pos.market_value / quantity,
    };

    // Option contract symbols carry a space-delimited suffix; the
    // underlying ticker is the leading token.
    let symbol = match kind {
        PositionKind::Option => pos
            .instrument
            .symbol
            .split(' ')
            .next()
            .unwrap_or(&pos.instrument.symbol)
            .to_string(),
        _ => pos.instrument.symbol.clone(),
    };

    let name = if pos.instrument.description.is_empty() {
        pos.instrument.symbol.clone()
    } else {
        pos.instrument.description.clone()
    };

    Ok(ParsedPosition {
        symbol: symbol.clone(),
        name,
        amount: quantity,
        average_trade_price_usd: pos.average_price,
        value: position_value(kind, mark, quantity),
        mark,
        change_percent_24_hr: day_change_percent(
            mark,
            pos.instrument.net_change,
            pos.current_day_profit_loss_percentage,
            &symbol,
        ),
        id: pos.instrument.cusip.clone(),
        kind,
    })
}

/// Service over the brokerage accounts endpoints.
pub struct AccountsService {
    cache: Arc<ExpiringCache>,
    auth: Arc<AuthService>,
    api: Arc<dyn BrokerageApi>,
}

impl AccountsService {
    pub fn new(
        cache: Arc<ExpiringCache>,
        auth: Arc<AuthService>,
        api: Arc<dyn BrokerageApi>,
    ) -> Self {
        Self { cache, auth, api }
    }

    /// Evict the cached token on an auth rejection, then hand the error
    /// back to the caller.
    fn fail_auth(&self, e: Error) -> Error {
        if e.is_unauthorized() {
            self.auth.invalidate();
        }
        e
    }

    /// Fetch all brokerage accounts, parsed. The raw response is cached
    /// for one minute.
    pub async fn accounts(&self) -> Result<Vec<ParsedPortfolio>> {
        let raw: Vec<SchwabAccount> = self
            .cache
            .fetch_through(ACCOUNTS_CACHE_KEY, ACCOUNTS_CACHE_TTL_SECS, || async {
                let token = self.auth.get_token().await?;
                Ok::<_, Error>(self.api.accounts(&token).await?)
            })
            .await
            .map_err(|e| self.fail_auth(e))?;
        parse_accounts(&raw)
    }

    /// Fetch the account number to hash mapping (cached 12 hours).
    pub async fn account_numbers(&self) -> Result<Vec<AccountNumber>> {
        self.cache
            .fetch_through(
                ACCOUNT_NUMBERS_CACHE_KEY,
                ACCOUNT_NUMBERS_CACHE_TTL_SECS,
                || async {
                    let token = self.auth.get_token().await?;
                    Ok::<_, Error>(self.api.account_numbers(&token).await?)
                },
            )
            .await
            .map_err(|e| self.fail_auth(e))
    }

    /// Fetch the transaction history for every account.
    ///
    /// Per-account fetches are issued concurrently and awaited jointly;
    /// any failure fails the batch.
    pub async fn transactions(
        &self,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<AccountTransactions>> {
        let numbers = self.account_numbers().await?;
        let token = self.auth.get_token().await?;

        let fetches = numbers
            .iter()
            .map(|account| self.api.transactions(&token, &account.hash_value, start, end));
        let results = join_all(fetches).await;

        numbers
            .into_iter()
            .zip(results)
            .map(|(account, result)| {
                let transactions = result.map_err(|e| self.fail_auth(Error::from(e)))?;
                Ok(AccountTransactions {
                    account_number: account.account_number,
                    transactions,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn account_json(positions: serde_json::Value) -> SchwabAccount {
        serde_json::from_value(json!({
            "securitiesAccount": {
                "accountNumber": "12345678",
                "positions": positions,
                "currentBalances": {
                    "availableFunds": 100.0,
                    "buyingPower": 200.0,
                    "cashBalance": 100.0,
                    "liquidationValue": 5000.0
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_equity_position() {
        let account = account_json(json!([{
            "shortQuantity": 0,
            "longQuantity": 10,
            "averagePrice": 95.5,
            "instrument": {
                "assetType": "EQUITY",
                "cusip": "037833100",
                "symbol": "AAPL",
                "description": "APPLE INC",
                "netChange": 2.0
            },
            "marketValue": 1000.0
        }]));

        let portfolios = parse_accounts(&[account]).unwrap();
        let pos = &portfolios[0].positions[0];
        assert_eq!(pos.symbol, "AAPL");
        assert_eq!(pos.kind, PositionKind::Stock);
        assert_eq!(pos.mark, dec!(100));
        assert_eq!(pos.value, dec!(1000));
        // previous close 98, change (100-98)/98*100
        assert_eq!(pos.change_percent_24_hr.round_dp(4), dec!(2.0408));
    }

    #[test]
    fn test_parse_option_position() {
        let account = account_json(json!([{
            "shortQuantity": 0,
            "longQuantity": 3,
            "averagePrice": 2.0,
            "instrument": {
                "assetType": "OPTION",
                "cusip": "0SPY..XX50",
                "symbol": "SPY 240621C00500000",
                "description": "SPY Jun 2024 500 Call"
            },
            "marketValue": 750.0
        }]));

        let portfolios = parse_accounts(&[account]).unwrap();
        let pos = &portfolios[0].positions[0];
        // mark back-derived through the contract multiplier
        assert_eq!(pos.mark, dec!(2.5));
        assert_eq!(pos.symbol, "SPY");
        assert_eq!(pos.kind, PositionKind::Option);
        assert_eq!(pos.value, dec!(750.0));
    }

    #[test]
    fn test_reported_day_change_wins_over_derivation() {
        let account = account_json(json!([{
            "shortQuantity": 0,
            "longQuantity": 10,
            "averagePrice": 95.5,
            "currentDayProfitLossPercentage": 1.25,
            "instrument": {
                "assetType": "EQUITY",
                "cusip": "x",
                "symbol": "AAPL",
                "description": "APPLE INC",
                "netChange": 2.0
            },
            "marketValue": 1000.0
        }]));

        let portfolios = parse_accounts(&[account]).unwrap();
        assert_eq!(portfolios[0].positions[0].change_percent_24_hr, dec!(1.25));
    }

    #[test]
    fn test_zero_quantity_positions_are_dropped() {
        let account = account_json(json!([{
            "shortQuantity": 0,
            "longQuantity": 0,
            "averagePrice": 1.0,
            "instrument": {"assetType": "EQUITY", "cusip": "x", "symbol": "ZERO"},
            "marketValue": 0.0
        }, {
            "shortQuantity": 5,
            "longQuantity": 5,
            "averagePrice": 1.0,
            "instrument": {"assetType": "EQUITY", "cusip": "x", "symbol": "BOXED"},
            "marketValue": 0.0
        }]));

        let portfolios = parse_accounts(&[account]).unwrap();
        assert!(portfolios[0].positions.is_empty());
    }

    #[test]
    fn test_unknown_asset_type_fails_the_parse() {
        let account = account_json(json!([{
            "shortQuantity": 0,
            "longQuantity": 1,
            "averagePrice": 1.0,
            "instrument": {"assetType": "BOND", "cusip": "x", "symbol": "T10Y"},
            "marketValue": 100.0
        }]));

        let err = parse_accounts(&[account]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPositionType(t) if t == "BOND"));
    }

    #[test]
    fn test_zero_previous_close_reports_zero_change() {
        // mark 2.0 with net change 2.0 reconstructs a previous close of 0
        assert_eq!(
            day_change_percent(dec!(2.0), Some(dec!(2.0)), None, "PENNY"),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_missing_net_change_means_flat_day() {
        assert_eq!(
            day_change_percent(dec!(10), None, None, "FLAT"),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_short_position_nets_against_long() {
        let account = account_json(json!([{
            "shortQuantity": 4,
            "longQuantity": 10,
            "averagePrice": 50.0,
            "instrument": {"assetType": "EQUITY", "cusip": "x", "symbol": "NET", "netChange": 0.0},
            "marketValue": 600.0
        }]));

        let portfolios = parse_accounts(&[account]).unwrap();
        let pos = &portfolios[0].positions[0];
        assert_eq!(pos.amount, dec!(6));
        assert_eq!(pos.mark, dec!(100));
    }
}

//! Schwab brokerage API client.
//!
//! Wraps the trader and marketdata REST endpoints with Bearer token
//! authentication. The token itself comes from an external OAuth
//! collaborator (a proxy endpoint returning `{ "token": ... }`); this
//! client never persists it - token caching and eviction belong to the
//! domain layer.
//!
//! # API Endpoints
//!
//! - Accounts: `/trader/v1/accounts?fields=positions`
//! - Account numbers: `/trader/v1/accounts/accountNumbers`
//! - Quotes (batched): `/marketdata/v1/quotes?symbols=A,B,C`
//! - Price history: `/marketdata/v1/pricehistory?symbol=..&periodType=..`
//! - Transactions: `/trader/v1/accounts/{hash}/transactions?startDate=..&endDate=..`

pub mod models;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::PricePoint;
use crate::provider::traits::BrokerageApi;

use models::{
    AccountNumber, FrequencyType, PriceHistoryResponse, SchwabAccount, SymbolQuote, Transaction,
};

const BASE_URL: &str = "https://api.schwabapi.com";
const TOKEN_URL: &str = "https://huskly.finance/schwab/oauth/token";
const PROVIDER_ID: &str = "SCHWAB";

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Period selection for a price history request covering `days` days.
///
/// Mirrors the dashboard's ladder: intraday and short ranges use day
/// periods, medium ranges months, long ranges years.
fn history_period(days: u32) -> (&'static str, u32) {
    if days <= 1 {
        ("day", 1)
    } else if days <= 10 {
        ("day", days)
    } else if days <= 180 {
        ("month", days.div_ceil(30))
    } else if days <= 365 {
        ("year", 1)
    } else {
        ("year", 5)
    }
}

/// Sort candles ascending and drop duplicate timestamps, keeping the
/// first occurrence.
fn normalize_candles(response: PriceHistoryResponse) -> Vec<PricePoint> {
    if response.empty {
        return Vec::new();
    }
    let mut points: Vec<PricePoint> = response
        .candles
        .into_iter()
        .map(|c| PricePoint {
            timestamp: c.datetime,
            price: c.close,
        })
        .collect();
    points.sort_by_key(|p| p.timestamp);
    points.dedup_by_key(|p| p.timestamp);
    points
}

/// HTTP client for the Schwab trader and marketdata APIs.
#[derive(Debug, Clone)]
pub struct SchwabClient {
    client: Client,
    base_url: String,
    token_url: String,
}

impl SchwabClient {
    pub fn new() -> Self {
        Self::with_urls(BASE_URL, TOKEN_URL)
    }

    /// Override the API and token endpoints (tests point these at a local
    /// server).
    pub fn with_urls(base_url: &str, token_url: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
        }
    }

    /// Make an authenticated GET request and parse the JSON response.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
    ) -> Result<T, MarketDataError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("[Schwab] GET {}", url);

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MarketDataError::Unauthorized {
                provider: PROVIDER_ID.to_string(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        if !status.is_success() {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to fetch {}: HTTP {}", path, status),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| MarketDataError::InvalidResponse {
            provider: PROVIDER_ID.to_string(),
            message: e.to_string(),
        })
    }
}

impl Default for SchwabClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerageApi for SchwabClient {
    async fn fetch_token(&self) -> Result<String, MarketDataError> {
        debug!("[Schwab] fetching OAuth token");
        let response = self.client.get(&self.token_url).send().await?;

        if !response.status().is_success() {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to fetch token: HTTP {}", response.status()),
            });
        }

        let body = response.text().await?;
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: format!("token response: {}", e),
            })?;
        Ok(parsed.token)
    }

    async fn accounts(&self, token: &str) -> Result<Vec<SchwabAccount>, MarketDataError> {
        self.get(token, "/trader/v1/accounts?fields=positions").await
    }

    async fn account_numbers(&self, token: &str) -> Result<Vec<AccountNumber>, MarketDataError> {
        self.get(token, "/trader/v1/accounts/accountNumbers").await
    }

    async fn quotes(
        &self,
        token: &str,
        symbols: &[String],
    ) -> Result<HashMap<String, SymbolQuote>, MarketDataError> {
        let symbol_list = symbols.join(",");
        self.get(token, &format!("/marketdata/v1/quotes?symbols={}", symbol_list))
            .await
    }

    async fn price_history(
        &self,
        token: &str,
        symbol: &str,
        days: u32,
        frequency: u32,
        frequency_type: FrequencyType,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        let (period_type, period) = history_period(days);
        let end_date = Utc::now().timestamp_millis();

        let mut params = vec![
            format!("symbol={}", symbol),
            format!("periodType={}", period_type),
            format!("period={}", period),
            format!("frequencyType={}", frequency_type.as_str()),
            format!("frequency={}", frequency),
            format!("endDate={}", end_date),
        ];
        if days <= 1 {
            params.push("needExtendedHoursData=true".to_string());
        }

        let response: PriceHistoryResponse = self
            .get(token, &format!("/marketdata/v1/pricehistory?{}", params.join("&")))
            .await?;
        Ok(normalize_candles(response))
    }

    async fn transactions(
        &self,
        token: &str,
        account_hash: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, MarketDataError> {
        let path = format!(
            "/trader/v1/accounts/{}/transactions?startDate={}&endDate={}",
            account_hash,
            start.to_rfc3339_opts(SecondsFormat::Millis, true),
            end.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        self.get(token, &path).await
    }
}

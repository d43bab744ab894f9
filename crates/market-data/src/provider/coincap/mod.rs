//! CoinCap provider implementation.
//!
//! Fetches crypto market data from the CoinCap v2 REST API.
//!
//! # API Endpoints
//!
//! - Asset list: `https://api.coincap.io/v2/assets`
//! - History: `https://api.coincap.io/v2/assets/{id}/history?interval=..&start=..&end=..`
//!
//! All numeric fields arrive as decimal strings and are kept as
//! [`Decimal`] end to end.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use log::warn;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{Asset, AssetKind, PricePoint};
use crate::provider::traits::CryptoProvider;

const BASE_URL: &str = "https://api.coincap.io/v2";
const PROVIDER_ID: &str = "COINCAP";

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

lazy_static! {
    /// Ticker -> CoinCap asset id for the majors. Symbols outside this
    /// table are not treated as crypto by ticker alone.
    static ref CRYPTO_IDS: HashMap<&'static str, &'static str> = HashMap::from([
        ("BTC", "bitcoin"),
        ("ETH", "ethereum"),
        ("USDT", "tether"),
        ("BNB", "binance-coin"),
        ("USDC", "usd-coin"),
        ("XRP", "xrp"),
        ("ADA", "cardano"),
        ("DOGE", "dogecoin"),
        ("SOL", "solana"),
        ("TRX", "tron"),
        ("DOT", "polkadot"),
        ("MATIC", "polygon"),
        ("DAI", "dai"),
        ("LTC", "litecoin"),
        ("SHIB", "shiba-inu"),
        ("AVAX", "avalanche"),
        ("LINK", "chainlink"),
        ("XLM", "stellar"),
        ("UNI", "uniswap"),
        ("ATOM", "cosmos"),
    ]);
}

/// Look up the CoinCap asset id for a ticker, if it is a known crypto.
pub fn crypto_id(symbol: &str) -> Option<&'static str> {
    CRYPTO_IDS.get(symbol).copied()
}

/// Whether a bare ticker is a known crypto symbol.
pub fn is_crypto_symbol(symbol: &str) -> bool {
    CRYPTO_IDS.contains_key(symbol)
}

/// Raw asset record from the `/assets` endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinCapAsset {
    id: String,
    symbol: String,
    name: String,
    #[serde(default)]
    rank: Option<String>,
    price_usd: Decimal,
    #[serde(default)]
    supply: Option<Decimal>,
    #[serde(default)]
    max_supply: Option<Decimal>,
    #[serde(default)]
    market_cap_usd: Option<Decimal>,
    #[serde(default)]
    volume_usd_24_hr: Option<Decimal>,
    #[serde(default)]
    change_percent_24_hr: Option<Decimal>,
    #[serde(default)]
    vwap_24_hr: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct AssetsResponse {
    data: Vec<CoinCapAsset>,
}

/// Raw history point from the `/assets/{id}/history` endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryPoint {
    time: i64,
    price_usd: Decimal,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    data: Vec<HistoryPoint>,
}

/// Candle interval for a history request covering `days` days.
fn history_interval(days: u32) -> &'static str {
    if days <= 1 {
        "m5"
    } else if days <= 7 {
        "h1"
    } else if days <= 365 {
        "h12"
    } else {
        "d1"
    }
}

fn normalize_asset(raw: CoinCapAsset) -> Asset {
    Asset {
        id: raw.id,
        symbol: raw.symbol,
        name: raw.name,
        price_usd: raw.price_usd,
        rank: raw.rank.unwrap_or_else(|| "0".to_string()),
        kind: AssetKind::Crypto,
        supply: raw.supply.unwrap_or_default(),
        max_supply: raw.max_supply,
        market_cap_usd: raw.market_cap_usd.unwrap_or_default(),
        volume_usd_24_hr: raw.volume_usd_24_hr.unwrap_or_default(),
        change_percent_24_hr: raw.change_percent_24_hr.unwrap_or_default(),
        vwap_24_hr: raw.vwap_24_hr.unwrap_or_default(),
    }
}

/// CoinCap provider for crypto quotes and price history.
pub struct CoinCapProvider {
    client: Client,
    base_url: String,
}

impl CoinCapProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Override the base URL (tests point this at a local server).
    pub fn with_base_url(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, MarketDataError> {
        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            warn!("[CoinCap] failed to parse response: {}", e);
            MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            }
        })
    }
}

impl Default for CoinCapProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CryptoProvider for CoinCapProvider {
    async fn list_assets(&self) -> Result<Vec<Asset>, MarketDataError> {
        let url = format!("{}/assets", self.base_url);
        let response: AssetsResponse = self.get_json(&url).await?;
        Ok(response.data.into_iter().map(normalize_asset).collect())
    }

    async fn price_history(
        &self,
        asset_id: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        let end = Utc::now().timestamp_millis();
        let start = end - i64::from(days) * 24 * 60 * 60 * 1000;
        let url = format!(
            "{}/assets/{}/history?interval={}&start={}&end={}",
            self.base_url,
            asset_id,
            history_interval(days),
            start,
            end
        );

        let response: HistoryResponse = self.get_json(&url).await?;
        let mut points: Vec<PricePoint> = response
            .data
            .into_iter()
            .map(|p| PricePoint {
                timestamp: p.time,
                price: p.price_usd,
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }
}

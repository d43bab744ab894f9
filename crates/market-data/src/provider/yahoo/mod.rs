//! Yahoo chart fallback provider.
//!
//! Fetches a single quote from the Yahoo v8 chart API through the
//! allorigins CORS proxy, exactly as the dashboard does for mutual funds
//! that the brokerage quote batch does not cover. The proxy wraps the
//! upstream body in a `{ "contents": "<json>" }` envelope, so the payload
//! is parsed in two steps.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::StockQuote;
use crate::provider::traits::FallbackQuoteProvider;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const PROXY_URL: &str = "https://api.allorigins.win/get";
const PROVIDER_ID: &str = "YAHOO";

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
    contents: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartPayload {
    chart: Option<Chart>,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<Decimal>,
    #[serde(default)]
    chart_previous_close: Option<Decimal>,
    #[serde(default)]
    regular_market_name: Option<String>,
}

fn invalid(message: &str) -> MarketDataError {
    MarketDataError::InvalidResponse {
        provider: PROVIDER_ID.to_string(),
        message: message.to_string(),
    }
}

/// Parse the inner chart JSON into a normalized quote.
///
/// Price falls back from `regularMarketPrice` to `chartPreviousClose`;
/// change percent is derived against the previous close, zero when the
/// previous close is zero or missing.
fn parse_chart_payload(body: &str) -> Result<StockQuote, MarketDataError> {
    let payload: ChartPayload = serde_json::from_str(body).map_err(|e| invalid(&e.to_string()))?;
    let result = payload
        .chart
        .and_then(|c| c.result)
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| invalid("missing chart.result[0]"))?;

    let price = result
        .meta
        .regular_market_price
        .or(result.meta.chart_previous_close)
        .unwrap_or(Decimal::ZERO);
    let prev_close = result.meta.chart_previous_close.unwrap_or(price);

    let change_percent = if prev_close.is_zero() {
        Decimal::ZERO
    } else {
        (price - prev_close) / prev_close * Decimal::ONE_HUNDRED
    };

    Ok(StockQuote {
        last_price: price,
        change_percent,
        name: result.meta.regular_market_name.unwrap_or_default(),
    })
}

/// Yahoo chart provider, reached through the allorigins proxy.
pub struct YahooChartProvider {
    client: Client,
    chart_url: String,
    proxy_url: String,
}

impl YahooChartProvider {
    pub fn new() -> Self {
        Self::with_urls(YAHOO_CHART_URL, PROXY_URL)
    }

    /// Override the chart and proxy endpoints (tests point these at a
    /// local server).
    pub fn with_urls(chart_url: &str, proxy_url: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            chart_url: chart_url.trim_end_matches('/').to_string(),
            proxy_url: proxy_url.to_string(),
        }
    }
}

impl Default for YahooChartProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FallbackQuoteProvider for YahooChartProvider {
    async fn quote(&self, symbol: &str) -> Result<StockQuote, MarketDataError> {
        let target = format!("{}/{}?interval=1d&range=1d", self.chart_url, symbol);
        let url = format!("{}?url={}", self.proxy_url, urlencoding::encode(&target));
        debug!("[Yahoo] fallback quote for {} via proxy", symbol);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let body = response.text().await?;
        let envelope: ProxyEnvelope =
            serde_json::from_str(&body).map_err(|e| invalid(&e.to_string()))?;
        let contents = envelope
            .contents
            .ok_or_else(|| invalid("proxy envelope missing contents"))?;

        parse_chart_payload(&contents)
    }
}

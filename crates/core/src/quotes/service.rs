//! Quote aggregation service.
//!
//! Bridges the cache and the upstream providers: crypto quotes come from
//! one cached asset-list fetch, stock quotes from per-symbol cache probes
//! backed by a single batched brokerage request, with a best-effort
//! fallback source for mutual funds the batch does not cover.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use huskly_market_data::provider::schwab::models::FrequencyType;
use huskly_market_data::{
    Asset, BrokerageApi, CryptoProvider, FallbackQuoteProvider, PricePoint, StockQuote,
};
use log::warn;
use rust_decimal::Decimal;

use crate::auth::AuthService;
use crate::cache::ExpiringCache;
use crate::constants::{
    CRYPTO_ASSETS_CACHE_KEY, DEFAULT_CACHE_TTL_SECS, MUTUAL_FUND_SUFFIX, QUOTE_CACHE_TTL_SECS,
    STOCK_QUOTE_CACHE_PREFIX,
};
use crate::errors::{Error, Result};

/// Parameters for a price history fetch.
#[derive(Clone, Debug)]
pub struct PriceHistoryRequest {
    pub symbol: String,
    pub is_crypto: bool,
    /// CoinCap asset id; required when `is_crypto` is set.
    pub crypto_id: Option<String>,
    pub days: u32,
    pub frequency: u32,
    pub frequency_type: FrequencyType,
}

impl PriceHistoryRequest {
    /// Intraday-style stock request: 5 days of 30-minute candles.
    pub fn stock(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            is_crypto: false,
            crypto_id: None,
            days: 5,
            frequency: 30,
            frequency_type: FrequencyType::Minute,
        }
    }

    pub fn crypto(symbol: &str, crypto_id: &str, days: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            is_crypto: true,
            crypto_id: Some(crypto_id.to_string()),
            days,
            frequency: 0,
            frequency_type: FrequencyType::Daily,
        }
    }
}

/// Capitalize a company name word-wise, preserving all-caps acronyms.
fn capitalize_company_name(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            if !word.is_empty() && word.chars().all(|c| c.is_ascii_uppercase()) {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_cache_key(symbol: &str) -> String {
    format!("{}{}", STOCK_QUOTE_CACHE_PREFIX, symbol)
}

fn is_likely_mutual_fund(symbol: &str) -> bool {
    symbol.ends_with(MUTUAL_FUND_SUFFIX)
}

pub struct QuoteService {
    cache: Arc<ExpiringCache>,
    crypto: Arc<dyn CryptoProvider>,
    brokerage: Arc<dyn BrokerageApi>,
    fallback: Arc<dyn FallbackQuoteProvider>,
    auth: Arc<AuthService>,
}

impl QuoteService {
    pub fn new(
        cache: Arc<ExpiringCache>,
        crypto: Arc<dyn CryptoProvider>,
        brokerage: Arc<dyn BrokerageApi>,
        fallback: Arc<dyn FallbackQuoteProvider>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            cache,
            crypto,
            brokerage,
            fallback,
            auth,
        }
    }

    fn fail_auth(&self, e: Error) -> Error {
        if e.is_unauthorized() {
            self.auth.invalidate();
        }
        e
    }

    /// Normalized crypto assets for the requested symbols.
    ///
    /// The upstream asset list is unparameterized, so the whole list is
    /// fetched through the cache once and filtered locally.
    pub async fn crypto_assets(&self, symbols: &HashSet<String>) -> Result<Vec<Asset>> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let all: Vec<Asset> = self
            .cache
            .fetch_through(CRYPTO_ASSETS_CACHE_KEY, DEFAULT_CACHE_TTL_SECS, || async {
                Ok::<_, Error>(self.crypto.list_assets().await?)
            })
            .await?;

        Ok(all
            .into_iter()
            .filter(|asset| symbols.contains(&asset.symbol))
            .collect())
    }

    /// Stock quotes for the requested symbols.
    ///
    /// Cached quotes are served per symbol; the remaining symbols go out
    /// as one batched brokerage request. Symbols the batch does not cover
    /// fall back to the secondary source when they look like mutual
    /// funds - those lookups run concurrently and are awaited jointly,
    /// and individual failures only omit that symbol.
    pub async fn stock_quotes(&self, symbols: &[String]) -> Result<HashMap<String, StockQuote>> {
        let mut quotes = HashMap::new();
        let mut to_fetch = Vec::new();

        for symbol in symbols {
            match self.cache.get::<StockQuote>(&quote_cache_key(symbol)) {
                Some(quote) => {
                    quotes.insert(symbol.clone(), quote);
                }
                None => to_fetch.push(symbol.clone()),
            }
        }

        if to_fetch.is_empty() {
            return Ok(quotes);
        }

        let token = self.auth.get_token().await?;
        let batch = self
            .brokerage
            .quotes(&token, &to_fetch)
            .await
            .map_err(|e| self.fail_auth(Error::from(e)))?;

        let mut fund_fallbacks = Vec::new();
        for symbol in to_fetch {
            match batch.get(&symbol) {
                Some(entry) => {
                    let quote = StockQuote {
                        last_price: entry.quote.last_price,
                        change_percent: entry
                            .quote
                            .mark_percent_change
                            .or(entry.quote.net_percent_change)
                            .unwrap_or_default(),
                        name: capitalize_company_name(&entry.reference.description),
                    };
                    let quote =
                        self.cache
                            .set(&quote_cache_key(&symbol), quote, QUOTE_CACHE_TTL_SECS);
                    quotes.insert(symbol, quote);
                }
                None if is_likely_mutual_fund(&symbol) => fund_fallbacks.push(symbol),
                None => {
                    warn!("no quote data found for {}", symbol);
                }
            }
        }

        let lookups = fund_fallbacks.iter().map(|symbol| {
            let fallback = self.fallback.clone();
            async move { (symbol.clone(), fallback.quote(symbol).await) }
        });
        for (symbol, result) in join_all(lookups).await {
            match result {
                Ok(quote) => {
                    quotes.insert(symbol, quote);
                }
                Err(e) => {
                    warn!("fallback quote for {} failed: {}", symbol, e);
                }
            }
        }

        Ok(quotes)
    }

    /// Stock-shaped assets for the requested symbols, in request order.
    ///
    /// A symbol with no quote still appears, zero-valued - it is never
    /// silently dropped from the list.
    pub async fn stock_assets(&self, symbols: &[String]) -> Result<Vec<Asset>> {
        let quotes = self.stock_quotes(symbols).await?;

        Ok(symbols
            .iter()
            .map(|symbol| match quotes.get(symbol) {
                Some(quote) => {
                    Asset::stock(symbol, &quote.name, quote.last_price, quote.change_percent)
                }
                None => Asset::stock(symbol, "", Decimal::ZERO, Decimal::ZERO),
            })
            .collect())
    }

    /// Price history for one symbol, dispatched by asset class.
    pub async fn price_history(&self, request: &PriceHistoryRequest) -> Result<Vec<PricePoint>> {
        if request.is_crypto {
            let crypto_id = request.crypto_id.as_deref().ok_or_else(|| {
                Error::Validation(format!("crypto id required for {}", request.symbol))
            })?;
            Ok(self.crypto.price_history(crypto_id, request.days).await?)
        } else {
            let token = self.auth.get_token().await?;
            self.brokerage
                .price_history(
                    &token,
                    &request.symbol,
                    request.days,
                    request.frequency,
                    request.frequency_type,
                )
                .await
                .map_err(|e| self.fail_auth(Error::from(e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::constants::TOKEN_CACHE_KEY;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use huskly_market_data::provider::schwab::models::{
        AccountNumber, SchwabAccount, SymbolQuote, Transaction,
    };
    use huskly_market_data::MarketDataError;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockCrypto {
        list_calls: AtomicUsize,
    }

    #[async_trait]
    impl CryptoProvider for MockCrypto {
        async fn list_assets(&self) -> std::result::Result<Vec<Asset>, MarketDataError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let mut btc = Asset::stock("BTC", "Bitcoin", dec!(64000), dec!(1.5));
            btc.kind = huskly_market_data::AssetKind::Crypto;
            let mut eth = Asset::stock("ETH", "Ethereum", dec!(3100), dec!(-0.5));
            eth.kind = huskly_market_data::AssetKind::Crypto;
            Ok(vec![btc, eth])
        }

        async fn price_history(
            &self,
            _asset_id: &str,
            _days: u32,
        ) -> std::result::Result<Vec<PricePoint>, MarketDataError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct MockBrokerage {
        quote_calls: AtomicUsize,
        batches: Mutex<Vec<Vec<String>>>,
        unauthorized: bool,
    }

    fn quote_entry(last: f64, change: f64, description: &str) -> SymbolQuote {
        serde_json::from_value(json!({
            "quote": {"lastPrice": last, "markPercentChange": change},
            "reference": {"description": description}
        }))
        .unwrap()
    }

    #[async_trait]
    impl BrokerageApi for MockBrokerage {
        async fn fetch_token(&self) -> std::result::Result<String, MarketDataError> {
            Ok("tok".to_string())
        }
        async fn accounts(
            &self,
            _token: &str,
        ) -> std::result::Result<Vec<SchwabAccount>, MarketDataError> {
            unimplemented!()
        }
        async fn account_numbers(
            &self,
            _token: &str,
        ) -> std::result::Result<Vec<AccountNumber>, MarketDataError> {
            unimplemented!()
        }
        async fn quotes(
            &self,
            _token: &str,
            symbols: &[String],
        ) -> std::result::Result<HashMap<String, SymbolQuote>, MarketDataError> {
            if self.unauthorized {
                return Err(MarketDataError::Unauthorized {
                    provider: "SCHWAB".to_string(),
                });
            }
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            self.batches.lock().unwrap().push(symbols.to_vec());

            let mut map = HashMap::new();
            for symbol in symbols {
                if symbol == "AAPL" {
                    map.insert(symbol.clone(), quote_entry(187.44, -0.35, "APPLE INC"));
                }
            }
            Ok(map)
        }
        async fn price_history(
            &self,
            _token: &str,
            _symbol: &str,
            _days: u32,
            _frequency: u32,
            _frequency_type: FrequencyType,
        ) -> std::result::Result<Vec<PricePoint>, MarketDataError> {
            Ok(vec![])
        }
        async fn transactions(
            &self,
            _token: &str,
            _account_hash: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> std::result::Result<Vec<Transaction>, MarketDataError> {
            unimplemented!()
        }
    }

    struct MockFallback {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FallbackQuoteProvider for MockFallback {
        async fn quote(&self, symbol: &str) -> std::result::Result<StockQuote, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
            }
            Ok(StockQuote {
                last_price: dec!(171.23),
                change_percent: dec!(0.07),
                name: "Some Fund".to_string(),
            })
        }
    }

    struct Fixture {
        service: QuoteService,
        cache: Arc<ExpiringCache>,
        brokerage: Arc<MockBrokerage>,
        crypto: Arc<MockCrypto>,
        fallback: Arc<MockFallback>,
    }

    fn fixture_with(brokerage: MockBrokerage, fallback: MockFallback) -> Fixture {
        let cache = Arc::new(ExpiringCache::new(Arc::new(MemoryStore::new())));
        let brokerage = Arc::new(brokerage);
        let crypto = Arc::new(MockCrypto::default());
        let fallback = Arc::new(fallback);
        let auth = Arc::new(AuthService::new(cache.clone(), brokerage.clone()));
        let service = QuoteService::new(
            cache.clone(),
            crypto.clone(),
            brokerage.clone(),
            fallback.clone(),
            auth,
        );
        Fixture {
            service,
            cache,
            brokerage,
            crypto,
            fallback,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(
            MockBrokerage::default(),
            MockFallback {
                fail: false,
                calls: AtomicUsize::new(0),
            },
        )
    }

    #[test]
    fn test_capitalize_company_name() {
        // All-caps acronyms are preserved, everything else is title-cased.
        assert_eq!(capitalize_company_name("APPLE INC"), "APPLE INC");
        assert_eq!(
            capitalize_company_name("vanguard total stock"),
            "Vanguard Total Stock"
        );
        assert_eq!(capitalize_company_name("iShares CORE etf"), "Ishares CORE Etf");
        assert_eq!(capitalize_company_name(""), "");
    }

    #[tokio::test]
    async fn test_stock_quotes_normalizes_and_caches() {
        let fx = fixture();
        let symbols = vec!["AAPL".to_string()];

        let quotes = fx.service.stock_quotes(&symbols).await.unwrap();
        let quote = &quotes["AAPL"];
        assert_eq!(quote.last_price, dec!(187.44));
        assert_eq!(quote.change_percent, dec!(-0.35));
        assert_eq!(quote.name, "APPLE INC");

        // Second call is served from the per-symbol cache.
        fx.service.stock_quotes(&symbols).await.unwrap();
        assert_eq!(fx.brokerage.quote_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_misses_go_out_as_one_batch() {
        let fx = fixture();
        fx.cache.set(
            &quote_cache_key("CACHED"),
            StockQuote {
                last_price: dec!(1),
                change_percent: dec!(0),
                name: "Cached".to_string(),
            },
            60,
        );

        let symbols = vec!["CACHED".to_string(), "AAPL".to_string()];
        let quotes = fx.service.stock_quotes(&symbols).await.unwrap();
        assert_eq!(quotes.len(), 2);

        let batches = fx.brokerage.batches.lock().unwrap();
        assert_eq!(*batches, vec![vec!["AAPL".to_string()]]);
    }

    #[tokio::test]
    async fn test_mutual_fund_misses_use_fallback() {
        let fx = fixture();
        let symbols = vec!["FXAIX".to_string(), "AAPL".to_string()];

        let quotes = fx.service.stock_quotes(&symbols).await.unwrap();
        assert_eq!(quotes["FXAIX"].name, "Some Fund");
        assert_eq!(fx.fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fallback_omits_symbol_only() {
        let fx = fixture_with(
            MockBrokerage::default(),
            MockFallback {
                fail: true,
                calls: AtomicUsize::new(0),
            },
        );
        let symbols = vec!["FXAIX".to_string(), "AAPL".to_string()];

        let quotes = fx.service.stock_quotes(&symbols).await.unwrap();
        assert!(!quotes.contains_key("FXAIX"));
        assert!(quotes.contains_key("AAPL"));
    }

    #[tokio::test]
    async fn test_non_fund_miss_is_omitted_without_fallback() {
        let fx = fixture();
        let symbols = vec!["MISSING".to_string()];

        let quotes = fx.service.stock_quotes(&symbols).await.unwrap();
        assert!(quotes.is_empty());
        assert_eq!(fx.fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_evicts_token_and_propagates() {
        let fx = fixture_with(
            MockBrokerage {
                unauthorized: true,
                ..Default::default()
            },
            MockFallback {
                fail: false,
                calls: AtomicUsize::new(0),
            },
        );

        // Seed a cached token so the eviction is observable.
        fx.cache.set(TOKEN_CACHE_KEY, "stale".to_string(), 900);

        let err = fx
            .service
            .stock_quotes(&["AAPL".to_string()])
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(fx.cache.get::<String>(TOKEN_CACHE_KEY), None);
    }

    #[tokio::test]
    async fn test_stock_assets_zero_fill_missing_symbols() {
        let fx = fixture();
        let symbols = vec!["AAPL".to_string(), "MISSING".to_string()];

        let assets = fx.service.stock_assets(&symbols).await.unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[1].symbol, "MISSING");
        assert_eq!(assets[1].price_usd, Decimal::ZERO);
        assert_eq!(assets[1].change_percent_24_hr, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_crypto_assets_filters_and_dedups_fetch() {
        let fx = fixture();
        let symbols: HashSet<String> = ["BTC".to_string()].into_iter().collect();

        let assets = fx.service.crypto_assets(&symbols).await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].symbol, "BTC");

        fx.service.crypto_assets(&symbols).await.unwrap();
        assert_eq!(fx.crypto.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_price_history_requires_crypto_id() {
        let fx = fixture();
        let mut request = PriceHistoryRequest::crypto("BTC", "bitcoin", 7);
        request.crypto_id = None;

        let err = fx.service.price_history(&request).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}

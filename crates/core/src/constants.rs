/// Default cache TTL when a call site does not override it (5 minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// TTL for individual stock quotes (1 minute).
pub const QUOTE_CACHE_TTL_SECS: u64 = 60;

/// TTL for the brokerage account snapshot (1 minute).
pub const ACCOUNTS_CACHE_TTL_SECS: u64 = 60;

/// TTL for the brokerage OAuth token (15 minutes).
pub const TOKEN_CACHE_TTL_SECS: u64 = 900;

/// TTL for the account number list (12 hours).
pub const ACCOUNT_NUMBERS_CACHE_TTL_SECS: u64 = 60 * 60 * 12;

/// Cache key for the full crypto asset list.
pub const CRYPTO_ASSETS_CACHE_KEY: &str = "crypto-assets";

/// Cache key prefix for per-symbol stock quotes.
pub const STOCK_QUOTE_CACHE_PREFIX: &str = "stock-quote-";

/// Cache key for the brokerage OAuth token.
pub const TOKEN_CACHE_KEY: &str = "schwab-token";

/// Cache key for the raw brokerage accounts response.
pub const ACCOUNTS_CACHE_KEY: &str = "schwab-accounts";

/// Cache key for the account number list.
pub const ACCOUNT_NUMBERS_CACHE_KEY: &str = "schwab-account-numbers";

/// Store key for the persisted uploaded-portfolio list.
pub const PORTFOLIOS_STORE_KEY: &str = "portfolios";

/// Store key for persisted view preferences.
pub const VIEW_PREFERENCES_STORE_KEY: &str = "view-preferences";

/// Suffix marking a symbol as a likely mutual fund (fallback quote source).
pub const MUTUAL_FUND_SUFFIX: char = 'X';

//! Brokerage auth token service.
//!
//! The token comes from an external OAuth collaborator and is cached for
//! 15 minutes. Services that receive an `Unauthorized` upstream error call
//! [`AuthService::invalidate`] so the next request re-acquires a token;
//! the failing call itself still fails.

use std::sync::Arc;

use huskly_market_data::BrokerageApi;
use log::debug;

use crate::cache::ExpiringCache;
use crate::constants::{TOKEN_CACHE_KEY, TOKEN_CACHE_TTL_SECS};
use crate::errors::Result;

pub struct AuthService {
    cache: Arc<ExpiringCache>,
    api: Arc<dyn BrokerageApi>,
}

impl AuthService {
    pub fn new(cache: Arc<ExpiringCache>, api: Arc<dyn BrokerageApi>) -> Self {
        Self { cache, api }
    }

    /// Get a bearer token, re-acquiring from the OAuth collaborator on
    /// cache miss.
    pub async fn get_token(&self) -> Result<String> {
        self.cache
            .fetch_through(TOKEN_CACHE_KEY, TOKEN_CACHE_TTL_SECS, || async {
                debug!("auth token cache miss, re-acquiring");
                Ok(self.api.fetch_token().await?)
            })
            .await
    }

    /// Evict the cached token (called on a 401 from the brokerage API).
    pub fn invalidate(&self) {
        self.cache.remove(TOKEN_CACHE_KEY);
    }
}

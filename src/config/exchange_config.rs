//! Exchange API configuration parsing from environment variables.

use super::{EnvLookup, parse_or};
use anyhow::Result;
use std::time::Duration;

/// MEXC public API configuration
#[derive(Debug, Clone)]
pub struct ExchangeEnvConfig {
    pub base_url: String,
    /// Bound on each HTTP attempt; a timeout counts as "no data"
    pub timeout: Duration,
    pub max_retries: u32,
    /// 0 disables client-side rate limiting
    pub max_requests_per_minute: usize,
    pub pair_cache_ttl: Duration,
}

impl Default for ExchangeEnvConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mexc.com/api/v3".to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            max_requests_per_minute: 600,
            pair_cache_ttl: Duration::from_secs(300),
        }
    }
}

impl ExchangeEnvConfig {
    pub(crate) fn from_lookup(lookup: &EnvLookup<'_>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            base_url: lookup("MEXC_BASE_URL").unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(parse_or(
                lookup,
                "EXCHANGE_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )?),
            max_retries: parse_or(lookup, "EXCHANGE_MAX_RETRIES", defaults.max_retries)?,
            max_requests_per_minute: parse_or(
                lookup,
                "EXCHANGE_MAX_REQUESTS_PER_MINUTE",
                defaults.max_requests_per_minute,
            )?,
            pair_cache_ttl: Duration::from_secs(parse_or(
                lookup,
                "PAIR_CACHE_TTL_SECS",
                defaults.pair_cache_ttl.as_secs(),
            )?),
        })
    }
}

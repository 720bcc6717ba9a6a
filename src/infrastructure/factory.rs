use crate::config::ExchangeEnvConfig;
use crate::domain::ports::ExchangeMarketApi;
use crate::infrastructure::cached_exchange::CachedExchangeApi;
use crate::infrastructure::core::RequestThrottler;
use crate::infrastructure::mexc::MexcMarketDataService;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub struct ServiceFactory;

impl ServiceFactory {
    /// MEXC client behind a shared rate limiter, wrapped in the pair cache
    pub fn create_exchange_api(config: &ExchangeEnvConfig) -> Result<Arc<dyn ExchangeMarketApi>> {
        let throttler = Arc::new(RequestThrottler::per_minute(
            "mexc",
            config.max_requests_per_minute,
        ));

        let market_service = MexcMarketDataService::builder()
            .base_url(config.base_url.clone())
            .timeout(config.timeout)
            .max_retries(config.max_retries)
            .throttler(throttler)
            .build()?;

        info!(
            "ServiceFactory: MEXC at {} (timeout {:?}, {} retries, {} req/min, pair cache {:?})",
            config.base_url,
            config.timeout,
            config.max_retries,
            config.max_requests_per_minute,
            config.pair_cache_ttl
        );

        Ok(Arc::new(CachedExchangeApi::new(
            Arc::new(market_service),
            config.pair_cache_ttl,
        )))
    }
}

use crate::domain::market::{Candle, TradingPair};
use crate::domain::ports::ExchangeMarketApi;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Caches pair-existence lookups of another [`ExchangeMarketApi`].
///
/// Entries expire after `ttl`. Only successful lookups are cached, so a
/// transient failure is retried on the next call. Candle requests pass
/// through untouched.
pub struct CachedExchangeApi {
    inner: Arc<dyn ExchangeMarketApi>,
    ttl: Duration,
    pairs: RwLock<HashMap<(String, String), (bool, Instant)>>,
}

impl std::fmt::Debug for CachedExchangeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedExchangeApi")
            .field("ttl", &self.ttl)
            .field("pairs", &"<RwLock>")
            .finish()
    }
}

impl CachedExchangeApi {
    pub fn new(inner: Arc<dyn ExchangeMarketApi>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            pairs: RwLock::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &(String, String)) -> Option<bool> {
        let lookup = |map: &HashMap<(String, String), (bool, Instant)>| {
            map.get(key)
                .filter(|(_, stored_at)| stored_at.elapsed() < self.ttl)
                .map(|(exists, _)| *exists)
        };

        match self.pairs.read() {
            Ok(guard) => lookup(&guard),
            Err(poisoned) => lookup(&poisoned.into_inner()),
        }
    }

    fn store(&self, key: (String, String), exists: bool) {
        let entry = (exists, Instant::now());
        match self.pairs.write() {
            Ok(mut guard) => {
                guard.insert(key, entry);
            }
            Err(poisoned) => {
                tracing::error!("CachedExchangeApi: Lock poisoned during write, recovering");
                poisoned.into_inner().insert(key, entry);
            }
        }
    }
}

#[async_trait]
impl ExchangeMarketApi for CachedExchangeApi {
    async fn pair_exists(&self, base: &str, quote: &str) -> Result<bool> {
        let key = (base.to_string(), quote.to_string());

        if let Some(exists) = self.cached(&key) {
            debug!("CachedExchangeApi: Cache hit for {}{}", base, quote);
            return Ok(exists);
        }

        let exists = self.inner.pair_exists(base, quote).await?;
        self.store(key, exists);
        Ok(exists)
    }

    async fn klines(&self, pair: &TradingPair, start_ms: i64, end_ms: i64) -> Result<Vec<Candle>> {
        self.inner.klines(pair, start_ms, end_ms).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockExchangeApi;

    #[tokio::test]
    async fn test_repeated_lookups_hit_cache() {
        let mock = Arc::new(MockExchangeApi::with_symbols(&["ABCUSDT"]));
        let cached = CachedExchangeApi::new(mock.clone(), Duration::from_secs(60));

        for _ in 0..5 {
            assert!(cached.pair_exists("ABC", "USDT").await.unwrap());
            assert!(!cached.pair_exists("ABC", "EUR").await.unwrap());
        }

        assert_eq!(mock.pair_checks(), 2);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let mock = Arc::new(MockExchangeApi::with_symbols(&["ABCUSDT"]));
        let cached = CachedExchangeApi::new(mock.clone(), Duration::from_millis(50));

        cached.pair_exists("ABC", "USDT").await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        cached.pair_exists("ABC", "USDT").await.unwrap();

        assert_eq!(mock.pair_checks(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let mock = Arc::new(MockExchangeApi::with_symbols(&["ABCUSDT"]));
        let cached = CachedExchangeApi::new(mock.clone(), Duration::from_secs(60));

        mock.set_failing(true);
        assert!(cached.pair_exists("ABC", "USDT").await.is_err());

        mock.set_failing(false);
        assert!(cached.pair_exists("ABC", "USDT").await.unwrap());
        assert_eq!(mock.pair_checks(), 2);
    }

    #[tokio::test]
    async fn test_klines_pass_through() {
        let mock = Arc::new(MockExchangeApi::new());
        let cached = CachedExchangeApi::new(mock.clone(), Duration::from_secs(60));
        let pair = TradingPair::new("ABC", "USDT");

        cached.klines(&pair, 0, 60_000).await.unwrap();
        cached.klines(&pair, 0, 60_000).await.unwrap();
        assert_eq!(mock.kline_calls(), 2);
    }
}

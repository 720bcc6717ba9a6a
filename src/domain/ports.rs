use crate::domain::market::{Candle, TradingPair};
use anyhow::Result;
use async_trait::async_trait;

/// Public market data of a spot exchange.
///
/// Errors are transport-level only; callers treat them as "no data".
#[async_trait]
pub trait ExchangeMarketApi: Send + Sync {
    /// Whether `base + quote` is a listed symbol
    async fn pair_exists(&self, base: &str, quote: &str) -> Result<bool>;

    /// One-minute candles in `[start_ms, end_ms)`, oldest first
    async fn klines(&self, pair: &TradingPair, start_ms: i64, end_ms: i64) -> Result<Vec<Candle>>;
}

use crate::domain::market::{
    Candle, INTERVAL_SAMPLE_COUNT, IntervalSamples, MarketWindowStats, TradingPair,
};
use crate::domain::ports::ExchangeMarketApi;
use std::sync::Arc;
use tracing::{debug, warn};

/// Aggregates one-minute candles of a pair over a time window
pub struct WindowAggregator {
    api: Arc<dyn ExchangeMarketApi>,
}

impl WindowAggregator {
    pub fn new(api: Arc<dyn ExchangeMarketApi>) -> Self {
        Self { api }
    }

    /// Stats for `[start_ms, end_ms)`; all-null when no candles are available
    pub async fn aggregate(&self, pair: &TradingPair, start_ms: i64, end_ms: i64) -> MarketWindowStats {
        let candles = match self.api.klines(pair, start_ms, end_ms).await {
            Ok(candles) => candles,
            Err(e) => {
                warn!(
                    "WindowAggregator: Candle fetch for {} failed, treating as empty: {:#}",
                    pair, e
                );
                Vec::new()
            }
        };

        debug!(
            "WindowAggregator: {} candles for {} in [{}, {})",
            candles.len(),
            pair,
            start_ms,
            end_ms
        );

        summarize(&candles)
    }
}

/// Open/close/extremes/volume plus evenly spaced close samples.
///
/// Samples need at least `INTERVAL_SAMPLE_COUNT` candles. With
/// `step = len / 10`, sample `i` is the close of candle `i * step`, so tail
/// candles past `9 * step` are never sampled when `len` is not a multiple
/// of ten.
pub fn summarize(candles: &[Candle]) -> MarketWindowStats {
    let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
        return MarketWindowStats::empty();
    };

    let max = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let min = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let volume = candles.iter().map(|c| c.volume).sum();

    let mut samples = [None; INTERVAL_SAMPLE_COUNT];
    if candles.len() >= INTERVAL_SAMPLE_COUNT {
        let step = candles.len() / INTERVAL_SAMPLE_COUNT;
        for (i, slot) in samples.iter_mut().enumerate() {
            *slot = Some(candles[i * step].close);
        }
    }

    MarketWindowStats {
        open: Some(first.open),
        close: Some(last.close),
        max: Some(max),
        min: Some(min),
        volume: Some(volume),
        interval_samples: IntervalSamples(samples),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockExchangeApi;

    fn candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64;
                Candle {
                    open_time_ms: i as i64 * 60_000,
                    open: base,
                    high: base + 0.5,
                    low: base - 0.5,
                    close: base + 0.25,
                    volume: 10.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_empty_window() {
        assert!(summarize(&[]).is_empty());
    }

    #[test]
    fn test_stats_with_few_candles() {
        let data = candles(3);
        let stats = summarize(&data);

        assert_eq!(stats.open, Some(100.0));
        assert_eq!(stats.close, Some(102.25));
        assert_eq!(stats.max, Some(102.5));
        assert_eq!(stats.min, Some(99.5));
        assert_eq!(stats.volume, Some(30.0));
        assert!(stats.interval_samples.is_empty());
    }

    #[test]
    fn test_samples_for_multiple_of_ten() {
        let data = candles(30);
        let stats = summarize(&data);

        for i in 0..INTERVAL_SAMPLE_COUNT {
            assert_eq!(stats.interval_samples.0[i], Some(data[i * 3].close));
        }
    }

    #[test]
    fn test_samples_with_remainder_skip_tail() {
        let mut data = candles(23);
        // Spike in the unsampled tail still counts for extremes
        data[22].high = 500.0;
        data[21].low = 1.0;

        let stats = summarize(&data);

        for i in 0..INTERVAL_SAMPLE_COUNT {
            assert_eq!(stats.interval_samples.0[i], Some(data[i * 2].close));
        }
        assert_eq!(stats.max, Some(500.0));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.close, Some(data[22].close));
    }

    #[test]
    fn test_exactly_ten_candles() {
        let data = candles(10);
        let stats = summarize(&data);
        assert_eq!(stats.interval_samples.0[9], Some(data[9].close));
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_empty_stats() {
        let api = Arc::new(MockExchangeApi::with_symbols(&["ABCUSDT"]));
        let pair = TradingPair::new("ABC", "USDT");
        api.insert_candles(&pair, candles(12));
        api.set_failing(true);

        let stats = WindowAggregator::new(api).aggregate(&pair, 0, 900_000).await;
        assert!(stats.is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_only_uses_window() {
        let api = Arc::new(MockExchangeApi::with_symbols(&["ABCUSDT"]));
        let pair = TradingPair::new("ABC", "USDT");
        api.insert_candles(&pair, candles(20));

        // [5m, 15m) covers candles 5..15
        let stats = WindowAggregator::new(api)
            .aggregate(&pair, 5 * 60_000, 15 * 60_000)
            .await;

        assert_eq!(stats.open, Some(105.0));
        assert_eq!(stats.close, Some(114.25));
        assert_eq!(stats.volume, Some(100.0));
        assert_eq!(stats.interval_samples.0[0], Some(105.25));
    }
}

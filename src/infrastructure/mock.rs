use crate::domain::market::{Candle, TradingPair};
use crate::domain::ports::ExchangeMarketApi;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Default)]
struct MockState {
    symbols: HashSet<String>,
    candles: HashMap<String, Vec<Candle>>,
    delays: HashMap<String, Duration>,
}

/// In-memory exchange for tests and offline runs.
///
/// Counts calls so tests can assert on caching and fallback order.
#[derive(Default)]
pub struct MockExchangeApi {
    state: RwLock<MockState>,
    failing: AtomicBool,
    pair_checks: AtomicUsize,
    kline_calls: AtomicUsize,
}

impl MockExchangeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbols(symbols: &[&str]) -> Self {
        let api = Self::new();
        for symbol in symbols {
            api.list_symbol(symbol);
        }
        api
    }

    pub fn list_symbol(&self, symbol: &str) {
        self.write(|s| {
            s.symbols.insert(symbol.to_string());
        });
    }

    pub fn insert_candles(&self, pair: &TradingPair, candles: Vec<Candle>) {
        self.write(|s| {
            s.symbols.insert(pair.symbol());
            s.candles.insert(pair.symbol(), candles);
        });
    }

    /// Delay every candle request for `pair` (used to shuffle completion order)
    pub fn set_delay(&self, pair: &TradingPair, delay: Duration) {
        self.write(|s| {
            s.delays.insert(pair.symbol(), delay);
        });
    }

    /// Make every call fail as a transport error would
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn pair_checks(&self) -> usize {
        self.pair_checks.load(Ordering::SeqCst)
    }

    pub fn kline_calls(&self) -> usize {
        self.kline_calls.load(Ordering::SeqCst)
    }

    fn write(&self, f: impl FnOnce(&mut MockState)) {
        match self.state.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&MockState) -> T) -> T {
        match self.state.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl ExchangeMarketApi for MockExchangeApi {
    async fn pair_exists(&self, base: &str, quote: &str) -> Result<bool> {
        self.pair_checks.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("MockExchangeApi: simulated network failure");
        }

        let symbol = format!("{}{}", base, quote);
        Ok(self.read(|s| s.symbols.contains(&symbol)))
    }

    async fn klines(&self, pair: &TradingPair, start_ms: i64, end_ms: i64) -> Result<Vec<Candle>> {
        self.kline_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("MockExchangeApi: simulated network failure");
        }

        let symbol = pair.symbol();
        let (delay, candles) = self.read(|s| {
            let candles: Vec<Candle> = s
                .candles
                .get(&symbol)
                .map(|all| {
                    all.iter()
                        .filter(|c| c.open_time_ms >= start_ms && c.open_time_ms < end_ms)
                        .copied()
                        .collect()
                })
                .unwrap_or_default();
            (s.delays.get(&symbol).copied(), candles)
        });

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        debug!("MockExchangeApi: {} candles for {}", candles.len(), symbol);
        Ok(candles)
    }
}

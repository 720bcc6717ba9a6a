use crate::domain::market::{CANONICAL_QUOTES, TradingPair};
use crate::domain::ports::ExchangeMarketApi;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Finds a quote asset the base asset actually trades against.
///
/// Order, first hit wins: the requested quote, then each canonical quote
/// (USDT, USDC) not already tried.
pub struct PairResolver {
    api: Arc<dyn ExchangeMarketApi>,
}

impl PairResolver {
    pub fn new(api: Arc<dyn ExchangeMarketApi>) -> Self {
        Self { api }
    }

    pub async fn resolve(&self, base: &str, requested_quote: &str) -> Option<String> {
        if base.is_empty() || requested_quote.is_empty() {
            return None;
        }

        if self.exists(base, requested_quote).await {
            return Some(requested_quote.to_string());
        }

        for alternative in CANONICAL_QUOTES {
            if alternative == requested_quote {
                continue;
            }
            if self.exists(base, alternative).await {
                info!(
                    "PairResolver: {}/{} not listed, falling back to {}",
                    base, requested_quote, alternative
                );
                return Some(alternative.to_string());
            }
        }

        info!(
            "PairResolver: No tradable pair for {} (requested {})",
            base, requested_quote
        );
        None
    }

    /// Resolve the pair of a signal, if both coins were extracted
    pub async fn resolve_pair(
        &self,
        base: Option<&str>,
        requested_quote: Option<&str>,
    ) -> Option<TradingPair> {
        let (base, requested_quote) = (base?, requested_quote?);
        let quote = self.resolve(base, requested_quote).await?;
        Some(TradingPair::new(base, quote))
    }

    async fn exists(&self, base: &str, quote: &str) -> bool {
        match self.api.pair_exists(base, quote).await {
            Ok(exists) => {
                debug!("PairResolver: {}{} listed={}", base, quote, exists);
                exists
            }
            Err(e) => {
                warn!(
                    "PairResolver: Existence check for {}{} failed, treating as unlisted: {:#}",
                    base, quote, e
                );
                false
            }
        }
    }
}

use crate::infrastructure::core::request_throttler::{RequestThrottler, ThrottleMiddleware};
use anyhow::{Context, Result};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates a new HTTP client with retry and rate-limit middleware.
    ///
    /// `timeout` bounds each attempt; transient failures (connect errors,
    /// timeouts, 5xx, 429) are retried with exponential backoff. Every
    /// attempt, retries included, waits for a `throttler` slot.
    pub fn create_client(
        timeout: Duration,
        max_retries: u32,
        throttler: Arc<RequestThrottler>,
    ) -> Result<ClientWithMiddleware> {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);

        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .context("Failed to build HTTP client")?;

        // Retry wraps the throttle, so each attempt passes through it
        Ok(ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(ThrottleMiddleware::new(throttler))
            .build())
    }
}

/// Build a URL with query parameters.
///
/// reqwest-middleware's request builder has no `.query()`, so the query
/// string is encoded into the URL up front.
pub fn build_url_with_query<K, V>(base_url: &str, params: &[(K, V)]) -> Result<Url>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut url =
        Url::parse(base_url).with_context(|| format!("Invalid request URL: {}", base_url))?;

    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_with_query() {
        let url = build_url_with_query(
            "https://api.mexc.com/api/v3/klines",
            &[("symbol", "ABCUSDT"), ("interval", "1m")],
        )
        .unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.mexc.com/api/v3/klines?symbol=ABCUSDT&interval=1m"
        );
    }

    #[test]
    fn test_build_url_encodes_values() {
        let url = build_url_with_query("https://example.com/x", &[("q", "a b&c")]).unwrap();
        assert_eq!(url.query(), Some("q=a+b%26c"));
    }

    #[test]
    fn test_build_url_without_params() {
        let params: [(&str, &str); 0] = [];
        let url = build_url_with_query("https://example.com/exchangeInfo", &params).unwrap();
        assert_eq!(url.as_str(), "https://example.com/exchangeInfo");
    }

    #[test]
    fn test_invalid_base_url() {
        let params: [(&str, &str); 0] = [];
        assert!(build_url_with_query("not a url", &params).is_err());
    }

    #[test]
    fn test_create_client() {
        let throttler = Arc::new(RequestThrottler::per_minute("test", 0));
        assert!(HttpClientFactory::create_client(Duration::from_secs(5), 0, throttler).is_ok());
    }
}

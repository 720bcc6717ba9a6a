use crate::domain::errors::MarketDataError;
use crate::domain::market::{Candle, TradingPair};
use crate::domain::ports::ExchangeMarketApi;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use crate::infrastructure::core::request_throttler::RequestThrottler;
use anyhow::Result;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ===== Constants =====

/// Most candles MEXC returns for one klines request
const KLINE_PAGE_LIMIT: usize = 1000;

const ONE_MINUTE_MS: i64 = 60_000;

// ===== Market Data Service =====

/// Public (unauthenticated) MEXC spot market data
pub struct MexcMarketDataService {
    client: ClientWithMiddleware,
    base_url: String,
}

impl MexcMarketDataService {
    pub fn builder() -> MexcMarketDataServiceBuilder {
        MexcMarketDataServiceBuilder::default()
    }
}

#[derive(Default)]
pub struct MexcMarketDataServiceBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    throttler: Option<Arc<RequestThrottler>>,
}

impl MexcMarketDataServiceBuilder {
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn throttler(mut self, throttler: Arc<RequestThrottler>) -> Self {
        self.throttler = Some(throttler);
        self
    }

    pub fn build(self) -> Result<MexcMarketDataService> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| "https://api.mexc.com/api/v3".to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let max_retries = self.max_retries.unwrap_or(3);
        let throttler = self
            .throttler
            .unwrap_or_else(|| Arc::new(RequestThrottler::per_minute("mexc", 0)));

        Ok(MexcMarketDataService {
            client: HttpClientFactory::create_client(timeout, max_retries, throttler)?,
            base_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    #[serde(default)]
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
}

#[async_trait]
impl ExchangeMarketApi for MexcMarketDataService {
    async fn pair_exists(&self, base: &str, quote: &str) -> Result<bool> {
        let endpoint = "/exchangeInfo";
        let params: [(&str, &str); 0] = [];

        let Some(response) = self.get(endpoint, &params).await? else {
            return Ok(false);
        };

        let info: ExchangeInfo = response
            .json()
            .await
            .map_err(|e| decode_error(endpoint, e))?;

        let symbol = format!("{}{}", base, quote);
        let exists = info.symbols.iter().any(|s| s.symbol == symbol);
        debug!(
            "MexcMarketDataService: {} listed={} ({} symbols)",
            symbol,
            exists,
            info.symbols.len()
        );

        Ok(exists)
    }

    async fn klines(&self, pair: &TradingPair, start_ms: i64, end_ms: i64) -> Result<Vec<Candle>> {
        let endpoint = "/klines";
        let symbol = pair.symbol();
        let mut candles: Vec<Candle> = Vec::new();
        let mut page_start = start_ms;

        // Windows longer than one page are fetched page by page
        while page_start < end_ms {
            let params = [
                ("symbol", symbol.clone()),
                ("interval", "1m".to_string()),
                ("startTime", page_start.to_string()),
                ("endTime", end_ms.to_string()),
                ("limit", KLINE_PAGE_LIMIT.to_string()),
            ];

            let Some(response) = self.get(endpoint, &params).await? else {
                break;
            };

            // Klines format: [openTime, open, high, low, close, volume, ...]
            let rows: Vec<serde_json::Value> = response
                .json()
                .await
                .map_err(|e| decode_error(endpoint, e))?;

            let page = parse_klines(&rows);
            let full_page = rows.len() >= KLINE_PAGE_LIMIT;
            let next_start = page.last().map(|c| c.open_time_ms + ONE_MINUTE_MS);

            candles.extend(
                page.into_iter()
                    .filter(|c| c.open_time_ms >= start_ms && c.open_time_ms < end_ms),
            );

            match next_start {
                Some(next) if full_page && next > page_start => page_start = next,
                _ => break,
            }
        }

        info!(
            "MexcMarketDataService: Fetched {} bars for {}",
            candles.len(),
            pair
        );

        Ok(candles)
    }
}

impl MexcMarketDataService {
    /// GET `endpoint`; `Ok(None)` for a non-success status (treated as no data)
    async fn get<K, V>(&self, endpoint: &str, params: &[(K, V)]) -> Result<Option<reqwest::Response>>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = build_url_with_query(&format!("{}{}", self.base_url, endpoint), params)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(
                "MexcMarketDataService: {} - {}",
                MarketDataError::Http {
                    endpoint: endpoint.to_string(),
                    status: status.as_u16(),
                },
                error_text
            );
            return Ok(None);
        }

        Ok(Some(response))
    }
}

fn transport_error(endpoint: &str, err: reqwest_middleware::Error) -> anyhow::Error {
    match err {
        reqwest_middleware::Error::Reqwest(e) if e.is_timeout() => MarketDataError::Timeout {
            endpoint: endpoint.to_string(),
        }
        .into(),
        other => anyhow::Error::from(other).context(format!("Failed to reach MEXC {}", endpoint)),
    }
}

fn decode_error(endpoint: &str, err: reqwest::Error) -> anyhow::Error {
    if err.is_timeout() {
        return MarketDataError::Timeout {
            endpoint: endpoint.to_string(),
        }
        .into();
    }
    anyhow::Error::from(MarketDataError::Decode {
        endpoint: endpoint.to_string(),
        reason: err.to_string(),
    })
}

/// Numbers arrive as JSON strings (prices) or numbers (timestamps)
fn json_f64(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse::<f64>().ok()))
}

/// Convert raw kline rows into candles, skipping malformed rows
pub fn parse_klines(rows: &[serde_json::Value]) -> Vec<Candle> {
    rows.iter()
        .filter_map(|row| {
            let arr = row.as_array()?;
            if arr.len() < 6 {
                return None;
            }

            let open_time_ms = arr[0].as_i64().or_else(|| json_f64(&arr[0]).map(|t| t as i64))?;

            Some(Candle {
                open_time_ms,
                open: json_f64(&arr[1])?,
                high: json_f64(&arr[2])?,
                low: json_f64(&arr[3])?,
                close: json_f64(&arr[4])?,
                volume: json_f64(&arr[5])?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Local HTTP server answering each connection with the next canned
    /// `(status, body)`; the last one repeats. Request targets are recorded.
    struct CannedServer {
        base_url: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl CannedServer {
        async fn start(responses: Vec<(u16, String)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = requests.clone();

            tokio::spawn(async move {
                let mut served = 0;
                while let Ok((mut socket, _)) = listener.accept().await {
                    let mut head = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => head.extend_from_slice(&chunk[..n]),
                        }
                    }

                    let target = String::from_utf8_lossy(&head)
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or_default()
                        .to_string();
                    seen.lock().unwrap().push(target);

                    let (status, body) = &responses[served.min(responses.len() - 1)];
                    served += 1;
                    let reply = format!(
                        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(reply.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });

            Self { base_url, requests }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn service(&self) -> MexcMarketDataService {
            MexcMarketDataService::builder()
                .base_url(self.base_url.clone())
                .timeout(Duration::from_secs(5))
                .max_retries(0)
                .build()
                .unwrap()
        }
    }

    fn kline_rows(start_ms: i64, minutes: std::ops::Range<i64>) -> String {
        let rows: Vec<Value> = minutes
            .map(|m| {
                let open_time = start_ms + m * ONE_MINUTE_MS;
                json!([open_time, "1.0", "1.5", "0.5", "1.2", "10", open_time + 59_999, "12"])
            })
            .collect();
        Value::Array(rows).to_string()
    }

    #[tokio::test]
    async fn test_pair_exists_scans_symbol_list() {
        let body = json!({"symbols": [{"symbol": "ABCUSDT"}, {"symbol": "XYZUSDC"}]}).to_string();
        let server = CannedServer::start(vec![(200, body)]).await;
        let service = server.service();

        assert!(service.pair_exists("ABC", "USDT").await.unwrap());
        assert!(!service.pair_exists("ABC", "USDC").await.unwrap());
        assert_eq!(server.requests()[0], "/exchangeInfo");
    }

    #[tokio::test]
    async fn test_non_success_status_means_no_data() {
        let server = CannedServer::start(vec![
            (500, "{}".to_string()),
            (429, r#"{"msg":"Too many requests"}"#.to_string()),
        ])
        .await;
        let service = server.service();

        assert!(!service.pair_exists("ABC", "USDT").await.unwrap());

        let candles = service
            .klines(&TradingPair::new("ABC", "USDT"), 0, 15 * ONE_MINUTE_MS)
            .await
            .unwrap();
        assert!(candles.is_empty());
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_klines_paginate_and_keep_window() {
        let start = 1_739_188_800_000;
        let end = start + 1002 * ONE_MINUTE_MS;
        // Full first page starting one minute early, short second page
        // running one minute past the end
        let server = CannedServer::start(vec![
            (200, kline_rows(start, -1..999)),
            (200, kline_rows(start, 999..1003)),
        ])
        .await;

        let candles = server
            .service()
            .klines(&TradingPair::new("ABC", "USDT"), start, end)
            .await
            .unwrap();

        assert_eq!(candles.len(), 1002);
        assert_eq!(candles[0].open_time_ms, start);
        assert_eq!(candles[1001].open_time_ms, start + 1001 * ONE_MINUTE_MS);

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("/klines?symbol=ABCUSDT&interval=1m"));
        assert!(requests[1].contains(&format!("startTime={}", start + 999 * ONE_MINUTE_MS)));
    }

    #[tokio::test]
    async fn test_retried_attempts_wait_for_throttler() {
        let server = CannedServer::start(vec![(500, "{}".to_string())]).await;
        let throttler = Arc::new(RequestThrottler::with_window(
            "test",
            1,
            Duration::from_secs(60),
        ));
        let service = MexcMarketDataService::builder()
            .base_url(server.base_url.clone())
            .max_retries(1)
            .throttler(throttler)
            .build()
            .unwrap();

        // The retry (backoff at most 1s) is held back by the full window
        let outcome =
            tokio::time::timeout(Duration::from_secs(3), service.pair_exists("ABC", "USDT")).await;

        assert!(outcome.is_err());
        assert_eq!(server.requests().len(), 1);
    }

    #[test]
    fn test_parse_klines_string_prices() {
        let rows = vec![
            json!([1739188800000i64, "1.10", "1.30", "1.00", "1.20", "1500.5", 1739188859999i64, "1800.6"]),
            json!([1739188860000i64, "1.20", "1.25", "1.15", "1.22", "900", 1739188919999i64, "1098"]),
        ];

        let candles = parse_klines(&rows);

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time_ms, 1_739_188_800_000);
        assert_eq!(candles[0].open, 1.10);
        assert_eq!(candles[0].high, 1.30);
        assert_eq!(candles[1].close, 1.22);
        assert_eq!(candles[1].volume, 900.0);
    }

    #[test]
    fn test_parse_klines_numeric_prices() {
        let rows = vec![json!([60000, 1.0, 2.0, 0.5, 1.5, 10])];
        let candles = parse_klines(&rows);
        assert_eq!(candles[0].low, 0.5);
        assert_eq!(candles[0].volume, 10.0);
    }

    #[test]
    fn test_parse_klines_skips_malformed_rows() {
        let rows = vec![
            json!([1, "1", "1", "1"]),
            json!({"openTime": 1}),
            json!([1, "x", "1", "1", "1", "1"]),
            json!([2, "1", "1", "1", "1", "1"]),
        ];

        let candles = parse_klines(&rows);
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open_time_ms, 2);
    }

    #[test]
    fn test_exchange_info_shape() {
        let info: ExchangeInfo = serde_json::from_value(json!({
            "timezone": "CST",
            "symbols": [
                {"symbol": "ABCUSDT", "status": "1", "baseAsset": "ABC"},
                {"symbol": "XYZUSDC", "status": "1"}
            ]
        }))
        .unwrap();

        assert!(info.symbols.iter().any(|s| s.symbol == "ABCUSDT"));
        assert_eq!(info.symbols.len(), 2);
    }

    #[test]
    fn test_builder_defaults() {
        let service = MexcMarketDataService::builder()
            .base_url("https://api.mexc.com/api/v3/".to_string())
            .build()
            .unwrap();
        assert_eq!(service.base_url, "https://api.mexc.com/api/v3");
    }
}

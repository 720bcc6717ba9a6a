use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Sliding-window limiter shared by every request to one API.
///
/// At most `max_requests` calls to [`acquire`](Self::acquire) complete
/// within any `window`; callers over the limit wait, FIFO by lock order.
pub struct RequestThrottler {
    name: String,
    max_requests: usize,
    window: Duration,
    recent_requests: Mutex<VecDeque<Instant>>,
}

impl RequestThrottler {
    pub fn per_minute(name: impl Into<String>, max_requests: usize) -> Self {
        Self::with_window(name, max_requests, Duration::from_secs(60))
    }

    pub fn with_window(name: impl Into<String>, max_requests: usize, window: Duration) -> Self {
        Self {
            name: name.into(),
            max_requests,
            window,
            recent_requests: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a request slot is free and claim it. A limit of 0 disables
    /// throttling.
    pub async fn acquire(&self) {
        if self.max_requests == 0 {
            return;
        }

        loop {
            let wait = {
                let mut recent = self.recent_requests.lock().await;
                let now = Instant::now();

                while let Some(&oldest) = recent.front() {
                    if now.duration_since(oldest) >= self.window {
                        recent.pop_front();
                    } else {
                        break;
                    }
                }

                if recent.len() < self.max_requests {
                    recent.push_back(now);
                    return;
                }

                match recent.front() {
                    Some(&oldest) => self.window.saturating_sub(now.duration_since(oldest)),
                    None => Duration::ZERO,
                }
            };

            debug!(
                "RequestThrottler [{}]: Rate limit reached, waiting {:?}",
                self.name, wait
            );
            tokio::time::sleep(wait).await;
        }
    }
}

/// Claims a [`RequestThrottler`] slot before every attempt.
///
/// Registered after the retry middleware, so retried attempts (429s
/// included) are throttled like first attempts.
pub struct ThrottleMiddleware {
    throttler: Arc<RequestThrottler>,
}

impl ThrottleMiddleware {
    pub fn new(throttler: Arc<RequestThrottler>) -> Self {
        Self { throttler }
    }
}

#[async_trait]
impl Middleware for ThrottleMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        self.throttler.acquire().await;
        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_under_limit_is_immediate() {
        let throttler = RequestThrottler::with_window("test", 5, Duration::from_secs(10));
        let start = Instant::now();

        for _ in 0..5 {
            throttler.acquire().await;
        }

        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_over_limit_waits_for_window() {
        let throttler = RequestThrottler::with_window("test", 2, Duration::from_millis(200));
        let start = Instant::now();

        for _ in 0..3 {
            throttler.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_millis(190));
    }

    #[tokio::test]
    async fn test_concurrent_callers_respect_limit() {
        let throttler = Arc::new(RequestThrottler::with_window(
            "test",
            3,
            Duration::from_millis(300),
        ));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let throttler = throttler.clone();
            handles.push(tokio::spawn(async move {
                throttler.acquire().await;
                Instant::now()
            }));
        }

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        // The 4th slot opens only after the first window elapsed
        assert!(times[3].duration_since(times[0]) >= Duration::from_millis(290));
    }

    #[tokio::test]
    async fn test_zero_limit_disables_throttling() {
        let throttler = RequestThrottler::per_minute("test", 0);
        for _ in 0..100 {
            throttler.acquire().await;
        }
    }

    #[tokio::test]
    async fn test_acquire_pends_while_window_is_full() {
        let throttler = RequestThrottler::with_window("test", 1, Duration::from_secs(60));

        assert_ready!(task::spawn(throttler.acquire()).poll());

        let mut second = task::spawn(throttler.acquire());
        assert_pending!(second.poll());
        assert_pending!(second.poll());
    }
}

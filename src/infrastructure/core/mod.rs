pub mod http_client_factory;
pub mod request_throttler;

pub use http_client_factory::HttpClientFactory;
pub use request_throttler::{RequestThrottler, ThrottleMiddleware};

pub mod cached_exchange;
pub mod core;
pub mod factory;
pub mod file_store;
pub mod mexc;
pub mod mock;

pub use cached_exchange::CachedExchangeApi;
pub use mexc::MexcMarketDataService;
pub use mock::MockExchangeApi;

pub mod pair_resolver;
pub mod window_aggregator;

pub use pair_resolver::PairResolver;
pub use window_aggregator::WindowAggregator;

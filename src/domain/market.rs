use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Number of evenly spaced close prices sampled per window
pub const INTERVAL_SAMPLE_COUNT: usize = 10;

/// Quote assets tried, in order, when the requested quote is not listed
pub const CANONICAL_QUOTES: [&str; 2] = ["USDT", "USDC"];

/// One-minute OHLCV candle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A base/quote pair known to be tradable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Exchange symbol (ABC + USDT -> ABCUSDT)
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl std::fmt::Display for TradingPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Close prices sampled at `INTERVAL_SAMPLE_COUNT` points of a window.
///
/// Serialized flat as `interval_price_1..interval_price_10`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntervalSamples(pub [Option<f64>; INTERVAL_SAMPLE_COUNT]);

impl IntervalSamples {
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

impl Serialize for IntervalSamples {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(INTERVAL_SAMPLE_COUNT))?;
        for (i, sample) in self.0.iter().enumerate() {
            map.serialize_entry(&format!("interval_price_{}", i + 1), sample)?;
        }
        map.end()
    }
}

/// Price and volume behaviour of a pair over one window.
///
/// All fields are `None` together when no candle data exists.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MarketWindowStats {
    #[serde(rename = "open_price")]
    pub open: Option<f64>,
    #[serde(rename = "close_price")]
    pub close: Option<f64>,
    #[serde(rename = "max_price")]
    pub max: Option<f64>,
    #[serde(rename = "min_price")]
    pub min: Option<f64>,
    pub volume: Option<f64>,
    #[serde(flatten)]
    pub interval_samples: IntervalSamples,
}

impl MarketWindowStats {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_none()
            && self.close.is_none()
            && self.max.is_none()
            && self.min.is_none()
            && self.volume.is_none()
            && self.interval_samples.is_empty()
    }
}

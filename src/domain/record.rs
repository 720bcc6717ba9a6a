use crate::domain::market::MarketWindowStats;
use crate::domain::signal::ParsedSignal;
use serde::{Deserialize, Serialize};

/// Terminal output unit: a parsed signal plus its market window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub signal: ParsedSignal,
    pub found_outcoin: Option<String>,
    pub final_duration_minutes: u64,
    #[serde(flatten)]
    pub stats: MarketWindowStats,
}

impl EnrichedRecord {
    /// Record for a signal whose pair could not be resolved
    pub fn unresolved(signal: ParsedSignal) -> Self {
        Self::new(signal, None, MarketWindowStats::empty())
    }

    /// Stats are dropped when no quote was found, so a record never carries
    /// market data for an unresolved pair.
    pub fn new(
        signal: ParsedSignal,
        found_outcoin: Option<String>,
        stats: MarketWindowStats,
    ) -> Self {
        let final_duration_minutes = signal.final_duration_minutes();
        let stats = if found_outcoin.is_some() {
            stats
        } else {
            MarketWindowStats::empty()
        };

        Self {
            signal,
            found_outcoin,
            final_duration_minutes,
            stats,
        }
    }
}

/// A message that could not be processed, kept for offline inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedMessage {
    pub message_id: i64,
    pub error: String,
    pub message_text: String,
}

//! Turns a raw alert message into a [`ParsedSignal`].
//!
//! Field groups are located in two passes: an outer pattern isolates the
//! line that starts at an anchor keyword, then inner patterns run against
//! that line only. A number on an unrelated line can therefore never be
//! attributed to the wrong group. Market metrics are the exception and are
//! searched in the whole message by their own labels.

use crate::application::extraction::vocabulary::Vocabulary;
use crate::domain::errors::{ExtractionError, NumericFormatError};
use crate::domain::numeric::normalize;
use crate::domain::signal::{ParsedSignal, Position, RawMessage};
use regex::Regex;
use tracing::debug;

const CURRENCY_MARKER: char = '$';
const ROUTE_ANCHOR: &str = "Route:";
const MEXC_TOKEN: &str = "MEXC";

// Matches nothing; stands in for an empty keyword list.
const NEVER: &str = r"[^\s\S]";

struct MetricPatterns {
    market_cap: Regex,
    liquidity: Regex,
    price: Regex,
    vi_1h: Regex,
    volume_5m: Regex,
    volume_1h: Regex,
}

impl MetricPatterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            market_cap: Regex::new(r"MC\s*:\s*\$([\d.,]+[KMB])")?,
            liquidity: Regex::new(r"Liq\s*:\s*\$([\d.,]+[KMB])")?,
            price: Regex::new(r"Price\s*:\s*\$([\d.,]+[KMB]?)")?,
            vi_1h: Regex::new(r"VI1h\s*:\s*([\d.,]+)%")?,
            volume_5m: Regex::new(r"V-5m\s*:\s*\$([\d.,]+[KMB])")?,
            volume_1h: Regex::new(r"V-1h\s*:\s*\$([\d.,]+[KMB])")?,
        })
    }
}

#[derive(Debug, Default, PartialEq)]
struct OrderTerms {
    buy_amount: Option<f64>,
    sell_amount: Option<f64>,
    sell_interval_seconds: Option<u64>,
}

pub struct FieldExtractor {
    vocabulary: Vocabulary,
    position_section: Regex,
    amount: Regex,
    interval: Regex,
    duration_section: Regex,
    duration_part: Regex,
    route_section: Regex,
    coin: Regex,
    metrics: MetricPatterns,
}

impl std::fmt::Debug for FieldExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldExtractor")
            .field("vocabulary", &self.vocabulary)
            .finish_non_exhaustive()
    }
}

fn alternation<'a>(words: impl IntoIterator<Item = &'a String>) -> String {
    let escaped: Vec<String> = words.into_iter().map(|w| regex::escape(w)).collect();
    if escaped.is_empty() {
        NEVER.to_string()
    } else {
        escaped.join("|")
    }
}

/// Outer pattern: from any of `anchors` up to the end of the line
fn section_pattern<'a>(anchors: impl IntoIterator<Item = &'a String>) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?:{})[^\n]*", alternation(anchors)))
}

fn parse_count(digits: &str) -> Result<u64, NumericFormatError> {
    digits.parse::<u64>().map_err(|_| NumericFormatError {
        value: digits.to_string(),
    })
}

impl FieldExtractor {
    pub fn new(vocabulary: Vocabulary) -> Result<Self, regex::Error> {
        let interval = format!(
            r"(?:{})\s+(\d+)\s*(?:{})",
            alternation(&vocabulary.interval_prefixes),
            alternation(&vocabulary.second_units)
        );

        Ok(Self {
            position_section: section_pattern(vocabulary.position_keywords())?,
            // Malformed tokens such as `$1.2.3K` are skipped, not fatal
            amount: Regex::new(r"\$(\d+(?:,\d{3})*(?:\.\d+)?[KM])\b")?,
            interval: Regex::new(&interval)?,
            duration_section: section_pattern(&vocabulary.duration_anchors)?,
            duration_part: Regex::new(r"(\d+)\s*(\w+)")?,
            route_section: section_pattern([&ROUTE_ANCHOR.to_string()])?,
            coin: Regex::new(r"\$(\w+)")?,
            metrics: MetricPatterns::new()?,
            vocabulary,
        })
    }

    /// Extract all fields of one message.
    ///
    /// A numeric token that fails to normalize discards the whole message.
    pub fn extract(&self, raw: &RawMessage) -> Result<ParsedSignal, ExtractionError> {
        let text = raw.text.as_str();

        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText);
        }
        if !text.contains(CURRENCY_MARKER) || !text.contains(ROUTE_ANCHOR) {
            return Err(ExtractionError::AnchorMissing);
        }

        let orders = self.order_terms(text)?;
        let (dca_coin, out_coin) = self.route(text);
        let metric = |pattern: &Regex| -> Result<Option<f64>, NumericFormatError> {
            pattern
                .captures(text)
                .map(|caps| normalize(&caps[1]))
                .transpose()
        };

        let signal = ParsedSignal {
            message_id: raw.message_id,
            date: raw.date.clone(),
            time: raw.time.clone(),
            timezone: raw.timezone.clone(),
            position: self.position(text),
            buy_amount: orders.buy_amount,
            sell_amount: orders.sell_amount,
            sell_interval_seconds: orders.sell_interval_seconds,
            duration_minutes: self.duration_minutes(text)?,
            dca_coin,
            out_coin,
            market_cap: metric(&self.metrics.market_cap)?,
            liquidity: metric(&self.metrics.liquidity)?,
            price: metric(&self.metrics.price)?,
            vi_1h_pct: metric(&self.metrics.vi_1h)?,
            volume_5m: metric(&self.metrics.volume_5m)?,
            volume_1h: metric(&self.metrics.volume_1h)?,
            has_mexc_mention: text.contains(MEXC_TOKEN),
            original_text: raw.text.clone(),
        };

        debug!(
            "FieldExtractor: message {} -> {:?} {:?}/{:?}",
            signal.message_id, signal.position, signal.dca_coin, signal.out_coin
        );

        Ok(signal)
    }

    fn position(&self, text: &str) -> Position {
        if self.vocabulary.selling.iter().any(|k| text.contains(k.as_str())) {
            Position::Short
        } else if self.vocabulary.buying.iter().any(|k| text.contains(k.as_str())) {
            Position::Long
        } else {
            Position::Unknown
        }
    }

    fn order_terms(&self, text: &str) -> Result<OrderTerms, NumericFormatError> {
        let Some(section) = self.position_section.find(text) else {
            return Ok(OrderTerms::default());
        };
        let section = section.as_str();

        // Amounts come as a buy/sell pair; a lone amount is ignored
        let amounts: Vec<&str> = self
            .amount
            .captures_iter(section)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .take(2)
            .collect();
        let (buy_amount, sell_amount) = match amounts.as_slice() {
            [buy, sell] => (Some(normalize(buy)?), Some(normalize(sell)?)),
            _ => (None, None),
        };

        let sell_interval_seconds = self
            .interval
            .captures(section)
            .map(|caps| parse_count(&caps[1]))
            .transpose()?;

        Ok(OrderTerms {
            buy_amount,
            sell_amount,
            sell_interval_seconds,
        })
    }

    fn duration_minutes(&self, text: &str) -> Result<u64, NumericFormatError> {
        let Some(section) = self.duration_section.find(text) else {
            return Ok(0);
        };

        let mut total: u64 = 0;
        for caps in self.duration_part.captures_iter(section.as_str()) {
            let number = parse_count(&caps[1])?;
            total = total.saturating_add(self.vocabulary.unit_minutes(number, &caps[2]));
        }
        Ok(total)
    }

    fn route(&self, text: &str) -> (Option<String>, Option<String>) {
        let Some(section) = self.route_section.find(text) else {
            return (None, None);
        };

        let coins: Vec<&str> = self
            .coin
            .captures_iter(section.as_str())
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();

        match coins.as_slice() {
            [base, quote] => (Some(base.to_string()), Some(quote.to_string())),
            _ => (None, None),
        }
    }
}

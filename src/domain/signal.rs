use crate::domain::errors::PipelineError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};

/// Shortest market window, in minutes, aggregated for any signal
pub const MIN_WINDOW_MINUTES: u64 = 15;

/// A chat message as delivered by the message source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(alias = "id")]
    pub message_id: i64,
    #[serde(
        rename = "message_text",
        alias = "text",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub text: String,
    pub date: String,
    pub time: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub timezone: String,
}

/// Trade direction announced by a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Long,
    Short,
    #[default]
    Unknown,
}

/// Structured fields extracted from one signal message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSignal {
    pub message_id: i64,
    pub date: String,
    pub time: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub timezone: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub buy_amount: Option<f64>,
    #[serde(default)]
    pub sell_amount: Option<f64>,
    #[serde(default, alias = "sell_interval")]
    pub sell_interval_seconds: Option<u64>,
    #[serde(default, alias = "duration")]
    pub duration_minutes: u64,
    #[serde(rename = "DCA_coin", default)]
    pub dca_coin: Option<String>,
    #[serde(rename = "OutCoin", default)]
    pub out_coin: Option<String>,
    #[serde(rename = "MC", default)]
    pub market_cap: Option<f64>,
    #[serde(rename = "Liq", default)]
    pub liquidity: Option<f64>,
    #[serde(rename = "Price", default)]
    pub price: Option<f64>,
    #[serde(rename = "VI1h_pct", alias = "VI1h", default)]
    pub vi_1h_pct: Option<f64>,
    #[serde(rename = "V_5m", alias = "V-5m", default)]
    pub volume_5m: Option<f64>,
    #[serde(rename = "V_1h", alias = "V-1h", default)]
    pub volume_1h: Option<f64>,
    #[serde(
        rename = "has_MEXC_mention",
        alias = "MEXC",
        default,
        deserialize_with = "bool_or_flag"
    )]
    pub has_mexc_mention: bool,
    #[serde(alias = "original_message", default, deserialize_with = "null_as_empty")]
    pub original_text: String,
}

impl ParsedSignal {
    /// Window length actually aggregated for this signal
    pub fn final_duration_minutes(&self) -> u64 {
        self.duration_minutes.max(MIN_WINDOW_MINUTES)
    }

    /// Message timestamp in its own offset
    pub fn posted_at(&self) -> Result<DateTime<FixedOffset>, PipelineError> {
        parse_timestamp(&self.date, &self.time, &self.timezone)
    }

    /// Aggregation window `[start_ms, end_ms)` in epoch milliseconds
    pub fn window_ms(&self) -> Result<(i64, i64), PipelineError> {
        let start_ms = self.posted_at()?.timestamp_millis();
        let length_ms = i64::try_from(self.final_duration_minutes())
            .unwrap_or(i64::MAX)
            .saturating_mul(60_000);
        Ok((start_ms, start_ms.saturating_add(length_ms)))
    }
}

/// Combine `Y-M-D`, `H:M:S` (or `H:M`) and a `±HH:MM` / `±HHMM` offset.
///
/// Empty, `UTC` and `Z` offsets are UTC.
pub fn parse_timestamp(
    date: &str,
    time: &str,
    timezone: &str,
) -> Result<DateTime<FixedOffset>, PipelineError> {
    let invalid = || PipelineError::InvalidTimestamp {
        value: format!("{} {} {}", date, time, timezone).trim().to_string(),
    };

    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M"))
        .map_err(|_| invalid())?;
    let offset = parse_offset(timezone).ok_or_else(invalid)?;

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(invalid)
}

fn parse_offset(timezone: &str) -> Option<FixedOffset> {
    let tz = timezone.trim();
    if tz.is_empty() || tz.eq_ignore_ascii_case("UTC") || tz == "Z" {
        return FixedOffset::east_opt(0);
    }

    let sign = match tz.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let digits: String = tz[1..].chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// Older exports store the MEXC flag as 0/1.
fn bool_or_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(n)) => n != 0,
        None => false,
    })
}

//! Configuration module for signal-enricher.
//!
//! Configuration is loaded from environment variables (optionally seeded
//! from a `.env` file), organized by concern: Exchange and Pipeline.

mod exchange_config;
mod pipeline_config;

pub use exchange_config::ExchangeEnvConfig;
pub use pipeline_config::PipelineEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Source of configuration values, keyed by variable name
pub type EnvLookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// Parse `key` if set, else use `default`
pub(crate) fn parse_or<T>(lookup: &EnvLookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub exchange: ExchangeEnvConfig,
    pub pipeline: PipelineEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: &EnvLookup<'_>) -> Result<Self> {
        Ok(Self {
            exchange: ExchangeEnvConfig::from_lookup(lookup)?,
            pipeline: PipelineEnvConfig::from_lookup(lookup)?,
        })
    }
}

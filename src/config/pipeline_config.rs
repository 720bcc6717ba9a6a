use super::{EnvLookup, parse_or};
use anyhow::Result;
use std::path::PathBuf;

/// Batch pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineEnvConfig {
    /// Messages enriched concurrently
    pub concurrency: usize,
    pub output_dir: PathBuf,
}

impl Default for PipelineEnvConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            output_dir: PathBuf::from("data"),
        }
    }
}

impl PipelineEnvConfig {
    pub(crate) fn from_lookup(lookup: &EnvLookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        let concurrency: usize = parse_or(lookup, "PIPELINE_CONCURRENCY", defaults.concurrency)?;

        if concurrency == 0 {
            anyhow::bail!("Invalid PIPELINE_CONCURRENCY: must be at least 1");
        }

        Ok(Self {
            concurrency,
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        })
    }
}

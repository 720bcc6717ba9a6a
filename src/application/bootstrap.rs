use crate::application::extraction::{FieldExtractor, Vocabulary};
use crate::application::pipeline::BatchPipeline;
use crate::config::Config;
use crate::domain::ports::ExchangeMarketApi;
use crate::infrastructure::factory::ServiceFactory;
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct PipelineBootstrap;

impl PipelineBootstrap {
    /// Pipeline against the live exchange described by `config`
    pub fn init(config: &Config) -> Result<BatchPipeline> {
        let api = ServiceFactory::create_exchange_api(&config.exchange)
            .context("Failed to create exchange client")?;
        Self::with_api(config, api)
    }

    /// Pipeline against any exchange implementation
    pub fn with_api(config: &Config, api: Arc<dyn ExchangeMarketApi>) -> Result<BatchPipeline> {
        let extractor = FieldExtractor::new(Vocabulary::default())
            .context("Failed to compile extraction patterns")?;

        Ok(BatchPipeline::new(api, extractor).with_concurrency(config.pipeline.concurrency))
    }
}

//! Batch orchestration: extraction, pair resolution and window aggregation
//! per message, fanned out over a bounded worker pool.
//!
//! Per message the flow is `Received -> Extracted -> PairResolved ->
//! WindowComputed -> Emitted`, or `Received -> Failed`. Only extraction
//! (and an unusable timestamp) can fail a message; exchange gaps degrade
//! to null market data. Results come back in input order.

use crate::application::enrichment::{PairResolver, WindowAggregator};
use crate::application::extraction::FieldExtractor;
use crate::domain::errors::PipelineError;
use crate::domain::ports::ExchangeMarketApi;
use crate::domain::record::{EnrichedRecord, FailedMessage};
use crate::domain::signal::{ParsedSignal, RawMessage};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a batch: emitted records in input order plus the failure
/// side channel
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<EnrichedRecord>,
    pub failures: Vec<FailedMessage>,
    /// Set when the run stopped before every message was processed
    pub interrupted: bool,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.records.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Outcome of the extraction stage alone
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub signals: Vec<ParsedSignal>,
    pub failures: Vec<FailedMessage>,
}

pub struct BatchPipeline {
    extractor: FieldExtractor,
    resolver: PairResolver,
    aggregator: WindowAggregator,
    concurrency: usize,
}

fn failed(message_id: i64, text: &str, error: &PipelineError) -> FailedMessage {
    FailedMessage {
        message_id,
        error: error.to_string(),
        message_text: text.to_string(),
    }
}

impl BatchPipeline {
    pub fn new(api: Arc<dyn ExchangeMarketApi>, extractor: FieldExtractor) -> Self {
        Self {
            extractor,
            resolver: PairResolver::new(api.clone()),
            aggregator: WindowAggregator::new(api),
            concurrency: 1,
        }
    }

    /// Number of messages in flight at once (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run extraction only
    pub fn extract_all(&self, messages: &[RawMessage]) -> ExtractionReport {
        let mut report = ExtractionReport::default();

        for raw in messages {
            match self.extractor.extract(raw) {
                Ok(signal) => report.signals.push(signal),
                Err(e) => {
                    warn!("Pipeline: Message {} not extracted: {}", raw.message_id, e);
                    report
                        .failures
                        .push(failed(raw.message_id, &raw.text, &e.into()));
                }
            }
        }

        info!(
            "Pipeline: Extracted {} of {} messages ({} failed)",
            report.signals.len(),
            messages.len(),
            report.failures.len()
        );
        report
    }

    /// Resolve the pair and aggregate the market window of one signal.
    ///
    /// An unresolved pair is a valid outcome with null market fields.
    pub async fn enrich(&self, signal: ParsedSignal) -> Result<EnrichedRecord, PipelineError> {
        let Some(pair) = self
            .resolver
            .resolve_pair(signal.dca_coin.as_deref(), signal.out_coin.as_deref())
            .await
        else {
            debug!("Pipeline: Message {} has no tradable pair", signal.message_id);
            return Ok(EnrichedRecord::unresolved(signal));
        };

        let (start_ms, end_ms) = signal.window_ms()?;
        let stats = self.aggregator.aggregate(&pair, start_ms, end_ms).await;

        debug!(
            "Pipeline: Message {} enriched with {} over {} min",
            signal.message_id,
            pair,
            signal.final_duration_minutes()
        );
        Ok(EnrichedRecord::new(signal, Some(pair.quote), stats))
    }

    /// Full processing of one raw message
    pub async fn process(&self, raw: &RawMessage) -> Result<EnrichedRecord, FailedMessage> {
        let signal = self.extractor.extract(raw).map_err(|e| {
            warn!("Pipeline: Message {} not extracted: {}", raw.message_id, e);
            failed(raw.message_id, &raw.text, &e.into())
        })?;

        self.enrich_signal(signal).await
    }

    async fn enrich_signal(&self, signal: ParsedSignal) -> Result<EnrichedRecord, FailedMessage> {
        let message_id = signal.message_id;
        let text = signal.original_text.clone();

        self.enrich(signal).await.map_err(|e| {
            warn!("Pipeline: Message {} not enriched: {}", message_id, e);
            failed(message_id, &text, &e)
        })
    }

    /// Process every message; see [`run_until`](Self::run_until)
    pub async fn run(&self, messages: &[RawMessage]) -> BatchReport {
        self.run_until(messages, std::future::pending()).await
    }

    /// Process messages until done or until `shutdown` completes.
    ///
    /// On shutdown, messages still in flight are dropped and everything
    /// already emitted is returned.
    pub async fn run_until(
        &self,
        messages: &[RawMessage],
        shutdown: impl Future<Output = ()>,
    ) -> BatchReport {
        info!(
            "Pipeline: Processing {} messages (concurrency {})",
            messages.len(),
            self.concurrency
        );

        let tasks = messages.iter().map(|raw| self.process(raw));
        self.collect_ordered(tasks, shutdown).await
    }

    /// Enrich signals extracted by an earlier run
    pub async fn enrich_signals(
        &self,
        signals: Vec<ParsedSignal>,
        shutdown: impl Future<Output = ()>,
    ) -> BatchReport {
        info!(
            "Pipeline: Enriching {} signals (concurrency {})",
            signals.len(),
            self.concurrency
        );

        let tasks = signals.into_iter().map(|signal| self.enrich_signal(signal));
        self.collect_ordered(tasks, shutdown).await
    }

    async fn collect_ordered<I, F>(&self, tasks: I, shutdown: impl Future<Output = ()>) -> BatchReport
    where
        I: Iterator<Item = F>,
        F: Future<Output = Result<EnrichedRecord, FailedMessage>>,
    {
        // `buffered` yields in submission order regardless of completion order
        let results = stream::iter(tasks).buffered(self.concurrency);
        let mut report = BatchReport::default();
        tokio::pin!(results);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    warn!(
                        "Pipeline: Interrupted after {} records, dropping in-flight messages",
                        report.succeeded() + report.failed()
                    );
                    report.interrupted = true;
                    break;
                }

                next = results.next() => match next {
                    Some(Ok(record)) => report.records.push(record),
                    Some(Err(failure)) => report.failures.push(failure),
                    None => break,
                },
            }
        }

        info!(
            "Pipeline: Finished - {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }
}

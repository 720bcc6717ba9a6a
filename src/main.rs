//! signal-enricher - batch CLI
//!
//! Turns exported chat alerts into structured, market-enriched records.
//!
//! # Usage
//! ```sh
//! signal-enricher run --input messages/messages_2025-02-11_08-46-04.json
//! signal-enricher extract --input messages/messages_2025-02-11_08-46-04.json
//! signal-enricher enrich --input data/parsed_messages_2025-02-12_09-26-40.json
//! ```
//!
//! # Environment Variables
//! See `Config::from_env` (`MEXC_BASE_URL`, `EXCHANGE_TIMEOUT_SECS`,
//! `PIPELINE_CONCURRENCY`, `OUTPUT_DIR`, ...). A `.env` file is honoured.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use signal_enricher::application::bootstrap::PipelineBootstrap;
use signal_enricher::application::pipeline::BatchReport;
use signal_enricher::config::Config;
use signal_enricher::domain::record::FailedMessage;
use signal_enricher::domain::signal::{ParsedSignal, RawMessage};
use signal_enricher::infrastructure::file_store;
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Trading alert extractor and market enricher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract signal fields from exported chat messages (no network)
    Extract {
        /// JSON array of raw messages
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (overrides OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Enrich previously extracted signals with market data
    Enrich {
        /// JSON array of extracted signals
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (overrides OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Messages processed concurrently (overrides PIPELINE_CONCURRENCY)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Extract and enrich in one pass
    Run {
        /// JSON array of raw messages
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (overrides OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Messages processed concurrently (overrides PIPELINE_CONCURRENCY)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
}

/// Completes on Ctrl+C; never completes if the signal cannot be installed
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("Ctrl+C handler unavailable, run cannot be interrupted gracefully");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received. Saving processed messages...");
}

fn apply_overrides(config: &mut Config, output_dir: Option<PathBuf>, concurrency: Option<usize>) {
    if let Some(dir) = output_dir {
        config.pipeline.output_dir = dir;
    }
    if let Some(n) = concurrency {
        config.pipeline.concurrency = n.max(1);
    }
}

fn save_failures(dir: &Path, failures: &[FailedMessage]) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    let path = file_store::save_timestamped(dir, "failed_messages", failures)?;
    info!("{} failed messages saved to {}", failures.len(), path.display());
    Ok(())
}

fn save_report(dir: &Path, report: &BatchReport) -> Result<()> {
    let path = file_store::save_timestamped(dir, "processed_messages", &report.records)?;
    save_failures(dir, &report.failures)?;

    println!(
        "Processed {} messages ({} failed){}, saved to {}",
        report.succeeded(),
        report.failed(),
        if report.interrupted { ", interrupted" } else { "" },
        path.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Extract { input, output_dir } => {
            apply_overrides(&mut config, output_dir, None);
            let messages: Vec<RawMessage> = file_store::load_json_array(&input)?;

            // Exchange client is built but never called on this path
            let pipeline = PipelineBootstrap::init(&config)?;
            let report = pipeline.extract_all(&messages);

            let dir = &config.pipeline.output_dir;
            let path = file_store::save_timestamped(dir, "parsed_messages", &report.signals)?;
            save_failures(dir, &report.failures)?;

            println!(
                "Processed {} messages ({} failed), saved to {}",
                report.signals.len(),
                report.failures.len(),
                path.display()
            );
        }
        Commands::Enrich {
            input,
            output_dir,
            concurrency,
        } => {
            apply_overrides(&mut config, output_dir, concurrency);
            let signals: Vec<ParsedSignal> = file_store::load_json_array(&input)?;

            let pipeline = PipelineBootstrap::init(&config)?;
            let report = pipeline.enrich_signals(signals, shutdown_signal()).await;

            save_report(&config.pipeline.output_dir, &report)?;
        }
        Commands::Run {
            input,
            output_dir,
            concurrency,
        } => {
            apply_overrides(&mut config, output_dir, concurrency);
            let messages: Vec<RawMessage> = file_store::load_json_array(&input)?;

            let pipeline = PipelineBootstrap::init(&config)?;
            let report = pipeline.run_until(&messages, shutdown_signal()).await;

            save_report(&config.pipeline.output_dir, &report)?;
        }
    }

    Ok(())
}

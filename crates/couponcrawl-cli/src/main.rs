//! Process bootstrap for the coupon crawler: env + flags in, NDJSON out.

use std::io::Write;

use clap::Parser;

use couponcrawl_core::{load_crawl_config, BrandRecord, RecordSink, SeedMode, SinkError};
use couponcrawl_scraper::Crawler;

#[derive(Debug, Parser)]
#[command(name = "couponcrawl")]
#[command(about = "Crawl a coupon-listing site into brand records with revealed codes")]
struct Cli {
    /// Seed brand-list URL; repeatable. Overrides COUPONCRAWL_SEED_URLS and
    /// the all-brand-letters default.
    #[arg(long = "seed")]
    seeds: Vec<String>,
}

/// Writes one JSON line per emitted brand record to stdout.
struct NdjsonSink {
    out: std::io::Stdout,
}

impl RecordSink for NdjsonSink {
    async fn emit(&mut self, record: BrandRecord) -> Result<(), SinkError> {
        let line = serde_json::to_string(&record).map_err(|e| {
            SinkError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        let mut handle = self.out.lock();
        writeln!(handle, "{line}")?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = load_crawl_config()?;
    if !cli.seeds.is_empty() {
        config.seed_mode = SeedMode::Explicit(cli.seeds.clone());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let mut sink = NdjsonSink {
        out: std::io::stdout(),
    };
    let mut crawler = Crawler::new(config)?;
    let summary = crawler.run(&mut sink).await?;

    tracing::info!(
        brands_emitted = summary.brands_emitted,
        offers_total = summary.offers_total,
        offers_without_code = summary.offers_without_code,
        requests_dropped = summary.requests_dropped,
        "run complete"
    );
    Ok(())
}

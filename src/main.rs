//! cardscan - batch trading-card scanner
//!
//! Digitizes photographed card images into renamed copies plus a CSV report
//! using user-defined OCR capture zones, then enriches the report with market
//! price estimates scraped from sold listings.

mod app;
mod config;
mod editor;
mod extract;
mod matcher;
mod pricing;
mod report;
mod session;
mod vision;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::AppConfig;
use crate::pricing::ebay::EbayProvider;
use crate::pricing::enrich::{spawn_enrich, EnrichOptions, EnrichProgress};
use crate::pricing::PricePolicy;

/// cardscan - zone-based card scanning and price lookup
#[derive(Parser, Debug)]
#[command(name = "cardscan")]
#[command(about = "Batch trading-card scanner with OCR zones and price lookup")]
struct Args {
    /// Enrich an existing report CSV with prices and exit (no GUI)
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Column to use as the search key for --prices
    #[arg(long, default_value = "Card Name")]
    column: String,

    /// Aggregation policy for --prices: median or recent
    #[arg(long)]
    policy: Option<PricePolicy>,

    /// Seconds between successive price searches
    #[arg(long)]
    pacing: Option<u64>,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = load_or_create_config();

    if let Some(csv) = args.prices {
        return run_price_update(csv, &args.column, &config, args.policy, args.pacing);
    }

    info!("Card Scanner starting...");
    app::run_app(config)
}

/// Load configuration from file or create default
fn load_or_create_config() -> AppConfig {
    if let Ok(config_dir) = config::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Headless price enrichment over an existing report CSV.
fn run_price_update(
    csv: PathBuf,
    column: &str,
    config: &AppConfig,
    policy: Option<PricePolicy>,
    pacing: Option<u64>,
) -> Result<()> {
    if !csv.is_file() {
        bail!("report CSV not found: {}", csv.display());
    }

    let opts = EnrichOptions {
        policy: policy.unwrap_or(config.pricing.policy),
        pacing: Duration::from_secs(pacing.unwrap_or(config.pricing.pacing_secs)),
        max_samples: config.pricing.max_samples,
    };
    info!(policy = opts.policy.label(), "price update starting");

    let provider = EbayProvider::new()?;
    let cancel = Arc::new(AtomicBool::new(false));
    let rx = spawn_enrich(csv, column.to_string(), Box::new(provider), opts, cancel);

    for msg in rx.iter() {
        match msg {
            EnrichProgress::Row(line) => println!("{line}"),
            EnrichProgress::Done(path) => {
                println!("Prices written to {}", path.display());
                return Ok(());
            }
            EnrichProgress::Failed(e) => bail!("price update failed: {e}"),
        }
    }
    Ok(())
}

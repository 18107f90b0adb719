//! meanrev: single-run backtest CLI.
//!
//! Loads a month-or-more of cached minute bars, filters them to the
//! trading session, runs the simulation, and writes the JSON result
//! bundle. Example:
//!
//! ```text
//! meanrev --data data/EURGBP/2025-03.csv --from 2025-03-01 --to 2025-03-31 \
//!         --params base_z=2.1,step_z=0.3
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::Parser;
use meanrev_backtest::{build_bundle, run_backtest};
use meanrev_core::Config;
use meanrev_ingestion::loader::UtcBar;
use meanrev_ingestion::{BarStore, CsvBarLoader, SessionWindow};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meanrev", about = "Mean-reversion backtest runner")]
struct Cli {
    /// CSV bar file (timestamp_utc,open,high,low,close).
    #[arg(long)]
    data: PathBuf,

    /// First UTC date to include (YYYY-MM-DD, inclusive).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last UTC date to include (YYYY-MM-DD, inclusive).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Trading symbol, used to key the bar cache.
    #[arg(long, default_value = "EURGBP")]
    symbol: String,

    /// Optional SQLite bar cache; filled from the CSV on first use.
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Optional JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Strategy overrides as comma-separated key=value pairs.
    #[arg(long)]
    params: Option<String>,

    /// Directory for the JSON result bundle.
    #[arg(long, default_value = "results")]
    out: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    config.session.symbol = cli.symbol.clone();

    if let Some(params) = &cli.params {
        for pair in params.split(',').filter(|s| !s.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("override `{pair}` is not key=value"))?;
            config.strategy.set(key.trim(), value.trim())?;
        }
    }
    config.validate()?;

    let raw = load_bars(&cli)?;
    let window = SessionWindow::from_config(&config.session)?;
    let bars = window.filter(&raw);
    info!(raw = raw.len(), session = bars.len(), "bars loaded");

    let result = run_backtest(&bars, &config)?;
    let bundle = build_bundle(&result, &config.strategy);

    fs::create_dir_all(&cli.out)?;
    let stamp = Utc::now().format("%Y-%m-%d_%H%M%S");
    let path = cli.out.join(format!("{stamp}.json"));
    fs::write(&path, serde_json::to_string_pretty(&bundle)?)?;

    println!("{}", path.display());
    Ok(())
}

/// Load raw UTC bars, going through the SQLite cache when one is
/// configured and falling back to the CSV (and priming the cache) when
/// the requested range is not cached yet.
fn load_bars(cli: &Cli) -> Result<Vec<UtcBar>> {
    let Some(cache_path) = &cli.cache else {
        return Ok(CsvBarLoader::new(&cli.data).load_range(cli.from, cli.to)?);
    };

    let mut store = BarStore::open(cache_path)?;
    let lo = cli
        .from
        .map(|d| d.and_time(NaiveTime::MIN).and_utc());
    let hi = cli
        .to
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc());

    let cached = store.load_bars(&cli.symbol, lo, hi)?;
    if !cached.is_empty() {
        info!(bars = cached.len(), cache = %cache_path.display(), "cache hit");
        return Ok(cached);
    }

    let bars = CsvBarLoader::new(&cli.data).load_range(cli.from, cli.to)?;
    store.save_bars(&cli.symbol, &bars)?;
    info!(bars = bars.len(), cache = %cache_path.display(), "cache primed");
    Ok(bars)
}
